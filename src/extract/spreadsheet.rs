use scraper::{Html, Selector};
use tracing::debug;

use super::{element_text, meta_title, ContentUnitExtractor, ExtractContext, MIME_XLSX};
use crate::models::ContentUnit;
use crate::parse::ParsedDocument;

/// One unit per non-blank row.
///
/// The ordinal is the row's position within its sheet, so a blank row still
/// consumes an index and ids stay stable when blank rows are filled in later.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetExtractor;

impl ContentUnitExtractor for SpreadsheetExtractor {
    fn media_type(&self) -> &'static str {
        MIME_XLSX
    }

    fn extract(&self, doc: &ParsedDocument, ctx: &ExtractContext) -> Vec<ContentUnit> {
        let (Ok(sheet_sel), Ok(name_sel), Ok(row_sel), Ok(cell_sel)) = (
            Selector::parse("body > div"),
            Selector::parse("h1"),
            Selector::parse("table tbody tr"),
            Selector::parse("td"),
        ) else {
            return Vec::new();
        };

        let html = Html::parse_document(&doc.markup);
        let file = ctx.file();
        let title = meta_title(&html).unwrap_or_else(|| file.filename.clone());

        let mut units = Vec::new();
        for sheet in html.select(&sheet_sel) {
            let name = sheet
                .select(&name_sel)
                .next()
                .map(element_text)
                .unwrap_or_default()
                .trim()
                .to_string();
            if ctx.exclude_sheets.contains(&name) {
                debug!(file = %file.source, sheet = %name, "sheet excluded");
                continue;
            }
            for (ordinal, row) in sheet.select(&row_sel).enumerate() {
                let cells: Vec<String> = row
                    .select(&cell_sel)
                    .map(|c| element_text(c).trim().to_string())
                    .collect();
                if cells.iter().all(|c| c.is_empty()) {
                    continue;
                }
                units.push(file.unit(ordinal, Some(name.clone()), &title, cells));
            }
        }
        units
    }
}
