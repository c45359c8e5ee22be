use scraper::Html;

use super::{normalize_whitespace, select_texts, ContentUnitExtractor, ExtractContext, MIME_TEXT};
use crate::models::ContentUnit;
use crate::parse::ParsedDocument;

/// The whole file as one unit with one value per paragraph block; blocks
/// that are empty after whitespace normalization are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor;

impl ContentUnitExtractor for TextExtractor {
    fn media_type(&self) -> &'static str {
        MIME_TEXT
    }

    fn extract(&self, doc: &ParsedDocument, ctx: &ExtractContext) -> Vec<ContentUnit> {
        let html = Html::parse_document(&doc.markup);
        let file = ctx.file();
        let values: Vec<String> = select_texts(&html, "p")
            .iter()
            .map(|p| normalize_whitespace(p, ctx.whitespace))
            .filter(|p| !p.is_empty())
            .collect();
        vec![file.unit(0, None, &file.filename, values)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::SourceFile;
    use std::path::Path;

    #[test]
    fn paragraphs_are_values_of_one_unit() {
        let ctx = ExtractContext::new(SourceFile::from_path(Path::new("memo.txt")));
        let doc = ParsedDocument {
            markup: "<html><body><p>first  block\nwraps</p><p> </p><p>second</p></body></html>"
                .to_string(),
        };
        let units = TextExtractor.extract(&doc, &ctx);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].id(), "memo.txt0");
        assert_eq!(units[0].folder, ".");
        assert_eq!(units[0].values, ["firstblockwraps", "second"]);
        assert_eq!(units[0].title, "memo.txt");
    }
}
