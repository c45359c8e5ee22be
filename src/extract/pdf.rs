use scraper::Html;

use super::{
    normalize_whitespace, select_texts, ContentUnitExtractor, ExtractContext, MIME_PDF,
};
use crate::models::ContentUnit;
use crate::parse::ParsedDocument;

/// One unit per `div.page`, ordinals in page order from zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl ContentUnitExtractor for PdfExtractor {
    fn media_type(&self) -> &'static str {
        MIME_PDF
    }

    fn extract(&self, doc: &ParsedDocument, ctx: &ExtractContext) -> Vec<ContentUnit> {
        let html = Html::parse_document(&doc.markup);
        let file = ctx.file();
        select_texts(&html, "div.page")
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let text = normalize_whitespace(&text, ctx.whitespace);
                file.unit(i, None, &file.filename, vec![text])
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WhitespacePolicy;
    use crate::extract::SourceFile;
    use std::path::Path;

    fn pages(n: usize) -> ParsedDocument {
        let body: String = (0..n)
            .map(|i| format!("<div class=\"page\"><p>page {}\n second  line</p></div>", i))
            .collect();
        ParsedDocument {
            markup: format!("<html><body>{}</body></html>", body),
        }
    }

    #[test]
    fn one_unit_per_page_in_order() {
        let ctx = ExtractContext::new(SourceFile::from_path(Path::new("docs/a.pdf")));
        let units = PdfExtractor.extract(&pages(3), &ctx);
        let ordinals: Vec<usize> = units.iter().map(|u| u.ordinal).collect();
        assert_eq!(ordinals, [0, 1, 2]);
        assert_eq!(units[2].id(), "docs/a.pdf2");
        assert_eq!(units[0].values, ["page0secondline"]);
        assert!(units.iter().all(|u| u.sheet.is_none()));
    }

    #[test]
    fn collapse_policy_keeps_single_spaces() {
        let ctx = ExtractContext::new(SourceFile::from_path(Path::new("a.pdf")))
            .whitespace(WhitespacePolicy::Collapse);
        let units = PdfExtractor.extract(&pages(1), &ctx);
        assert_eq!(units[0].values, ["page 0 second line"]);
    }

    #[test]
    fn markup_without_pages_yields_nothing() {
        let ctx = ExtractContext::default();
        let doc = ParsedDocument {
            markup: "<html><body><p>loose</p></body></html>".to_string(),
        };
        assert!(PdfExtractor.extract(&doc, &ctx).is_empty());
    }
}
