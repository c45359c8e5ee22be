use scraper::Html;

use super::{
    meta_title, normalize_whitespace, select_texts, ContentUnitExtractor, ExtractContext,
    MIME_DOCX,
};
use crate::models::ContentUnit;
use crate::parse::ParsedDocument;

/// The whole file as one unit; paragraphs become its values.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordExtractor;

impl ContentUnitExtractor for WordExtractor {
    fn media_type(&self) -> &'static str {
        MIME_DOCX
    }

    fn extract(&self, doc: &ParsedDocument, ctx: &ExtractContext) -> Vec<ContentUnit> {
        let html = Html::parse_document(&doc.markup);
        let file = ctx.file();
        let title = meta_title(&html).unwrap_or_else(|| file.filename.clone());
        let values = select_texts(&html, "p")
            .iter()
            .map(|p| normalize_whitespace(p, ctx.whitespace))
            .collect();
        vec![file.unit(0, None, &title, values)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::SourceFile;
    use std::path::Path;

    fn ctx() -> ExtractContext {
        ExtractContext::new(SourceFile::from_path(Path::new("w/report.docx")))
    }

    #[test]
    fn title_from_metadata() {
        let doc = ParsedDocument {
            markup: r#"<html><head><meta name="dc:title" content="Annual Report"/></head>
                <body><p>First para</p><p>Second</p></body></html>"#
                .to_string(),
        };
        let units = WordExtractor.extract(&doc, &ctx());
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].title, "Annual Report");
        assert_eq!(units[0].values, ["Firstpara", "Second"]);
        assert_eq!(units[0].id(), "w/report.docx0");
    }

    #[test]
    fn title_falls_back_to_filename() {
        let doc = ParsedDocument {
            markup: r#"<html><head><meta name="dc:title" content=""/></head><body><p>x</p></body></html>"#
                .to_string(),
        };
        let units = WordExtractor.extract(&doc, &ctx());
        assert_eq!(units[0].title, "report.docx");
    }
}
