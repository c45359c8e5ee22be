//! Content-unit extraction.
//!
//! Each [`ContentUnitExtractor`] reads the markup tree produced by a
//! [`DocumentParser`](crate::parse::DocumentParser) and decomposes it into
//! ordered [`ContentUnit`]s. Extractors never touch the network; the
//! pipeline submits what they return.
//!
//! # Formats
//!
//! | Media type | Extractor | Unit |
//! |------------|-----------|------|
//! | xlsx | [`SpreadsheetExtractor`] | one per non-blank row of each non-excluded sheet |
//! | pdf | [`PdfExtractor`] | one per page |
//! | docx | [`WordExtractor`] | one per file, title from `dc:title` |
//! | text/plain | [`TextExtractor`] | one per file, one value per paragraph block |
//!
//! Formats are dispatched through [`ExtractorRegistry`], keyed by media
//! type, so a new format is one `register` call.

mod pdf;
mod spreadsheet;
mod text;
mod word;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use scraper::{Html, Selector};

use crate::config::WhitespacePolicy;
use crate::models::ContentUnit;
use crate::parse::ParsedDocument;

pub use pdf::PdfExtractor;
pub use spreadsheet::SpreadsheetExtractor;
pub use text::TextExtractor;
pub use word::WordExtractor;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_TEXT: &str = "text/plain";
/// Media type of anything not recognized by extension.
pub const MIME_UNKNOWN: &str = "application/octet-stream";

/// Classifies a file by its extension (case-insensitive).
pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("xlsx") => MIME_XLSX,
        Some("pdf") => MIME_PDF,
        Some("docx") => MIME_DOCX,
        Some("txt") => MIME_TEXT,
        _ => MIME_UNKNOWN,
    }
}

/// Identity of the file being extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as given to the importer; prefix of every unit id.
    pub source: String,
    pub filename: String,
    pub folder: String,
    pub media_type: String,
}

impl SourceFile {
    pub fn from_path(path: &Path) -> Self {
        let folder = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.display().to_string(),
            _ => ".".to_string(),
        };
        Self {
            source: path.display().to_string(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            folder,
            media_type: media_type_for_path(path).to_string(),
        }
    }

    /// A unit of this file with the given ordinal and values.
    pub(crate) fn unit(
        &self,
        ordinal: usize,
        sheet: Option<String>,
        title: &str,
        values: Vec<String>,
    ) -> ContentUnit {
        ContentUnit {
            ordinal,
            source: self.source.clone(),
            filename: self.filename.clone(),
            folder: self.folder.clone(),
            sheet,
            media_type: self.media_type.clone(),
            title: title.to_string(),
            values,
        }
    }
}

/// Per-file extraction settings.
#[derive(Debug, Clone, Default)]
pub struct ExtractContext {
    pub file: Option<SourceFile>,
    /// Sheet names the spreadsheet extractor skips entirely.
    pub exclude_sheets: HashSet<String>,
    pub whitespace: WhitespacePolicy,
}

impl ExtractContext {
    pub fn new(file: SourceFile) -> Self {
        Self {
            file: Some(file),
            ..Default::default()
        }
    }

    pub fn exclude_sheets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_sheets.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn whitespace(mut self, policy: WhitespacePolicy) -> Self {
        self.whitespace = policy;
        self
    }

    fn file(&self) -> SourceFile {
        self.file.clone().unwrap_or_else(|| SourceFile {
            source: String::new(),
            filename: String::new(),
            folder: ".".to_string(),
            media_type: MIME_UNKNOWN.to_string(),
        })
    }
}

/// Applies the whitespace policy. Carriage-return entities left over from
/// the extraction server count as whitespace.
pub fn normalize_whitespace(text: &str, policy: WhitespacePolicy) -> String {
    let text = text.replace("&#13;", " ");
    match policy {
        WhitespacePolicy::Strip => text
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\u{3000}')
            .collect(),
        WhitespacePolicy::Collapse => text.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Decomposes a parsed document into content units.
pub trait ContentUnitExtractor: Send + Sync {
    /// Media type this extractor handles.
    fn media_type(&self) -> &'static str;

    fn extract(&self, doc: &ParsedDocument, ctx: &ExtractContext) -> Vec<ContentUnit>;
}

/// Media type → extractor.
pub struct ExtractorRegistry {
    extractors: HashMap<&'static str, Box<dyn ContentUnitExtractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractorRegistry {
    /// Registry with the four built-in formats.
    pub fn new() -> Self {
        let mut reg = Self::empty();
        reg.register(Box::new(SpreadsheetExtractor));
        reg.register(Box::new(PdfExtractor));
        reg.register(Box::new(WordExtractor));
        reg.register(Box::new(TextExtractor));
        reg
    }

    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Adds or replaces the extractor for its media type.
    pub fn register(&mut self, extractor: Box<dyn ContentUnitExtractor>) {
        self.extractors.insert(extractor.media_type(), extractor);
    }

    pub fn get(&self, media_type: &str) -> Option<&dyn ContentUnitExtractor> {
        self.extractors.get(media_type).map(|e| e.as_ref())
    }

    pub fn supports(&self, media_type: &str) -> bool {
        self.extractors.contains_key(media_type)
    }

    pub fn media_types(&self) -> Vec<&'static str> {
        let mut v: Vec<_> = self.extractors.keys().copied().collect();
        v.sort_unstable();
        v
    }
}

// ── markup helpers shared by the extractors ────────────────────────────

fn element_text(el: scraper::ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Texts of every element matching `css`, in document order.
fn select_texts(html: &Html, css: &str) -> Vec<String> {
    match Selector::parse(css) {
        Ok(sel) => html.select(&sel).map(element_text).collect(),
        Err(_) => Vec::new(),
    }
}

/// Non-empty `content` of `<meta name="dc:title">`.
fn meta_title(html: &Html) -> Option<String> {
    let sel = Selector::parse(r#"meta[name="dc:title"]"#).ok()?;
    html.select(&sel)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn media_types_by_extension() {
        assert_eq!(media_type_for_path(Path::new("a/b.xlsx")), MIME_XLSX);
        assert_eq!(media_type_for_path(Path::new("B.PDF")), MIME_PDF);
        assert_eq!(media_type_for_path(Path::new("c.docx")), MIME_DOCX);
        assert_eq!(media_type_for_path(Path::new("d.txt")), MIME_TEXT);
        assert_eq!(media_type_for_path(Path::new("e.pptx")), MIME_UNKNOWN);
        assert_eq!(media_type_for_path(Path::new("noext")), MIME_UNKNOWN);
    }

    #[test]
    fn source_file_parts() {
        let f = SourceFile::from_path(&PathBuf::from("data/2022/Book1.xlsx"));
        assert_eq!(f.source, "data/2022/Book1.xlsx");
        assert_eq!(f.filename, "Book1.xlsx");
        assert_eq!(f.folder, "data/2022");
        assert_eq!(f.media_type, MIME_XLSX);

        let bare = SourceFile::from_path(Path::new("notes.txt"));
        assert_eq!(bare.folder, ".");
    }

    #[test]
    fn whitespace_policies() {
        let s = " a  b\n c\u{3000}d&#13;e ";
        assert_eq!(normalize_whitespace(s, WhitespacePolicy::Strip), "abcde");
        assert_eq!(normalize_whitespace(s, WhitespacePolicy::Collapse), "a b c d e");
    }

    #[test]
    fn registry_dispatch() {
        let reg = ExtractorRegistry::new();
        assert_eq!(reg.media_types().len(), 4);
        assert!(reg.supports(MIME_PDF));
        assert!(!reg.supports(MIME_UNKNOWN));
        assert_eq!(reg.get(MIME_XLSX).unwrap().media_type(), MIME_XLSX);
        assert!(ExtractorRegistry::empty().get(MIME_PDF).is_none());
    }

    #[test]
    fn meta_title_lookup() {
        let html = Html::parse_document(
            r#"<html><head><meta name="dc:title" content=" Report "/></head><body></body></html>"#,
        );
        assert_eq!(meta_title(&html).as_deref(), Some("Report"));
        let html = Html::parse_document("<html><head></head><body></body></html>");
        assert!(meta_title(&html).is_none());
    }
}
