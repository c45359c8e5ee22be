//! Core data models used throughout the catalog indexer.
//!
//! Documents are typed per kind and only become a field map at the
//! serialization boundary ([`Document::to_wire`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::WireDocument;

/// `objecttype` of documents produced from files.
pub const OBJECT_TYPE_FILE: &str = "FILE";
/// `objecttype` of documents produced from bibliographic records.
pub const OBJECT_TYPE_MANIFESTATION: &str = "MANIFESTATION";

/// One indexable fragment of a source file: a spreadsheet row, a PDF page,
/// or a whole text / word-processor file.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentUnit {
    /// Position within the file (row index within the sheet, or page index).
    pub ordinal: usize,
    /// Path of the source file as it was given to the importer.
    pub source: String,
    /// Base name of the source file.
    pub filename: String,
    /// Directory part of the source path.
    pub folder: String,
    pub sheet: Option<String>,
    pub media_type: String,
    pub title: String,
    /// Cell or paragraph texts, in document order.
    pub values: Vec<String>,
}

impl ContentUnit {
    /// Deterministic identifier: source path, then sheet name (if any), then ordinal.
    ///
    /// Re-importing the same file yields the same ids, so overwriting writes
    /// replace earlier entries instead of duplicating them.
    pub fn id(&self) -> String {
        format!(
            "{}{}{}",
            self.source,
            self.sheet.as_deref().unwrap_or(""),
            self.ordinal
        )
    }
}

/// Search document for a [`ContentUnit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentUnitDocument {
    pub id: String,
    /// Identifies the source file; shared by every unit of that file.
    #[serde(rename = "materialid")]
    pub material_id: String,
    #[serde(rename = "objecttype")]
    pub object_type: String,
    #[serde(rename = "foldername")]
    pub folder: String,
    pub filename: String,
    #[serde(rename = "sheetname", default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    #[serde(rename = "mediatype")]
    pub media_type: String,
    #[serde(default)]
    pub contents: Vec<String>,
    pub title: String,
}

impl From<&ContentUnit> for ContentUnitDocument {
    fn from(unit: &ContentUnit) -> Self {
        Self {
            id: unit.id(),
            material_id: unit.source.clone(),
            object_type: OBJECT_TYPE_FILE.to_string(),
            folder: unit.folder.clone(),
            filename: unit.filename.clone(),
            sheet: unit.sheet.clone(),
            media_type: unit.media_type.clone(),
            contents: unit.values.clone(),
            title: unit.title.clone(),
        }
    }
}

/// Search document for one harvested bibliographic record.
///
/// Everything except the identifiers is optional; repeated source elements
/// become multi-valued fields kept in parallel order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BibliographicDocument {
    pub id: String,
    #[serde(rename = "materialid")]
    pub material_id: String,
    #[serde(rename = "objecttype")]
    pub object_type: String,
    #[serde(rename = "mediatype", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_transcription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_transcription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_transcription: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series_title: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series_title_transcription: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub creators: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub creators_transcription: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub creators_agent_identifier: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publisher: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publisher_transcription: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publisher_location: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_place: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects_transcription: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects_resource: Vec<String>,

    /// `<type>@<value>` pairs, e.g. `ISBN@9784000000000`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date_literal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_w3cdtf: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub language: Vec<String>,
    #[serde(
        rename = "originalLanguage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub original_language: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descriptions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extent: Vec<String>,
    #[serde(
        rename = "partInformation_title",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub part_information_title: Vec<String>,
    #[serde(
        rename = "partInformation_creator",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub part_information_creator: Vec<String>,
}

/// Any document the indexer submits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Document {
    ContentUnit(ContentUnitDocument),
    Bibliographic(BibliographicDocument),
}

impl Document {
    pub fn id(&self) -> &str {
        match self {
            Document::ContentUnit(d) => &d.id,
            Document::Bibliographic(d) => &d.id,
        }
    }

    /// Field map sent to the backend.
    pub fn to_wire(&self) -> WireDocument {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // Both variants are plain structs of strings and string lists.
            _ => WireDocument::new(),
        }
    }
}

impl From<ContentUnitDocument> for Document {
    fn from(d: ContentUnitDocument) -> Self {
        Document::ContentUnit(d)
    }
}

impl From<BibliographicDocument> for Document {
    fn from(d: BibliographicDocument) -> Self {
        Document::Bibliographic(d)
    }
}
