//! Bibliographic record → search document.
//!
//! One record is always one document. Repeated sub-elements become
//! multi-valued fields; companion fields (transcriptions, agent ids) are kept
//! index-aligned with their primary field, using an empty string where one
//! occurrence has no value. A companion field with no values at all is
//! left out.

use super::record::BibliographicRecord;
use crate::models::{BibliographicDocument, OBJECT_TYPE_MANIFESTATION};
use crate::xml::last_segment;

fn aligned(values: impl IntoIterator<Item = Option<String>>) -> Vec<String> {
    let values: Vec<Option<String>> = values.into_iter().collect();
    if values.iter().all(Option::is_none) {
        return Vec::new();
    }
    values.into_iter().map(Option::unwrap_or_default).collect()
}

/// Document id: last path segment of the record URI, or a fresh UUID when
/// the record carries no URI.
pub fn record_id(rec: &BibliographicRecord) -> String {
    rec.admin_about
        .as_deref()
        .or(rec.about.as_deref())
        .map(|uri| last_segment(uri.split('#').next().unwrap_or(uri)).to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

pub fn map_record(rec: &BibliographicRecord) -> BibliographicDocument {
    let id = record_id(rec);
    let material_id = rec
        .about
        .clone()
        .or_else(|| rec.admin_about.clone())
        .unwrap_or_else(|| id.clone());

    BibliographicDocument {
        id,
        material_id,
        object_type: OBJECT_TYPE_MANIFESTATION.to_string(),
        media_type: rec
            .material_types
            .first()
            .map(|uri| last_segment(uri).to_string()),

        title: rec.title.as_ref().map(|t| t.value.clone()),
        title_transcription: rec.title.as_ref().and_then(|t| t.transcription.clone()),
        alternative: rec.alternative.as_ref().map(|t| t.value.clone()),
        alternative_transcription: rec
            .alternative
            .as_ref()
            .and_then(|t| t.transcription.clone()),
        volume: rec.volume.as_ref().map(|t| t.value.clone()),
        volume_transcription: rec.volume.as_ref().and_then(|t| t.transcription.clone()),
        series_title: rec.series_titles.iter().map(|t| t.value.clone()).collect(),
        series_title_transcription: aligned(
            rec.series_titles.iter().map(|t| t.transcription.clone()),
        ),
        edition: rec.edition.clone(),

        creators: rec.creators.iter().map(|a| a.name.clone()).collect(),
        creators_transcription: aligned(rec.creators.iter().map(|a| a.transcription.clone())),
        creators_agent_identifier: aligned(rec.creators.iter().map(|a| a.identifier.clone())),

        publisher: rec.publishers.iter().map(|a| a.name.clone()).collect(),
        publisher_transcription: aligned(
            rec.publishers.iter().map(|a| a.transcription.clone()),
        ),
        publisher_location: aligned(rec.publishers.iter().map(|a| a.location.clone())),
        publication_place: rec.publication_place.clone(),

        subjects: aligned(rec.subjects.iter().map(|s| s.value.clone())),
        subjects_transcription: aligned(rec.subjects.iter().map(|s| s.transcription.clone())),
        subjects_resource: aligned(rec.subjects.iter().map(|s| s.resource.clone())),

        identifiers: rec
            .identifiers
            .iter()
            .map(|i| match i.datatype.as_deref() {
                Some(dt) => format!("{}@{}", last_segment(dt), i.value),
                None => i.value.clone(),
            })
            .collect(),

        publication_date_literal: rec.date.clone(),
        issued_w3cdtf: rec.issued.clone(),

        language: rec.languages.clone(),
        original_language: rec.original_language.clone(),
        descriptions: rec.descriptions.clone(),
        extent: rec.extent.clone(),
        part_information_title: aligned(rec.part_information.iter().map(|p| p.title.clone())),
        part_information_creator: aligned(
            rec.part_information.iter().map(|p| p.creator.clone()),
        ),
    }
}
