//! Bibliographic metadata: harvesting from the national library's SRU and
//! OAI-PMH endpoints, and mapping records into search documents.
//!
//! Records are fetched and parsed here but never submitted; the import
//! pipeline owns all writes.

pub mod harvest;
pub mod isbn;
pub mod mapper;
pub mod record;

pub use harvest::{
    parse_oaipmh, parse_sru, validate_harvest_date, HarvestError, HarvestedRecord, OaiPmhClient,
    OaiPmhPage, ResumptionToken, SruClient, SruResponse,
};
pub use isbn::normalize_isbn;
pub use mapper::{map_record, record_id};
pub use record::BibliographicRecord;
