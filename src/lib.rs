//! # Catalog Indexer
//!
//! Builds a searchable catalog on a Solr-compatible search backend from
//! office documents, PDFs, plain text and harvested bibliographic records.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌────────────┐   ┌────────────┐
//! │ Input files  │──▶│  Parser  │──▶│ Extractors │──▶│            │
//! │ xlsx/pdf/... │   │ Tika/Loc │   │ per format │   │  Import    │   ┌─────────┐
//! └──────────────┘   └──────────┘   └────────────┘   │  Pipeline  │──▶│ Backend │
//! ┌──────────────┐   ┌──────────────────────────┐    │ commit once│   │ (Solr)  │
//! │ SRU/OAI-PMH  │──▶│ Bibliographic mapper     │───▶│            │   └─────────┘
//! └──────────────┘   └──────────────────────────┘    └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! catidx core provision --schema ./config/schema.json
//! catidx import files ./data
//! catidx harvest oaipmh --date 2024-04-01
//! catidx search "river"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`client`] | Backend clients: connection, query builder, admin, data |
//! | [`memory`] | In-process index with the backend's commit semantics |
//! | [`models`] | Content units and search documents |
//! | [`parse`] | Content extraction (remote server or in-process) |
//! | [`extract`] | Per-format content-unit extractors |
//! | [`xml`] | Namespace-agnostic XML element tree |
//! | [`biblio`] | Bibliographic harvest and mapping |
//! | [`provision`] | Ordered collection provisioning |
//! | [`ingest`] | Import pipeline |
//! | [`search`] | Catalog search view |

pub mod biblio;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod memory;
pub mod models;
pub mod parse;
pub mod provision;
pub mod search;
pub mod xml;
