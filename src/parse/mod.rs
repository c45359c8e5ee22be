//! Content-extraction collaborator.
//!
//! A [`DocumentParser`] turns raw file bytes plus a declared media type into
//! an XHTML markup tree ([`ParsedDocument`]). Two implementations share the
//! same output shape, so the extractors in [`crate::extract`] work against
//! either:
//!
//! | Parser | Where parsing happens |
//! |--------|----------------------|
//! | [`TikaParser`] | remote extraction server (`PUT /tika`, `Accept: text/html`) |
//! | [`LocalParser`] | in-process: zip + quick-xml for OOXML, pdf-extract for PDF |
//!
//! Markup shape:
//!
//! ```text
//! <html><head><meta name="dc:title" content="..."/></head><body>
//!   <div class="page"><h1>Sheet1</h1><table><tbody><tr><td>..</td></tr></tbody></table></div>
//!   <div class="page"><p>page text</p></div>
//!   <p>paragraph</p>
//! </body></html>
//! ```

pub mod local;
pub mod tika;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{ExtractionBackend, ExtractionConfig};

pub use local::LocalParser;
pub use tika::TikaParser;

/// Parsed markup for one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub markup: String,
}

#[derive(Debug, Error)]
pub enum ParseError {
    /// Nothing to extract, typically a zero-byte file.
    #[error("no content to extract")]
    Empty,

    #[error("unsupported media type: {0}")]
    Unsupported(String),

    /// The extraction server could not be reached.
    #[error("extraction server unavailable at {url}: {reason}")]
    Unavailable { url: String, reason: String },

    #[error("extraction failed: {0}")]
    Failed(String),
}

impl ParseError {
    /// Whether the pipeline should skip this file and continue the batch.
    ///
    /// Only an unreachable extraction server stops a batch.
    pub fn is_skip(&self) -> bool {
        !matches!(self, ParseError::Unavailable { .. })
    }
}

#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, bytes: Vec<u8>, media_type: &str) -> Result<ParsedDocument, ParseError>;
}

/// Builds the parser selected by `[extraction] backend`.
pub fn parser_from_config(cfg: &ExtractionConfig) -> Result<Box<dyn DocumentParser>, ParseError> {
    match cfg.backend {
        ExtractionBackend::Tika => Ok(Box::new(TikaParser::from_config(cfg)?)),
        ExtractionBackend::Local => Ok(Box::new(LocalParser::new())),
    }
}
