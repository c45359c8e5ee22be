//! Error taxonomy for the search-backend client and the import pipeline.
//!
//! | Category | Where it comes from | Pipeline reaction |
//! |----------|--------------------|-------------------|
//! | [`ClientError::Transport`] | backend unreachable (DNS, refused, timeout) | abort the batch |
//! | [`ClientError::Backend`] | backend answered with a structured error or non-2xx | surfaced, not retried |
//! | [`ClientError::UnsupportedAction`] | unknown admin verb, rejected before any I/O | n/a |
//! | [`ParseError::Empty`](crate::parse::ParseError) | nothing to extract (zero-byte input) | skip the file |
//! | [`ImportAbort::OpenFile`] | input missing or unreadable | abort the batch |

use std::path::PathBuf;

use thiserror::Error;

use crate::parse::ParseError;

/// Errors raised by [`Connection`](crate::client::Connection) and the clients built on it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend could not be reached at all.
    #[error("transport error calling {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend was reached and reported an error.
    #[error("backend error (http {status}, code {code}): {}", format_backend_message(.message, .details))]
    Backend {
        /// HTTP status of the reply.
        status: u16,
        /// Error code from the reply body, or the HTTP status when the body had none.
        code: i64,
        message: String,
        details: Vec<String>,
    },

    /// Admin verb outside the supported set.
    #[error("action '{0}' not supported")]
    UnsupportedAction(String),

    /// The reply could not be decoded into the expected envelope.
    #[error("could not decode reply from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("invalid backend uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Ping answered, but with a status other than `OK`.
    #[error("backend is not healthy, status: {0}")]
    Unhealthy(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }

    pub fn is_backend(&self) -> bool {
        matches!(self, ClientError::Backend { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClientError::Io {
            path: path.into(),
            source,
        }
    }
}

fn format_backend_message(message: &str, details: &[String]) -> String {
    if details.is_empty() {
        message.to_string()
    } else {
        format!("{}: {{{}}}", message, details.join(", "))
    }
}

/// The reason an import batch stopped early.
#[derive(Debug, Error)]
pub enum ImportAbort {
    #[error("unable to open file [{}]: {source}", .path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Client(#[from] ClientError),

    /// The content-extraction service itself is unreachable.
    #[error("content extraction unavailable: {0}")]
    Extraction(#[source] ParseError),

    #[error(transparent)]
    Harvest(#[from] crate::biblio::HarvestError),
}

/// An aborted import, carrying the number of inputs fully processed before the abort.
#[derive(Debug, Error)]
#[error("import aborted after {succeeded} successful input(s): {cause}")]
pub struct ImportError {
    #[source]
    pub cause: ImportAbort,
    pub succeeded: usize,
}

impl ImportError {
    pub fn new(cause: impl Into<ImportAbort>, succeeded: usize) -> Self {
        Self {
            cause: cause.into(),
            succeeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_lists_details() {
        let err = ClientError::Backend {
            status: 400,
            code: 400,
            message: "undefined field".to_string(),
            details: vec!["foo".to_string(), "bar".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "backend error (http 400, code 400): undefined field: {foo, bar}"
        );
        assert!(err.is_backend());
        assert!(!err.is_transport());
    }

    #[test]
    fn import_error_reports_running_count() {
        let err = ImportError::new(
            ImportAbort::OpenFile {
                path: PathBuf::from("missing.xlsx"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            },
            2,
        );
        let msg = err.to_string();
        assert!(msg.contains("after 2 successful"));
        assert!(msg.contains("missing.xlsx"));
    }
}
