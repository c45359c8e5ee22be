//! Remote extraction through a Tika server.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{DocumentParser, ParseError, ParsedDocument};
use crate::client::connection::user_agent;
use crate::config::ExtractionConfig;

#[derive(Debug, Clone)]
pub struct TikaParser {
    http: reqwest::Client,
    endpoint: String,
}

impl TikaParser {
    pub fn new(uri: &str, timeout: Duration) -> Result<Self, ParseError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()
            .map_err(|e| ParseError::Failed(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: format!("{}/tika", uri.trim_end_matches('/')),
        })
    }

    pub fn from_config(cfg: &ExtractionConfig) -> Result<Self, ParseError> {
        Self::new(&cfg.uri, Duration::from_secs(cfg.timeout_secs))
    }
}

#[async_trait]
impl DocumentParser for TikaParser {
    async fn parse(&self, bytes: Vec<u8>, media_type: &str) -> Result<ParsedDocument, ParseError> {
        if bytes.is_empty() {
            return Err(ParseError::Empty);
        }
        debug!(media_type, len = bytes.len(), "sending to extraction server");
        let resp = self
            .http
            .put(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, media_type)
            .header(reqwest::header::ACCEPT, "text/html")
            .body(bytes)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ParseError::Unavailable {
                        url: self.endpoint.clone(),
                        reason: e.to_string(),
                    }
                } else {
                    ParseError::Failed(e.to_string())
                }
            })?;

        let status = resp.status().as_u16();
        match status {
            200 => {
                let markup = resp
                    .text()
                    .await
                    .map_err(|e| ParseError::Failed(e.to_string()))?;
                Ok(ParsedDocument { markup })
            }
            204 | 422 => Err(ParseError::Empty),
            415 => Err(ParseError::Unsupported(media_type.to_string())),
            _ => {
                warn!(status, "extraction server error");
                Err(ParseError::Failed(format!(
                    "extraction server returned http {}",
                    status
                )))
            }
        }
    }
}
