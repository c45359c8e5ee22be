//! HTTP transport shared by the data and admin clients.
//!
//! One [`Connection`] issues exactly one outbound call per request and never
//! retries; callers decide what a failure means.

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::response::BackendErrorBody;
use crate::error::ClientError;

/// `User-Agent` sent with every request.
pub fn user_agent() -> String {
    format!(
        "catalog-indexer/{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

/// Owns the HTTP client used to talk to the search backend.
#[derive(Debug, Clone)]
pub struct Connection {
    http: reqwest::Client,
}

impl Connection {
    /// Builds a connection whose requests fail with a transport error after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()
            .map_err(|e| ClientError::Transport {
                url: String::new(),
                source: e,
            })?;
        Ok(Self { http })
    }

    /// Wraps an already configured client.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Sends a JSON request and decodes the reply envelope into `T`.
    ///
    /// A reply carrying an `error` member, or a non-2xx reply, becomes
    /// [`ClientError::Backend`]; failing to reach the backend becomes
    /// [`ClientError::Transport`].
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, ClientError> {
        let (status, bytes) = self.send(method, url, body, "application/json").await?;

        let value: Value = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => {
                if !(200..300).contains(&status) {
                    return Err(ClientError::Backend {
                        status,
                        code: status as i64,
                        message: String::from_utf8_lossy(&bytes).trim().to_string(),
                        details: Vec::new(),
                    });
                }
                warn!(url, error = %e, "reply is not valid JSON");
                return Err(ClientError::Decode {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        if let Some(err) = value.get("error") {
            let body: BackendErrorBody =
                serde_json::from_value(err.clone()).unwrap_or_else(|_| BackendErrorBody {
                    code: status as i64,
                    message: err.to_string(),
                    ..Default::default()
                });
            return Err(ClientError::Backend {
                status,
                code: if body.code != 0 { body.code } else { status as i64 },
                message: body.message,
                details: body.details,
            });
        }

        if !(200..300).contains(&status) {
            return Err(ClientError::Backend {
                status,
                code: status as i64,
                message: value.to_string(),
                details: Vec::new(),
            });
        }

        serde_json::from_value(value).map_err(|e| ClientError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Sends a request and returns the status and body text without decoding.
    pub async fn request_text(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        content_type: &str,
    ) -> Result<(u16, String), ClientError> {
        let (status, bytes) = self.send(method, url, body, content_type).await?;
        Ok((status, String::from_utf8_lossy(&bytes).into_owned()))
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        content_type: &str,
    ) -> Result<(u16, Vec<u8>), ClientError> {
        debug!(%method, url, "backend request");
        let mut req = self
            .http
            .request(method, url)
            .header(reqwest::header::CONTENT_TYPE, content_type);
        if let Some(body) = body {
            req = req.body(body);
        }

        let resp = req.send().await.map_err(|e| transport(url, e))?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| transport(url, e))?;
        Ok((status, bytes.to_vec()))
    }
}

fn transport(url: &str, source: reqwest::Error) -> ClientError {
    warn!(url, error = %source, "backend request failed");
    ClientError::Transport {
        url: url.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_names_the_crate() {
        let ua = user_agent();
        assert!(ua.starts_with("catalog-indexer/"));
        assert!(ua.contains(std::env::consts::OS));
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let conn = Connection::new(Duration::from_secs(2)).unwrap();
        let url = format!("http://127.0.0.1:{}/solr/x/admin/ping", port);
        let err = conn
            .request::<Value>(Method::GET, &url, None)
            .await
            .unwrap_err();
        assert!(err.is_transport(), "expected transport error, got {err}");
    }
}
