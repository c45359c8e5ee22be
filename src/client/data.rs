//! Collection-scoped data client: ping, search, writes, deletes and commits.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use super::connection::Connection;
use super::path::format_base_path;
use super::query::{Query, MATCH_ALL};
use super::response::{ResponseEnvelope, SearchResponse, WireDocument};
use super::{PingStatus, SearchIndex};
use crate::config::SearchConfig;
use crate::error::ClientError;
use crate::models::Document;

/// Governs whether a write becomes visible immediately or waits for a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Commit as part of this write.
    pub commit: bool,
    /// Ask the backend to commit on its own within this window.
    pub commit_within: Option<Duration>,
    /// Keep an existing document with the same id instead of replacing it.
    pub allow_duplicate: bool,
}

impl WriteOptions {
    /// Batched write: not visible until a later [`SearchIndex::commit`].
    pub fn batched() -> Self {
        Self::default()
    }

    /// Write that is visible to the next search.
    pub fn committed() -> Self {
        Self {
            commit: true,
            ..Self::default()
        }
    }

    /// Query-string pairs for the update endpoints.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if self.commit {
            pairs.push(("commit", "true".to_string()));
        }
        if let Some(within) = self.commit_within {
            let ms = within.as_millis();
            if ms > 0 {
                pairs.push(("commitWithin", ms.to_string()));
            }
        }
        if self.allow_duplicate {
            pairs.push(("overwrite", "false".to_string()));
        }
        pairs
    }

    /// Whether writes replace existing documents with the same id.
    pub fn overwrite(&self) -> bool {
        !self.allow_duplicate
    }
}

/// Talks to one named collection.
#[derive(Debug, Clone)]
pub struct DataClient {
    conn: Connection,
    base_path: String,
    name: String,
}

impl DataClient {
    /// Resolves `<uri>/solr/<core>` and builds a client with its own connection.
    pub fn new(uri: &str, core: &str, timeout: Duration) -> Result<Self, ClientError> {
        let conn = Connection::new(timeout)?;
        Self::with_connection(conn, uri, core)
    }

    pub fn from_config(cfg: &SearchConfig) -> Result<Self, ClientError> {
        Self::new(&cfg.uri, &cfg.core, cfg.timeout())
    }

    pub fn with_connection(conn: Connection, uri: &str, core: &str) -> Result<Self, ClientError> {
        url::Url::parse(uri).map_err(|e| ClientError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            conn,
            base_path: format_base_path(uri, core),
            name: core.to_string(),
        })
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Sends `{"add": {"doc": …}}` to the generic update endpoint.
    pub async fn add(
        &self,
        doc: &Document,
        opts: &WriteOptions,
    ) -> Result<ResponseEnvelope, ClientError> {
        let body = json!({
            "add": {
                "doc": doc.to_wire(),
                "overwrite": opts.overwrite(),
            }
        });
        self.update(&body, opts).await
    }

    fn endpoint(&self, path: &str, pairs: &[(&str, String)]) -> String {
        let mut url = format!("{}/{}", self.base_path, path);
        if !pairs.is_empty() {
            let mut ser = url::form_urlencoded::Serializer::new(String::new());
            for (k, v) in pairs {
                ser.append_pair(k, v);
            }
            url.push('?');
            url.push_str(&ser.finish());
        }
        url
    }

    async fn update(
        &self,
        body: &serde_json::Value,
        opts: &WriteOptions,
    ) -> Result<ResponseEnvelope, ClientError> {
        let url = self.endpoint("update", &opts.query_pairs());
        self.conn
            .request(Method::POST, &url, Some(body.to_string().into_bytes()))
            .await
    }

    async fn post_docs(
        &self,
        body: Vec<u8>,
        opts: &WriteOptions,
    ) -> Result<ResponseEnvelope, ClientError> {
        let url = self.endpoint("update/json/docs", &opts.query_pairs());
        self.conn.request(Method::POST, &url, Some(body)).await
    }
}

#[async_trait]
impl SearchIndex for DataClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> Result<PingStatus, ClientError> {
        let url = self.endpoint("admin/ping", &[("wt", "json".to_string())]);
        let env: ResponseEnvelope = self.conn.request(Method::GET, &url, None).await?;
        let status = env.status.unwrap_or_default();
        if status != "OK" {
            return Err(ClientError::Unhealthy(status));
        }
        debug!(core = %self.name, qtime = env.header.qtime, "ping ok");
        Ok(PingStatus {
            status,
            qtime: env.header.qtime,
        })
    }

    async fn search(&self, query: &Query) -> Result<SearchResponse, ClientError> {
        let url = format!("{}/select?{}", self.base_path, query.to_query_string());
        self.conn.request(Method::GET, &url, None).await
    }

    async fn create(
        &self,
        doc: &Document,
        opts: &WriteOptions,
    ) -> Result<ResponseEnvelope, ClientError> {
        let body = serde_json::Value::Object(doc.to_wire()).to_string();
        self.post_docs(body.into_bytes(), opts).await
    }

    async fn bulk_create(
        &self,
        docs: &[Document],
        opts: &WriteOptions,
    ) -> Result<ResponseEnvelope, ClientError> {
        let wire: Vec<WireDocument> = docs.iter().map(Document::to_wire).collect();
        let body = serde_json::to_vec(&wire).map_err(|e| ClientError::Decode {
            url: self.base_path.clone(),
            reason: e.to_string(),
        })?;
        debug!(core = %self.name, count = docs.len(), "bulk create");
        self.post_docs(body, opts).await
    }

    async fn delete_by_query(
        &self,
        query: &str,
        opts: &WriteOptions,
    ) -> Result<ResponseEnvelope, ClientError> {
        if query == MATCH_ALL {
            info!(core = %self.name, "deleting every document");
        }
        self.update(&json!({ "delete": { "query": query } }), opts)
            .await
    }

    async fn commit(&self) -> Result<ResponseEnvelope, ClientError> {
        self.update(&json!({ "commit": {} }), &WriteOptions::default())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_options_wire_mapping() {
        assert!(WriteOptions::batched().query_pairs().is_empty());
        assert_eq!(
            WriteOptions::committed().query_pairs(),
            vec![("commit", "true".to_string())]
        );
        let opts = WriteOptions {
            commit: false,
            commit_within: Some(Duration::from_millis(1500)),
            allow_duplicate: true,
        };
        assert_eq!(
            opts.query_pairs(),
            vec![
                ("commitWithin", "1500".to_string()),
                ("overwrite", "false".to_string())
            ]
        );
        assert!(!opts.overwrite());
    }

    #[test]
    fn zero_commit_within_is_omitted() {
        let opts = WriteOptions {
            commit_within: Some(Duration::ZERO),
            ..Default::default()
        };
        assert!(opts.query_pairs().is_empty());
    }

    #[test]
    fn base_path_resolution() {
        let c = DataClient::new("http://localhost:8983/solr", "catalog", Duration::from_secs(5))
            .unwrap();
        assert_eq!(c.base_path(), "http://localhost:8983/solr/catalog");
        assert_eq!(c.name(), "catalog");
        assert_eq!(
            c.endpoint("update", &WriteOptions::committed().query_pairs()),
            "http://localhost:8983/solr/catalog/update?commit=true"
        );
    }

    #[test]
    fn malformed_uri_is_rejected() {
        let err = DataClient::new("not a uri", "catalog", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, ClientError::InvalidUri { .. }));
    }
}
