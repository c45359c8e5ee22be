//! Decoded backend replies.
//!
//! Backend-reported errors never reach these types: [`Connection`](super::Connection)
//! turns an `error` member into [`ClientError::Backend`](crate::error::ClientError)
//! before decoding, so a decoded [`SearchResponse`] always carries a result set.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A document as it travels on the wire.
pub type WireDocument = Map<String, Value>;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResponseHeader {
    #[serde(default)]
    pub status: i64,
    /// Elapsed server time in milliseconds.
    #[serde(rename = "QTime", default)]
    pub qtime: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

/// Error member of a backend reply.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BackendErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(rename = "msg", default)]
    pub message: String,
    #[serde(default)]
    pub metadata: Vec<String>,
    #[serde(default)]
    pub details: Vec<String>,
}

/// Reply to writes, commits and pings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "responseHeader", default)]
    pub header: ResponseHeader,
    /// Present on ping replies.
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResultSet {
    #[serde(rename = "numFound")]
    pub num_found: u64,
    pub start: u64,
    #[serde(default)]
    pub docs: Vec<WireDocument>,
}

impl ResultSet {
    /// Decodes the returned documents into a typed shape.
    pub fn documents<T: DeserializeOwned>(&self) -> Result<Vec<T>, serde_json::Error> {
        self.docs
            .iter()
            .map(|d| serde_json::from_value(Value::Object(d.clone())))
            .collect()
    }
}

/// Highlight fragments keyed by document id, then by field.
pub type Highlighting = HashMap<String, HashMap<String, Vec<String>>>;

/// Reply to a select request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(rename = "responseHeader", default)]
    pub header: ResponseHeader,
    #[serde(rename = "response")]
    pub results: ResultSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighting: Option<Highlighting>,
}

/// Reply to a collection-admin action.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminResponse {
    #[serde(rename = "responseHeader", default)]
    pub header: ResponseHeader,
    #[serde(default)]
    pub status: HashMap<String, CoreStatus>,
    #[serde(default)]
    pub core: Option<String>,
    #[serde(rename = "initFailures", default)]
    pub init_failures: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoreStatus {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub instance_dir: String,
    #[serde(default)]
    pub data_dir: String,
    #[serde(default)]
    pub config: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub start_time: Option<String>,
    /// Milliseconds since the collection was loaded.
    #[serde(default)]
    pub uptime: Option<u64>,
    #[serde(default)]
    pub index: Option<IndexStats>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default)]
    pub num_docs: u64,
    #[serde(default)]
    pub max_doc: u64,
    #[serde(default)]
    pub deleted_docs: u64,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub segment_count: u64,
    #[serde(default)]
    pub current: bool,
    #[serde(default)]
    pub has_deletions: bool,
    #[serde(default)]
    pub size_in_bytes: u64,
    #[serde(default)]
    pub size: String,
}

/// Backend-wide identity read from the system info page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub spec_version: String,
    /// Home directory holding configsets and instance directories.
    pub home: String,
}
