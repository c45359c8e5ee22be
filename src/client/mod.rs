//! Search-backend client.
//!
//! [`DataClient`] and [`AdminClient`] share one [`Connection`] type and
//! implement the two capability traits the rest of the crate depends on:
//! [`SearchIndex`] for a single collection's data and [`IndexAdmin`] for
//! collection lifecycle. The import pipeline and the search view only ever
//! see these traits, so an in-process [`MemoryIndex`](crate::memory::MemoryIndex)
//! can stand in for the real backend.

pub mod admin;
pub mod connection;
pub mod data;
pub mod path;
pub mod query;
pub mod response;

use std::path::Path;

use async_trait::async_trait;

pub use admin::{AdminAction, AdminClient};
pub use connection::Connection;
pub use data::{DataClient, WriteOptions};
pub use path::{backend_root, format_base_path};
pub use query::{BoolOp, Query, DEFAULT_ROWS, MATCH_ALL};
pub use response::{
    AdminResponse, CoreStatus, Highlighting, IndexStats, ResponseEnvelope, ResponseHeader,
    ResultSet, SearchResponse, SystemInfo, WireDocument,
};

use crate::error::ClientError;
use crate::models::Document;

/// Result of a collection ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingStatus {
    pub status: String,
    /// Elapsed server time in milliseconds.
    pub qtime: i64,
}

/// Data operations against one collection.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Collection name.
    fn name(&self) -> &str;

    /// Fails unless the collection reports `OK`.
    async fn ping(&self) -> Result<PingStatus, ClientError>;

    async fn search(&self, query: &Query) -> Result<SearchResponse, ClientError>;

    async fn create(
        &self,
        doc: &Document,
        opts: &WriteOptions,
    ) -> Result<ResponseEnvelope, ClientError>;

    async fn bulk_create(
        &self,
        docs: &[Document],
        opts: &WriteOptions,
    ) -> Result<ResponseEnvelope, ClientError>;

    async fn delete_by_query(
        &self,
        query: &str,
        opts: &WriteOptions,
    ) -> Result<ResponseEnvelope, ClientError>;

    /// Makes every pending write visible.
    async fn commit(&self) -> Result<ResponseEnvelope, ClientError>;

    /// Removes every document and commits. Irreversible.
    async fn delete_all(&self) -> Result<ResponseEnvelope, ClientError> {
        self.delete_by_query(MATCH_ALL, &WriteOptions::committed())
            .await
    }
}

/// Collection lifecycle operations.
#[async_trait]
pub trait IndexAdmin: Send + Sync {
    async fn status(&self, name: &str) -> Result<AdminResponse, ClientError>;
    async fn create(&self, name: &str) -> Result<AdminResponse, ClientError>;
    async fn reload(&self, name: &str) -> Result<AdminResponse, ClientError>;
    async fn unload(&self, name: &str) -> Result<AdminResponse, ClientError>;
    async fn update_schema(&self, name: &str, schema: &Path) -> Result<(), ClientError>;
}
