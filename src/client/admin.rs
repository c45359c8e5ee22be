//! Collection-admin client: lifecycle actions, schema pushes and the
//! backend-wide health probe.
//!
//! None of these calls check collection state locally. Ordering of the
//! provisioning steps is the caller's concern (see [`crate::provision`]);
//! calling them out of order surfaces whatever the backend reports.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::connection::Connection;
use super::path::backend_root;
use super::response::{AdminResponse, CoreStatus, SystemInfo};
use super::IndexAdmin;
use crate::error::ClientError;

/// The closed set of collection-admin verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Status,
    Reload,
    Create,
    Rename,
    Swap,
    Unload,
    Split,
}

impl AdminAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminAction::Status => "STATUS",
            AdminAction::Reload => "RELOAD",
            AdminAction::Create => "CREATE",
            AdminAction::Rename => "RENAME",
            AdminAction::Swap => "SWAP",
            AdminAction::Unload => "UNLOAD",
            AdminAction::Split => "SPLIT",
        }
    }
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminAction {
    type Err = ClientError;

    /// Case-insensitive; anything outside the set is [`ClientError::UnsupportedAction`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "STATUS" => Ok(AdminAction::Status),
            "RELOAD" => Ok(AdminAction::Reload),
            "CREATE" => Ok(AdminAction::Create),
            "RENAME" => Ok(AdminAction::Rename),
            "SWAP" => Ok(AdminAction::Swap),
            "UNLOAD" => Ok(AdminAction::Unload),
            "SPLIT" => Ok(AdminAction::Split),
            _ => Err(ClientError::UnsupportedAction(s.to_string())),
        }
    }
}

/// Name of the configset every new collection is cloned from.
pub const DEFAULT_CONFIGSET: &str = "_default";

#[derive(Debug, Clone)]
pub struct AdminClient {
    conn: Connection,
    root: String,
}

impl AdminClient {
    pub fn new(uri: &str, timeout: Duration) -> Result<Self, ClientError> {
        Self::with_connection(Connection::new(timeout)?, uri)
    }

    pub fn with_connection(conn: Connection, uri: &str) -> Result<Self, ClientError> {
        url::Url::parse(uri).map_err(|e| ClientError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            conn,
            root: backend_root(uri),
        })
    }

    /// Backend root, e.g. `http://localhost:8983/solr`.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Runs a verb given by name. Unknown verbs fail before any request is made.
    pub async fn action(
        &self,
        verb: &str,
        params: &[(&str, &str)],
    ) -> Result<AdminResponse, ClientError> {
        let action: AdminAction = verb.parse()?;
        self.run(action, params).await
    }

    pub async fn run(
        &self,
        action: AdminAction,
        params: &[(&str, &str)],
    ) -> Result<AdminResponse, ClientError> {
        let url = self.cores_url(action, params);
        debug!(%action, "admin action");
        self.conn.request(Method::GET, &url, None).await
    }

    /// `action` and `wt` are always set here; caller values for them are dropped.
    fn cores_url(&self, action: AdminAction, params: &[(&str, &str)]) -> String {
        let mut ser = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in params {
            if *k == "action" || *k == "wt" {
                continue;
            }
            ser.append_pair(k, v);
        }
        ser.append_pair("action", action.as_str());
        ser.append_pair("wt", "json");
        format!("{}/admin/cores?{}", self.root, ser.finish())
    }

    /// Looks a collection up in the full status listing.
    ///
    /// `Ok(None)` means the backend answered and the collection does not exist.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<CoreStatus>, ClientError> {
        let res = self.run(AdminAction::Status, &[]).await?;
        Ok(res.status.into_values().find(|c| c.name == name))
    }

    /// UNLOAD that also removes the index, data and instance directories.
    pub async fn force_unload(&self, name: &str) -> Result<AdminResponse, ClientError> {
        warn!(core = name, "force unloading collection and deleting its files");
        self.run(
            AdminAction::Unload,
            &[
                ("core", name),
                ("deleteIndex", "true"),
                ("deleteDataDir", "true"),
                ("deleteInstanceDir", "true"),
            ],
        )
        .await
    }

    /// Probes backend-wide health and reads its version and home directory
    /// from the system info page.
    pub async fn ping(&self) -> Result<SystemInfo, ClientError> {
        let url = format!("{}/admin/info/system?wt=xml", self.root);
        let (status, body) = self
            .conn
            .request_text(Method::GET, &url, None, "application/xml")
            .await?;
        if !(200..300).contains(&status) {
            return Err(ClientError::Backend {
                status,
                code: status as i64,
                message: format!("system info returned http {}", status),
                details: vec![body],
            });
        }
        let tree = crate::xml::parse(&body).map_err(|e| ClientError::Decode {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        let field = |name: &str| {
            tree.find_by_attr("name", name)
                .map(|e| e.text.clone())
                .unwrap_or_default()
        };
        Ok(SystemInfo {
            spec_version: field("solr-spec-version"),
            home: field("solr_home"),
        })
    }

    /// Copies `<home>/configsets/_default` to `<home>/<name>`.
    ///
    /// The home directory comes from [`ping`](Self::ping), so the backend must
    /// be reachable and share a filesystem with this process.
    pub async fn copy_configset_from_default(&self, name: &str) -> Result<PathBuf, ClientError> {
        let info = self.ping().await?;
        let home = PathBuf::from(&info.home);
        let src = home.join("configsets").join(DEFAULT_CONFIGSET);
        let dest = home.join(name);
        info!(from = %src.display(), to = %dest.display(), "copying configset");
        copy_dir(&src, &dest)?;
        Ok(dest)
    }
}

fn copy_dir(src: &Path, dest: &Path) -> Result<(), ClientError> {
    if !src.is_dir() {
        return Err(ClientError::io(
            src,
            std::io::Error::new(std::io::ErrorKind::NotFound, "configset directory not found"),
        ));
    }
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| src.to_path_buf());
            ClientError::io(path, std::io::Error::other(e.to_string()))
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| ClientError::io(entry.path(), std::io::Error::other(e.to_string())))?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| ClientError::io(&target, e))?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| ClientError::io(&target, e))?;
        }
    }
    Ok(())
}

#[async_trait]
impl IndexAdmin for AdminClient {
    async fn status(&self, name: &str) -> Result<AdminResponse, ClientError> {
        self.run(AdminAction::Status, &[("core", name)]).await
    }

    async fn create(&self, name: &str) -> Result<AdminResponse, ClientError> {
        info!(core = name, "creating collection");
        self.run(AdminAction::Create, &[("name", name)]).await
    }

    async fn reload(&self, name: &str) -> Result<AdminResponse, ClientError> {
        info!(core = name, "reloading collection");
        self.run(AdminAction::Reload, &[("core", name)]).await
    }

    async fn unload(&self, name: &str) -> Result<AdminResponse, ClientError> {
        self.run(AdminAction::Unload, &[("core", name)]).await
    }

    /// POSTs the schema file to `<root>/<name>/schema`. A non-2xx reply comes
    /// back as [`ClientError::Backend`] with the body in `details`.
    async fn update_schema(&self, name: &str, schema: &Path) -> Result<(), ClientError> {
        let body = std::fs::read(schema).map_err(|e| ClientError::io(schema, e))?;
        let url = format!("{}/{}/schema", self.root, name);
        let (status, text) = self
            .conn
            .request_text(Method::POST, &url, Some(body), "application/json")
            .await?;
        if !(200..300).contains(&status) {
            warn!(core = name, status, "schema update rejected");
            return Err(ClientError::Backend {
                status,
                code: status as i64,
                message: format!("schema update for '{}' failed", name),
                details: vec![text],
            });
        }
        info!(core = name, schema = %schema.display(), "schema updated");
        Ok(())
    }
}
