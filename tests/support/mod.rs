//! In-process fake search backend for integration tests.
//!
//! Serves the subset of the backend's HTTP API the clients use, storing
//! documents in [`MemoryIndex`] so pending/committed visibility matches the
//! real thing. Every request is recorded for wire-level assertions.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path as UrlPath, Query, RawQuery, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

use catalog_indexer::client::{AdminClient, DataClient, DEFAULT_ROWS};
use catalog_indexer::memory::{HighlightSpec, MemoryIndex};

/// Marker that makes the fake reject a document, as the backend does for
/// fields missing from the schema.
pub const REJECT_MARKER: &str = "REJECT";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: String,
}

#[derive(Default)]
pub struct FakeState {
    cores: Mutex<HashMap<String, Arc<MemoryIndex>>>,
    schemas: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<Recorded>>,
    home: PathBuf,
}

impl FakeState {
    fn core(&self, name: &str) -> Option<Arc<MemoryIndex>> {
        self.cores.lock().unwrap().get(name).cloned()
    }

    fn record(&self, method: &Method, uri: &Uri, body: &[u8]) {
        self.requests.lock().unwrap().push(Recorded {
            method: method.to_string(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            body: String::from_utf8_lossy(body).into_owned(),
        });
    }
}

pub struct FakeBackend {
    pub uri: String,
    pub state: Arc<FakeState>,
    _home: TempDir,
}

impl FakeBackend {
    /// Starts a backend with a `_default` configset under its home directory.
    pub async fn start() -> Self {
        let home = TempDir::new().unwrap();
        let conf = home.path().join("configsets/_default/conf");
        std::fs::create_dir_all(&conf).unwrap();
        std::fs::write(conf.join("solrconfig.xml"), "<config/>").unwrap();
        std::fs::write(conf.join("managed-schema.xml"), "<schema/>").unwrap();

        let state = Arc::new(FakeState {
            home: home.path().to_path_buf(),
            ..Default::default()
        });
        let app = Router::new()
            .route("/solr/admin/cores", get(handle_cores))
            .route("/solr/admin/info/system", get(handle_system))
            .route("/solr/{core}/schema", post(handle_schema))
            .route("/solr/{core}/admin/ping", get(handle_ping))
            .route("/solr/{core}/select", get(handle_select))
            .route("/solr/{core}/update", post(handle_update))
            .route("/solr/{core}/update/json/docs", post(handle_docs))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            uri: format!("http://{}", addr),
            state,
            _home: home,
        }
    }

    /// Starts a backend that already hosts `name`.
    pub async fn with_core(name: &str) -> Self {
        let backend = Self::start().await;
        backend.add_core(name);
        backend
    }

    pub fn add_core(&self, name: &str) -> Arc<MemoryIndex> {
        let index = Arc::new(MemoryIndex::new(name));
        self.state
            .cores
            .lock()
            .unwrap()
            .insert(name.to_string(), index.clone());
        index
    }

    pub fn core(&self, name: &str) -> Option<Arc<MemoryIndex>> {
        self.state.core(name)
    }

    pub fn home(&self) -> &Path {
        &self.state.home
    }

    pub fn schema_of(&self, name: &str) -> Option<String> {
        self.state.schemas.lock().unwrap().get(name).cloned()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, suffix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.ends_with(suffix))
            .collect()
    }

    pub fn data(&self, core: &str) -> DataClient {
        DataClient::new(&self.uri, core, Duration::from_secs(5)).unwrap()
    }

    pub fn admin(&self) -> AdminClient {
        AdminClient::new(&self.uri, Duration::from_secs(5)).unwrap()
    }
}

fn ok() -> Value {
    json!({ "responseHeader": { "status": 0, "QTime": 1 } })
}

fn error(status: StatusCode, msg: &str) -> Response {
    let body = json!({
        "responseHeader": { "status": status.as_u16(), "QTime": 0 },
        "error": { "msg": msg, "code": status.as_u16() }
    });
    (status, Json(body)).into_response()
}

fn core_status(name: &str, index: &MemoryIndex, home: &Path) -> Value {
    json!({
        "name": name,
        "instanceDir": home.join(name).display().to_string(),
        "dataDir": home.join(name).join("data").display().to_string(),
        "config": "solrconfig.xml",
        "schema": "managed-schema.xml",
        "uptime": 1000,
        "index": { "numDocs": index.len(), "maxDoc": index.len(), "current": true }
    })
}

async fn handle_cores(
    State(state): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.record(&method, &uri, b"");
    let action = params.get("action").map(String::as_str).unwrap_or("");
    match action {
        "STATUS" => {
            let cores = state.cores.lock().unwrap();
            let mut status = serde_json::Map::new();
            match params.get("core") {
                Some(name) => {
                    let v = cores
                        .get(name)
                        .map(|c| core_status(name, c, &state.home))
                        .unwrap_or_else(|| json!({}));
                    status.insert(name.clone(), v);
                }
                None => {
                    for (name, c) in cores.iter() {
                        status.insert(name.clone(), core_status(name, c, &state.home));
                    }
                }
            }
            let mut body = ok();
            body["status"] = Value::Object(status);
            Json(body).into_response()
        }
        "CREATE" => {
            let Some(name) = params.get("name") else {
                return error(StatusCode::BAD_REQUEST, "Missing parameter [name]");
            };
            let mut cores = state.cores.lock().unwrap();
            if cores.contains_key(name) {
                return error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &format!("Core with name '{}' already exists.", name),
                );
            }
            if !state.home.join(name).join("conf").is_dir() {
                return error(
                    StatusCode::BAD_REQUEST,
                    &format!("Can't find resource 'solrconfig.xml' for core '{}'", name),
                );
            }
            cores.insert(name.clone(), Arc::new(MemoryIndex::new(name.clone())));
            let mut body = ok();
            body["core"] = json!(name);
            Json(body).into_response()
        }
        "RELOAD" | "UNLOAD" => {
            let name = params.get("core").cloned().unwrap_or_default();
            let mut cores = state.cores.lock().unwrap();
            if !cores.contains_key(&name) {
                return error(
                    StatusCode::BAD_REQUEST,
                    &format!("No such core: {}", name),
                );
            }
            if action == "UNLOAD" {
                cores.remove(&name);
            }
            Json(ok()).into_response()
        }
        other => error(
            StatusCode::BAD_REQUEST,
            &format!("Unsupported operation: {}", other),
        ),
    }
}

async fn handle_system(State(state): State<Arc<FakeState>>, method: Method, uri: Uri) -> Response {
    state.record(&method, &uri, b"");
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
  <lst name="responseHeader"><int name="status">0</int><int name="QTime">2</int></lst>
  <str name="mode">std</str>
  <str name="solr_home">{}</str>
  <lst name="lucene">
    <str name="solr-spec-version">9.4.0</str>
    <str name="lucene-spec-version">9.8.0</str>
  </lst>
</response>"#,
        state.home.display()
    );
    ([("content-type", "application/xml")], xml).into_response()
}

async fn handle_schema(
    State(state): State<Arc<FakeState>>,
    UrlPath(core): UrlPath<String>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    state.record(&method, &uri, &body);
    if state.core(&core).is_none() {
        return (
            StatusCode::NOT_FOUND,
            format!("<html><body>Not Found: /solr/{}/schema</body></html>", core),
        )
            .into_response();
    }
    state
        .schemas
        .lock()
        .unwrap()
        .insert(core, String::from_utf8_lossy(&body).into_owned());
    Json(ok()).into_response()
}

async fn handle_ping(
    State(state): State<Arc<FakeState>>,
    UrlPath(core): UrlPath<String>,
    method: Method,
    uri: Uri,
) -> Response {
    state.record(&method, &uri, b"");
    if state.core(&core).is_none() {
        return error(StatusCode::NOT_FOUND, &format!("Core '{}' not found", core));
    }
    let mut body = ok();
    body["status"] = json!("OK");
    Json(body).into_response()
}

async fn handle_select(
    State(state): State<Arc<FakeState>>,
    UrlPath(core): UrlPath<String>,
    method: Method,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.record(&method, &uri, b"");
    let Some(index) = state.core(&core) else {
        return error(StatusCode::NOT_FOUND, &format!("Core '{}' not found", core));
    };
    let num = |key: &str, default: usize| {
        params
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    };
    let highlight = (params.get("hl").map(String::as_str) == Some("true")).then(|| HighlightSpec {
        field: params.get("hl.fl").cloned().unwrap_or_default(),
        pre: params.get("hl.simple.pre").cloned().unwrap_or_else(|| "<em>".into()),
        post: params.get("hl.simple.post").cloned().unwrap_or_else(|| "</em>".into()),
    });
    let q = params.get("q").cloned().unwrap_or_default();
    let resp = index.select(&q, num("start", 0), num("rows", DEFAULT_ROWS), highlight.as_ref());
    Json(resp).into_response()
}

fn flag(query: &Option<String>, key: &str, value: &str) -> bool {
    query
        .as_deref()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes()).any(|(k, v)| k == key && v == value)
        })
        .unwrap_or(false)
}

fn rejected(doc: &serde_json::Map<String, Value>) -> bool {
    doc.values()
        .any(|v| v.to_string().contains(REJECT_MARKER))
}

async fn handle_docs(
    State(state): State<Arc<FakeState>>,
    UrlPath(core): UrlPath<String>,
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    state.record(&method, &uri, &body);
    let Some(index) = state.core(&core) else {
        return error(StatusCode::NOT_FOUND, &format!("Core '{}' not found", core));
    };
    let docs = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Array(items)) => items,
        Ok(obj @ Value::Object(_)) => vec![obj],
        _ => return error(StatusCode::BAD_REQUEST, "Invalid JSON"),
    };
    let docs: Vec<_> = docs
        .into_iter()
        .filter_map(|d| match d {
            Value::Object(m) => Some(m),
            _ => None,
        })
        .collect();
    if let Some(bad) = docs.iter().find(|d| rejected(d)) {
        let id = bad.get("id").and_then(Value::as_str).unwrap_or("");
        return error(
            StatusCode::BAD_REQUEST,
            &format!("ERROR: [doc={}] unknown field 'rejected'", id),
        );
    }
    index.add(docs, !flag(&query, "overwrite", "false"));
    if flag(&query, "commit", "true") {
        index.commit_pending();
    }
    Json(ok()).into_response()
}

async fn handle_update(
    State(state): State<Arc<FakeState>>,
    UrlPath(core): UrlPath<String>,
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    state.record(&method, &uri, &body);
    let Some(index) = state.core(&core) else {
        return error(StatusCode::NOT_FOUND, &format!("Core '{}' not found", core));
    };
    let Ok(cmd) = serde_json::from_slice::<Value>(&body) else {
        return error(StatusCode::BAD_REQUEST, "Invalid JSON");
    };
    if let Some(add) = cmd.get("add") {
        let overwrite = add.get("overwrite").and_then(Value::as_bool).unwrap_or(true);
        if let Some(Value::Object(doc)) = add.get("doc") {
            index.add(vec![doc.clone()], overwrite);
        }
    }
    if let Some(q) = cmd.pointer("/delete/query").and_then(Value::as_str) {
        index.delete_matching(q);
    }
    if cmd.get("commit").is_some() || flag(&query, "commit", "true") {
        index.commit_pending();
    }
    Json(ok()).into_response()
}
