//! In-process [`SearchIndex`] with the same commit semantics as the backend.
//!
//! Writes land in a pending log and only become searchable after
//! [`commit`](MemoryIndex::commit_pending). Used for `--dry-run` imports and
//! as the store behind the fake backend in the integration tests.
//!
//! Query support is small: `*:*`, `field:term` (substring,
//! case-insensitive, `*` wildcards, optional quotes) and clauses joined by
//! `OR` / `AND`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{
    Highlighting, PingStatus, Query, ResponseEnvelope, ResponseHeader, ResultSet, SearchIndex,
    SearchResponse, WireDocument, WriteOptions, DEFAULT_ROWS, MATCH_ALL,
};
use crate::error::ClientError;
use crate::models::Document;

#[derive(Debug, Clone)]
enum PendingOp {
    Add { doc: WireDocument, overwrite: bool },
    Delete(String),
}

#[derive(Debug, Default)]
struct State {
    pending: Vec<PendingOp>,
    committed: Vec<WireDocument>,
}

/// Highlight request carried by a select.
#[derive(Debug, Clone)]
pub struct HighlightSpec {
    pub field: String,
    pub pre: String,
    pub post: String,
}

#[derive(Debug, Default)]
pub struct MemoryIndex {
    name: String,
    state: Mutex<State>,
}

impl MemoryIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues documents. With `overwrite`, a document replaces any committed
    /// document with the same id at commit time.
    pub fn add(&self, docs: Vec<WireDocument>, overwrite: bool) {
        let mut st = self.lock();
        st.pending
            .extend(docs.into_iter().map(|doc| PendingOp::Add { doc, overwrite }));
    }

    pub fn delete_matching(&self, q: &str) {
        self.lock().pending.push(PendingOp::Delete(q.to_string()));
    }

    /// Applies pending operations in order.
    pub fn commit_pending(&self) {
        let mut st = self.lock();
        let ops = std::mem::take(&mut st.pending);
        for op in ops {
            match op {
                PendingOp::Add { doc, overwrite } => {
                    if overwrite {
                        let id = doc.get("id").cloned();
                        st.committed.retain(|d| d.get("id") != id.as_ref());
                    }
                    st.committed.push(doc);
                }
                PendingOp::Delete(q) => st.committed.retain(|d| !matches_query(d, &q)),
            }
        }
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of committed (searchable) documents.
    pub fn len(&self) -> usize {
        self.lock().committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the committed documents in insertion order.
    pub fn documents(&self) -> Vec<WireDocument> {
        self.lock().committed.clone()
    }

    /// Runs a select over committed documents.
    pub fn select(
        &self,
        q: &str,
        start: usize,
        rows: usize,
        highlight: Option<&HighlightSpec>,
    ) -> SearchResponse {
        let st = self.lock();
        let hits: Vec<&WireDocument> = st
            .committed
            .iter()
            .filter(|d| matches_query(d, q))
            .collect();
        let docs: Vec<WireDocument> = hits
            .iter()
            .skip(start)
            .take(rows)
            .map(|d| (*d).clone())
            .collect();

        let highlighting = highlight.map(|hl| {
            let terms = query_terms(q, &hl.field);
            let mut out: Highlighting = HashMap::new();
            for d in &docs {
                let id = d.get("id").and_then(Value::as_str).unwrap_or_default();
                let frags: Vec<String> = field_values(d, &hl.field)
                    .into_iter()
                    .filter_map(|v| mark(&v, &terms, &hl.pre, &hl.post))
                    .collect();
                let mut fields = HashMap::new();
                if !frags.is_empty() {
                    fields.insert(hl.field.clone(), frags);
                }
                out.insert(id.to_string(), fields);
            }
            out
        });

        SearchResponse {
            header: ResponseHeader::default(),
            results: ResultSet {
                num_found: hits.len() as u64,
                start: start as u64,
                docs,
            },
            highlighting,
        }
    }
}

fn field_values(doc: &WireDocument, field: &str) -> Vec<String> {
    match doc.get(field) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.to_string()],
    }
}

fn split_clauses(q: &str) -> (Vec<&str>, bool) {
    if q.contains(" AND ") {
        (q.split(" AND ").collect(), true)
    } else {
        (q.split(" OR ").collect(), false)
    }
}

/// Search terms in `q` that apply to `field`, wildcards removed.
fn query_terms(q: &str, field: &str) -> Vec<String> {
    let (clauses, _) = split_clauses(q);
    clauses
        .iter()
        .filter_map(|c| c.trim().split_once(':'))
        .filter(|(f, _)| *f == field)
        .map(|(_, t)| t.trim_matches('"').replace('*', ""))
        .filter(|t| !t.is_empty())
        .collect()
}

fn mark(value: &str, terms: &[String], pre: &str, post: &str) -> Option<String> {
    let mut out = value.to_string();
    let mut hit = false;
    for t in terms {
        if out.contains(t.as_str()) {
            out = out.replace(t.as_str(), &format!("{}{}{}", pre, t, post));
            hit = true;
        }
    }
    hit.then_some(out)
}

fn matches_query(doc: &WireDocument, q: &str) -> bool {
    let q = q.trim();
    if q.is_empty() || q == MATCH_ALL {
        return true;
    }
    let (clauses, all) = split_clauses(q);
    if all {
        clauses.iter().all(|c| matches_clause(doc, c))
    } else {
        clauses.iter().any(|c| matches_clause(doc, c))
    }
}

fn matches_clause(doc: &WireDocument, clause: &str) -> bool {
    let clause = clause.trim();
    if clause == MATCH_ALL {
        return true;
    }
    let Some((field, term)) = clause.split_once(':') else {
        return false;
    };
    let term = term.trim_matches('"').to_lowercase();
    field_values(doc, field)
        .iter()
        .any(|v| wildcard_contains(&v.to_lowercase(), &term))
}

/// Substring match where `*` stands for any run of characters.
fn wildcard_contains(value: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return !value.is_empty();
    }
    let mut rest = value;
    for p in parts {
        match rest.find(p) {
            Some(i) => rest = &rest[i + p.len()..],
            None => return false,
        }
    }
    true
}

fn envelope() -> ResponseEnvelope {
    ResponseEnvelope {
        header: ResponseHeader::default(),
        status: None,
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> Result<PingStatus, ClientError> {
        Ok(PingStatus {
            status: "OK".to_string(),
            qtime: 0,
        })
    }

    async fn search(&self, query: &Query) -> Result<SearchResponse, ClientError> {
        let parse = |key: &str, default: usize| {
            query
                .param(key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };
        let highlight = (query.param("hl") == Some("true")).then(|| HighlightSpec {
            field: query.param("hl.fl").unwrap_or("contents").to_string(),
            pre: query.param("hl.simple.pre").unwrap_or("<em>").to_string(),
            post: query.param("hl.simple.post").unwrap_or("</em>").to_string(),
        });
        Ok(self.select(
            &query.q_value(),
            parse("start", 0),
            parse("rows", DEFAULT_ROWS),
            highlight.as_ref(),
        ))
    }

    async fn create(
        &self,
        doc: &Document,
        opts: &WriteOptions,
    ) -> Result<ResponseEnvelope, ClientError> {
        self.bulk_create(std::slice::from_ref(doc), opts).await
    }

    async fn bulk_create(
        &self,
        docs: &[Document],
        opts: &WriteOptions,
    ) -> Result<ResponseEnvelope, ClientError> {
        self.add(docs.iter().map(Document::to_wire).collect(), opts.overwrite());
        if opts.commit {
            self.commit_pending();
        }
        Ok(envelope())
    }

    async fn delete_by_query(
        &self,
        query: &str,
        opts: &WriteOptions,
    ) -> Result<ResponseEnvelope, ClientError> {
        self.delete_matching(query);
        if opts.commit {
            self.commit_pending();
        }
        Ok(envelope())
    }

    async fn commit(&self) -> Result<ResponseEnvelope, ClientError> {
        self.commit_pending();
        Ok(envelope())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(v: Value) -> WireDocument {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn writes_are_invisible_until_commit() {
        let idx = MemoryIndex::new("t");
        idx.add(vec![wire(json!({"id": "a", "contents": ["river"]}))], true);
        assert_eq!(idx.select("*:*", 0, 10, None).results.num_found, 0);
        assert_eq!(idx.pending_len(), 1);
        idx.commit_pending();
        assert_eq!(idx.select("*:*", 0, 10, None).results.num_found, 1);
        assert_eq!(idx.pending_len(), 0);
    }

    #[test]
    fn overwrite_replaces_same_id() {
        let idx = MemoryIndex::new("t");
        idx.add(vec![wire(json!({"id": "a", "title": "one"}))], true);
        idx.add(vec![wire(json!({"id": "a", "title": "two"}))], true);
        idx.commit_pending();
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.documents()[0]["title"], "two");

        idx.add(vec![wire(json!({"id": "a", "title": "three"}))], false);
        idx.commit_pending();
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn field_clauses_and_operators() {
        let idx = MemoryIndex::new("t");
        idx.add(
            vec![
                wire(json!({"id": "1", "contents": ["Tokyo river"], "sheetname": "A"})),
                wire(json!({"id": "2", "contents": ["Osaka castle"], "sheetname": "B"})),
            ],
            true,
        );
        idx.commit_pending();
        assert_eq!(idx.select("contents:river", 0, 10, None).results.num_found, 1);
        assert_eq!(
            idx.select("contents:river OR contents:castle", 0, 10, None)
                .results
                .num_found,
            2
        );
        assert_eq!(
            idx.select("contents:river AND sheetname:B", 0, 10, None)
                .results
                .num_found,
            0
        );
        assert_eq!(idx.select("contents:to*river", 0, 10, None).results.num_found, 1);
    }

    #[test]
    fn paging_keeps_total() {
        let idx = MemoryIndex::new("t");
        idx.add(
            (0..5)
                .map(|i| wire(json!({"id": i.to_string()})))
                .collect(),
            true,
        );
        idx.commit_pending();
        let r = idx.select("*:*", 3, 10, None);
        assert_eq!(r.results.num_found, 5);
        assert_eq!(r.results.start, 3);
        assert_eq!(r.results.docs.len(), 2);
    }

    #[test]
    fn delete_is_pending_until_commit() {
        let idx = MemoryIndex::new("t");
        idx.add(vec![wire(json!({"id": "a"})), wire(json!({"id": "b"}))], true);
        idx.commit_pending();
        idx.delete_matching("id:a");
        assert_eq!(idx.len(), 2);
        idx.commit_pending();
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn highlights_matching_terms() {
        let idx = MemoryIndex::new("t");
        idx.add(vec![wire(json!({"id": "a", "contents": ["the river bank", "hill"]}))], true);
        idx.commit_pending();
        let hl = HighlightSpec {
            field: "contents".to_string(),
            pre: "<em>".to_string(),
            post: "</em>".to_string(),
        };
        let r = idx.select("contents:river", 0, 10, Some(&hl));
        let frags = &r.highlighting.unwrap()["a"]["contents"];
        assert_eq!(frags, &vec!["the <em>river</em> bank".to_string()]);
    }
}
