//! Select-query builder.
//!
//! Clauses are accumulated in order and joined with the configured boolean
//! operator only when the query is serialized. Parameters are last-write-wins
//! per key.

use std::collections::BTreeMap;
use std::fmt;

/// Rows returned when the caller does not set a limit.
pub const DEFAULT_ROWS: usize = 20;

/// Clause that matches every document.
pub const MATCH_ALL: &str = "*:*";

/// Boolean operator placed between clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoolOp {
    #[default]
    Or,
    And,
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolOp::Or => f.write_str("OR"),
            BoolOp::And => f.write_str("AND"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    clauses: Vec<String>,
    operator: BoolOp,
    params: BTreeMap<String, String>,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

/// Trims ASCII and full-width (U+3000) whitespace from free-text input.
pub fn trim_free_text(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\u{3000}')
}

impl Query {
    pub fn new() -> Self {
        let mut params = BTreeMap::new();
        params.insert("rows".to_string(), DEFAULT_ROWS.to_string());
        Self {
            clauses: Vec::new(),
            operator: BoolOp::Or,
            params,
        }
    }

    /// Builds a single-field query from user input.
    ///
    /// Input that is empty after trimming becomes the match-all clause, so
    /// "no query" is never submitted as an empty string.
    pub fn free_text(field: &str, text: &str) -> Self {
        let text = trim_free_text(text);
        let clause = if text.is_empty() {
            MATCH_ALL.to_string()
        } else {
            format!("{}:{}", field, text)
        };
        Self::new().q(clause)
    }

    /// Appends a clause.
    pub fn q(mut self, clause: impl Into<String>) -> Self {
        self.clauses.push(clause.into());
        self
    }

    pub fn operator(mut self, op: BoolOp) -> Self {
        self.operator = op;
        self
    }

    pub fn rows(self, rows: usize) -> Self {
        self.set_param("rows", rows.to_string())
    }

    pub fn start(self, start: usize) -> Self {
        self.set_param("start", start.to_string())
    }

    pub fn set_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Enables highlighting on `field`, wrapping matches in `pre`/`post`.
    pub fn highlight(self, field: &str, pre: &str, post: &str) -> Self {
        self.set_param("hl", "true")
            .set_param("hl.fl", field)
            .set_param("hl.simple.pre", pre)
            .set_param("hl.simple.post", post)
    }

    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The combined `q` value; match-all when no clause was added.
    pub fn q_value(&self) -> String {
        if self.clauses.is_empty() {
            MATCH_ALL.to_string()
        } else {
            self.clauses.join(&format!(" {} ", self.operator))
        }
    }

    /// Serializes to a URL query string, always requesting a JSON reply.
    pub fn to_query_string(&self) -> String {
        let mut ser = url::form_urlencoded::Serializer::new(String::new());
        ser.append_pair("q", &self.q_value());
        for (k, v) in &self.params {
            if k == "q" || k == "wt" {
                continue;
            }
            ser.append_pair(k, v);
        }
        ser.append_pair("wt", "json");
        ser.finish()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}
