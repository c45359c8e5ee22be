//! SRU and OAI-PMH harvest clients and envelope parsing.

use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

use super::record::BibliographicRecord;
use crate::client::connection::user_agent;
use crate::config::HarvestConfig;
use crate::xml::{self, XmlElement};

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned http {status}")]
    Status { url: String, status: u16 },

    #[error("malformed harvest response: {0}")]
    Xml(String),

    #[error("invalid harvest date '{0}' (expected yyyy-MM-dd)")]
    InvalidDate(String),

    #[error("invalid isbn '{isbn}': {reason}")]
    InvalidIsbn { isbn: String, reason: String },

    #[error("no record by isbn ({0})")]
    NotFound(String),

    /// OAI-PMH `<error>` element.
    #[error("oai-pmh error {code}: {message}")]
    Protocol { code: String, message: String },
}

impl From<quick_xml::Error> for HarvestError {
    fn from(e: quick_xml::Error) -> Self {
        HarvestError::Xml(e.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Envelopes
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct SruResponse {
    pub number_of_records: u64,
    pub next_record_position: Option<u64>,
    pub records: Vec<BibliographicRecord>,
}

impl SruResponse {
    /// The record carrying a cataloging status, else the first one.
    pub fn preferred(&self) -> Option<&BibliographicRecord> {
        self.records
            .iter()
            .find(|r| r.cataloging_status.is_some())
            .or_else(|| self.records.first())
    }
}

fn number(el: &XmlElement, name: &str) -> Option<u64> {
    el.child_text(name).and_then(|t| t.parse().ok())
}

pub fn parse_sru(body: &str) -> Result<SruResponse, HarvestError> {
    let root = xml::parse(body)?;
    if root.name != "searchRetrieveResponse" {
        return Err(HarvestError::Xml(format!(
            "expected searchRetrieveResponse, found <{}>",
            root.name
        )));
    }
    let records = root
        .child("records")
        .map(|rs| {
            rs.children_named("record")
                .filter_map(|r| r.child("recordData"))
                .filter_map(BibliographicRecord::find_in)
                .collect()
        })
        .unwrap_or_default();
    Ok(SruResponse {
        number_of_records: number(&root, "numberOfRecords").unwrap_or(0),
        next_record_position: number(&root, "nextRecordPosition"),
        records,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumptionToken {
    pub token: String,
    pub cursor: Option<u64>,
    pub complete_list_size: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct HarvestedRecord {
    pub identifier: String,
    pub datestamp: String,
    pub record: BibliographicRecord,
}

#[derive(Debug, Clone, Default)]
pub struct OaiPmhPage {
    pub records: Vec<HarvestedRecord>,
    /// Present while more pages remain.
    pub resumption: Option<ResumptionToken>,
}

/// Parses one `ListRecords` page. `noRecordsMatch` is an empty page, not an error.
pub fn parse_oaipmh(body: &str) -> Result<OaiPmhPage, HarvestError> {
    let root = xml::parse(body)?;
    if root.name != "OAI-PMH" {
        return Err(HarvestError::Xml(format!(
            "expected OAI-PMH, found <{}>",
            root.name
        )));
    }
    if let Some(err) = root.child("error") {
        let code = err.attr("code").unwrap_or_default().to_string();
        if code == "noRecordsMatch" {
            return Ok(OaiPmhPage::default());
        }
        return Err(HarvestError::Protocol {
            code,
            message: err.text.clone(),
        });
    }

    let Some(list) = root.child("ListRecords") else {
        return Ok(OaiPmhPage::default());
    };
    let records = list
        .children_named("record")
        .filter_map(|r| {
            let header = r.child("header");
            let record = r.child("metadata").and_then(BibliographicRecord::find_in)?;
            Some(HarvestedRecord {
                identifier: header
                    .and_then(|h| h.child_text("identifier"))
                    .unwrap_or_default(),
                datestamp: header
                    .and_then(|h| h.child_text("datestamp"))
                    .unwrap_or_default(),
                record,
            })
        })
        .collect();

    let resumption = list.child("resumptionToken").and_then(|t| {
        (!t.text.is_empty()).then(|| ResumptionToken {
            token: t.text.clone(),
            cursor: t.attr("cursor").and_then(|v| v.parse().ok()),
            complete_list_size: t.attr("completeListSize").and_then(|v| v.parse().ok()),
        })
    });

    Ok(OaiPmhPage {
        records,
        resumption,
    })
}

/// Accepts exactly `yyyy-MM-dd` with a real calendar date.
pub fn validate_harvest_date(date: &str) -> Result<NaiveDate, HarvestError> {
    let shape_ok = date.len() == 10
        && date.char_indices().all(|(i, c)| match i {
            4 | 7 => c == '-',
            _ => c.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(HarvestError::InvalidDate(date.to_string()));
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| HarvestError::InvalidDate(date.to_string()))
}

// ═══════════════════════════════════════════════════════════════════════
// Clients
// ═══════════════════════════════════════════════════════════════════════

fn http_client(timeout: Duration) -> Result<reqwest::Client, HarvestError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent())
        .build()
        .map_err(|e| HarvestError::Http {
            url: String::new(),
            source: e,
        })
}

async fn get_text(
    http: &reqwest::Client,
    endpoint: &str,
    params: &[(&str, String)],
) -> Result<String, HarvestError> {
    let mut url = url::Url::parse(endpoint).map_err(|e| HarvestError::Xml(e.to_string()))?;
    url.query_pairs_mut().extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    let url = url.to_string();
    debug!(%url, "harvest request");
    let resp = http.get(&url).send().await.map_err(|e| HarvestError::Http {
        url: url.clone(),
        source: e,
    })?;
    let status = resp.status().as_u16();
    if status != 200 {
        return Err(HarvestError::Status { url, status });
    }
    resp.text()
        .await
        .map_err(|e| HarvestError::Http { url, source: e })
}

/// SRU search-by-ISBN client.
#[derive(Debug, Clone)]
pub struct SruClient {
    http: reqwest::Client,
    endpoint: String,
    max_records: u32,
}

impl SruClient {
    pub fn new(endpoint: &str, max_records: u32, timeout: Duration) -> Result<Self, HarvestError> {
        Ok(Self {
            http: http_client(timeout)?,
            endpoint: endpoint.to_string(),
            max_records,
        })
    }

    pub fn from_config(cfg: &HarvestConfig) -> Result<Self, HarvestError> {
        Self::new(
            &cfg.sru_endpoint,
            cfg.max_records,
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    pub async fn search_by_isbn(&self, isbn: &str) -> Result<SruResponse, HarvestError> {
        let params = [
            ("operation", "searchRetrieve".to_string()),
            ("recordSchema", "dcndl".to_string()),
            ("recordPacking", "xml".to_string()),
            ("onlyBib", "true".to_string()),
            ("maximumRecords", self.max_records.to_string()),
            ("query", format!("isbn={}", isbn)),
            ("sortBy", "modified_date.descending".to_string()),
        ];
        let body = get_text(&self.http, &self.endpoint, &params).await?;
        parse_sru(&body)
    }

    /// The preferred record for `isbn`, or [`HarvestError::NotFound`].
    pub async fn fetch_by_isbn(&self, isbn: &str) -> Result<BibliographicRecord, HarvestError> {
        let res = self.search_by_isbn(isbn).await?;
        if res.number_of_records == 0 {
            return Err(HarvestError::NotFound(isbn.to_string()));
        }
        res.preferred()
            .cloned()
            .ok_or_else(|| HarvestError::NotFound(isbn.to_string()))
    }
}

/// OAI-PMH `ListRecords` client.
#[derive(Debug, Clone)]
pub struct OaiPmhClient {
    http: reqwest::Client,
    endpoint: String,
    page_delay: Duration,
}

impl OaiPmhClient {
    pub fn new(endpoint: &str, page_delay: Duration, timeout: Duration) -> Result<Self, HarvestError> {
        Ok(Self {
            http: http_client(timeout)?,
            endpoint: endpoint.to_string(),
            page_delay,
        })
    }

    pub fn from_config(cfg: &HarvestConfig) -> Result<Self, HarvestError> {
        Self::new(
            &cfg.oaipmh_endpoint,
            Duration::from_millis(cfg.page_delay_ms),
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    /// One page: the first request carries the date window, later ones only the token.
    pub async fn fetch_page(
        &self,
        from: &str,
        until: &str,
        token: Option<&str>,
    ) -> Result<OaiPmhPage, HarvestError> {
        let mut params = vec![("verb", "ListRecords".to_string())];
        match token {
            Some(t) => params.push(("resumptionToken", t.to_string())),
            None => {
                params.push(("metadataPrefix", "dcndl".to_string()));
                params.push(("from", from.to_string()));
                params.push(("until", until.to_string()));
            }
        }
        let body = get_text(&self.http, &self.endpoint, &params).await?;
        parse_oaipmh(&body)
    }

    /// Every record stamped on `date`, following resumption tokens and
    /// pausing between pages.
    pub async fn list_records(&self, date: &str) -> Result<Vec<HarvestedRecord>, HarvestError> {
        validate_harvest_date(date)?;
        let mut records = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.fetch_page(date, date, token.as_deref()).await?;
            records.extend(page.records);
            let Some(next) = page.resumption else {
                break;
            };
            info!(
                cursor = next.cursor,
                complete_list_size = next.complete_list_size,
                harvested = records.len(),
                "next oai-pmh page"
            );
            token = Some(next.token);
            tokio::time::sleep(self.page_delay).await;
        }
        Ok(records)
    }
}
