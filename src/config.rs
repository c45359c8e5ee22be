use anyhow::{Context, Result};
use globset::Glob;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub search: SearchConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub files: Vec<FileRule>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Backend base URI, e.g. `http://localhost:8983` (a trailing `/solr` is accepted).
    pub uri: String,
    /// Collection the import and search commands work against.
    pub core: String,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

fn default_search_timeout() -> u64 {
    30
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionBackend {
    /// Remote content-extraction server.
    Tika,
    /// In-process OOXML / PDF / text rendering.
    Local,
}

/// How whitespace inside extracted text is normalized before indexing.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WhitespacePolicy {
    /// Remove every whitespace character.
    #[default]
    Strip,
    /// Fold each run of whitespace into a single space and trim the ends.
    Collapse,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_extraction_backend")]
    pub backend: ExtractionBackend,
    #[serde(default = "default_extraction_uri")]
    pub uri: String,
    #[serde(default = "default_extraction_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub whitespace: WhitespacePolicy,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            backend: default_extraction_backend(),
            uri: default_extraction_uri(),
            timeout_secs: default_extraction_timeout(),
            whitespace: WhitespacePolicy::default(),
        }
    }
}

fn default_extraction_backend() -> ExtractionBackend {
    ExtractionBackend::Tika
}
fn default_extraction_uri() -> String {
    "http://localhost:9998".to_string()
}
fn default_extraction_timeout() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct HarvestConfig {
    #[serde(default = "default_sru_endpoint")]
    pub sru_endpoint: String,
    #[serde(default = "default_oaipmh_endpoint")]
    pub oaipmh_endpoint: String,
    /// Pause between resumption-token pages.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    /// `maximumRecords` sent with each SRU lookup.
    #[serde(default = "default_max_records")]
    pub max_records: u32,
    #[serde(default = "default_harvest_timeout")]
    pub timeout_secs: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            sru_endpoint: default_sru_endpoint(),
            oaipmh_endpoint: default_oaipmh_endpoint(),
            page_delay_ms: default_page_delay_ms(),
            max_records: default_max_records(),
            timeout_secs: default_harvest_timeout(),
        }
    }
}

fn default_sru_endpoint() -> String {
    "https://iss.ndl.go.jp/api/sru".to_string()
}
fn default_oaipmh_endpoint() -> String {
    "https://iss.ndl.go.jp/api/oaipmh".to_string()
}
fn default_page_delay_ms() -> u64 {
    1000
}
fn default_max_records() -> u32 {
    2
}
fn default_harvest_timeout() -> u64 {
    60
}

/// Per-file extraction rule, matched against the file name.
#[derive(Debug, Deserialize, Clone)]
pub struct FileRule {
    pub pattern: String,
    #[serde(default)]
    pub exclude_sheets: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate search backend
    if config.search.uri.trim().is_empty() {
        anyhow::bail!("search.uri must not be empty");
    }
    if config.search.core.trim().is_empty() {
        anyhow::bail!("search.core must not be empty");
    }
    url::Url::parse(&config.search.uri)
        .with_context(|| format!("search.uri is not a valid URI: {}", config.search.uri))?;
    if config.search.timeout_secs == 0 {
        anyhow::bail!("search.timeout_secs must be > 0");
    }

    // Validate extraction
    if config.extraction.backend == ExtractionBackend::Tika {
        url::Url::parse(&config.extraction.uri).with_context(|| {
            format!(
                "extraction.uri is not a valid URI: {}",
                config.extraction.uri
            )
        })?;
    }
    if config.extraction.timeout_secs == 0 {
        anyhow::bail!("extraction.timeout_secs must be > 0");
    }

    // Validate harvest
    if config.harvest.max_records == 0 {
        anyhow::bail!("harvest.max_records must be >= 1");
    }
    if config.harvest.timeout_secs == 0 {
        anyhow::bail!("harvest.timeout_secs must be > 0");
    }

    for rule in &config.files {
        Glob::new(&rule.pattern)
            .with_context(|| format!("files.pattern is not a valid glob: {}", rule.pattern))?;
    }

    Ok(())
}
