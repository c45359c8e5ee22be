//! Import pipeline orchestration.
//!
//! Coordinates the batch flow: read file → classify media type → parse →
//! extract content units → map to documents → submit with `commit=false`,
//! then a single commit once every input has been handled.
//!
//! # Skip vs abort
//!
//! | Condition | Effect |
//! |-----------|--------|
//! | backend ping fails | abort before the first file |
//! | input cannot be read | abort, naming the file |
//! | extraction server unreachable | abort |
//! | backend unreachable on submit | abort |
//! | empty / unsupported / unparseable input, unknown format | skip file, continue |
//! | backend rejects a file's documents | count as failed, continue |
//!
//! Aborts carry the number of inputs fully processed so far
//! ([`ImportError::succeeded`]).

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::biblio::{self, normalize_isbn, HarvestError, OaiPmhClient, SruClient};
use crate::client::{SearchIndex, WriteOptions};
use crate::config::{FileRule, WhitespacePolicy};
use crate::error::{ImportAbort, ImportError};
use crate::extract::{media_type_for_path, ExtractContext, ExtractorRegistry, SourceFile};
use crate::models::{ContentUnitDocument, Document};
use crate::parse::DocumentParser;

/// Outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Inputs handed to the run.
    pub submitted: usize,
    /// Inputs fully processed and submitted.
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Documents sent to the index.
    pub documents: usize,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "success_count={}/{} (skipped {}, failed {}, documents {})",
            self.succeeded, self.submitted, self.skipped, self.failed, self.documents
        )
    }
}

/// Sheet-exclusion rules matched against file names.
#[derive(Debug, Clone)]
pub struct SheetRules {
    set: GlobSet,
    excludes: Vec<Vec<String>>,
}

impl Default for SheetRules {
    fn default() -> Self {
        Self {
            set: GlobSet::empty(),
            excludes: Vec::new(),
        }
    }
}

impl SheetRules {
    pub fn from_rules(rules: &[FileRule]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for rule in rules {
            builder.add(Glob::new(&rule.pattern)?);
        }
        Ok(Self {
            set: builder.build()?,
            excludes: rules.iter().map(|r| r.exclude_sheets.clone()).collect(),
        })
    }

    /// Union of the excluded sheets of every rule matching the file name.
    pub fn excluded_for(&self, path: &Path) -> HashSet<String> {
        let name = path.file_name().map(Path::new).unwrap_or(path);
        self.set
            .matches(name)
            .into_iter()
            .flat_map(|i| self.excludes[i].iter().cloned())
            .collect()
    }
}

/// Expands directories (recursively, following symlinks, sorted) and keeps
/// file arguments as given, so a missing file still reaches the pipeline and
/// aborts it.
///
/// An entry the walk cannot read (unreadable directory, dangling link) aborts
/// with [`ImportAbort::OpenFile`] before any input is processed.
pub fn collect_input_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, ImportError> {
    let mut out = Vec::new();
    for p in paths {
        if !p.is_dir() {
            out.push(p.clone());
            continue;
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(p).follow_links(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| p.clone());
                warn!(path = %path.display(), error = %e, "cannot read input");
                ImportError::new(
                    ImportAbort::OpenFile {
                        path,
                        source: std::io::Error::from(e),
                    },
                    0,
                )
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        out.extend(files);
    }
    Ok(out)
}

async fn read_input(path: &Path, succeeded: usize) -> Result<Vec<u8>, ImportError> {
    tokio::fs::read(path).await.map_err(|source| {
        ImportError::new(
            ImportAbort::OpenFile {
                path: path.to_path_buf(),
                source,
            },
            succeeded,
        )
    })
}

/// Runs import batches against one index.
pub struct ImportPipeline<'a> {
    index: &'a dyn SearchIndex,
    registry: ExtractorRegistry,
    rules: SheetRules,
    whitespace: WhitespacePolicy,
}

impl<'a> ImportPipeline<'a> {
    pub fn new(index: &'a dyn SearchIndex) -> Self {
        Self {
            index,
            registry: ExtractorRegistry::new(),
            rules: SheetRules::default(),
            whitespace: WhitespacePolicy::default(),
        }
    }

    pub fn with_registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_rules(mut self, rules: SheetRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_whitespace(mut self, policy: WhitespacePolicy) -> Self {
        self.whitespace = policy;
        self
    }

    async fn ping(&self) -> Result<(), ImportError> {
        let status = self.index.ping().await.map_err(|e| {
            warn!(core = self.index.name(), error = %e, "ping failed");
            ImportError::new(e, 0)
        })?;
        debug!(status = %status.status, qtime = status.qtime, "ping ok");
        Ok(())
    }

    /// Submits one input's documents. `Ok(false)` means the backend rejected
    /// them and the run continues.
    async fn submit(&self, docs: &[Document], succeeded: usize) -> Result<bool, ImportError> {
        if docs.is_empty() {
            return Ok(true);
        }
        match self.index.bulk_create(docs, &WriteOptions::batched()).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_transport() => Err(ImportError::new(e, succeeded)),
            Err(e) => {
                warn!(error = %e, "backend rejected documents");
                Ok(false)
            }
        }
    }

    async fn finish(&self, report: ImportReport) -> Result<ImportReport, ImportError> {
        self.index
            .commit()
            .await
            .map_err(|e| ImportError::new(e, report.succeeded))?;
        info!(%report, "import finished");
        Ok(report)
    }

    /// Imports files through `parser` and the extractor registry.
    pub async fn import_files(
        &self,
        parser: &dyn DocumentParser,
        files: &[PathBuf],
    ) -> Result<ImportReport, ImportError> {
        let mut report = ImportReport {
            submitted: files.len(),
            ..Default::default()
        };
        self.ping().await?;

        for (i, path) in files.iter().enumerate() {
            info!("{}/{} file: {}", i + 1, files.len(), path.display());
            let bytes = read_input(path, report.succeeded).await?;

            let media_type = media_type_for_path(path);
            let Some(extractor) = self.registry.get(media_type) else {
                warn!(file = %path.display(), "unknown format, skipping");
                report.skipped += 1;
                continue;
            };

            let parsed = match parser.parse(bytes, media_type).await {
                Ok(p) => p,
                Err(e) if e.is_skip() => {
                    info!(file = %path.display(), reason = %e, "skipping");
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    return Err(ImportError::new(
                        ImportAbort::Extraction(e),
                        report.succeeded,
                    ))
                }
            };

            let ctx = ExtractContext::new(SourceFile::from_path(path))
                .exclude_sheets(self.rules.excluded_for(path))
                .whitespace(self.whitespace);
            let docs: Vec<Document> = extractor
                .extract(&parsed, &ctx)
                .iter()
                .map(|u| ContentUnitDocument::from(u).into())
                .collect();
            debug!(file = %path.display(), units = docs.len(), "extracted");

            if self.submit(&docs, report.succeeded).await? {
                report.succeeded += 1;
                report.documents += docs.len();
            } else {
                report.failed += 1;
            }
        }

        self.finish(report).await
    }

    /// Imports OAI-PMH `ListRecords` dumps saved as files.
    pub async fn import_oaipmh_files(&self, files: &[PathBuf]) -> Result<ImportReport, ImportError> {
        let mut report = ImportReport {
            submitted: files.len(),
            ..Default::default()
        };
        self.ping().await?;

        for (i, path) in files.iter().enumerate() {
            info!("{}/{} file: {}", i + 1, files.len(), path.display());
            let bytes = read_input(path, report.succeeded).await?;
            let text = String::from_utf8_lossy(&bytes);
            let page = match biblio::parse_oaipmh(&text) {
                Ok(p) => p,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "not an OAI-PMH dump");
                    report.failed += 1;
                    continue;
                }
            };
            let docs: Vec<Document> = page
                .records
                .iter()
                .map(|r| biblio::map_record(&r.record).into())
                .collect();
            if self.submit(&docs, report.succeeded).await? {
                report.succeeded += 1;
                report.documents += docs.len();
            } else {
                report.failed += 1;
            }
        }

        self.finish(report).await
    }

    /// Imports ISBN list files (one per line) by looking each ISBN up over SRU.
    ///
    /// Blank lines are ignored; malformed or unknown ISBNs are logged and
    /// skipped. An unreachable SRU endpoint aborts the run.
    pub async fn import_isbn_files(
        &self,
        files: &[PathBuf],
        sru: &SruClient,
    ) -> Result<ImportReport, ImportError> {
        let mut report = ImportReport {
            submitted: files.len(),
            ..Default::default()
        };
        self.ping().await?;

        for (i, path) in files.iter().enumerate() {
            info!("{}/{} file: {}", i + 1, files.len(), path.display());
            let bytes = read_input(path, report.succeeded).await?;
            let text = String::from_utf8_lossy(&bytes);

            let mut docs: Vec<Document> = Vec::new();
            for line in text.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let isbn = match normalize_isbn(line) {
                    Ok(isbn) => isbn,
                    Err(e) => {
                        warn!(error = %e, "skipping line");
                        continue;
                    }
                };
                match sru.fetch_by_isbn(&isbn).await {
                    Ok(rec) => docs.push(biblio::map_record(&rec).into()),
                    Err(e @ HarvestError::Http { .. }) => {
                        return Err(ImportError::new(e, report.succeeded))
                    }
                    Err(e) => warn!(%isbn, error = %e, "lookup failed"),
                }
            }

            if self.submit(&docs, report.succeeded).await? {
                report.succeeded += 1;
                report.documents += docs.len();
            } else {
                report.failed += 1;
            }
        }

        self.finish(report).await
    }

    /// Harvests every record stamped on `date` and imports it.
    ///
    /// The date is validated before any request.
    pub async fn harvest_oaipmh(
        &self,
        client: &OaiPmhClient,
        date: &str,
    ) -> Result<ImportReport, ImportError> {
        biblio::validate_harvest_date(date).map_err(|e| ImportError::new(e, 0))?;
        self.ping().await?;

        let records = client
            .list_records(date)
            .await
            .map_err(|e| ImportError::new(e, 0))?;
        let docs: Vec<Document> = records
            .iter()
            .map(|r| biblio::map_record(&r.record).into())
            .collect();
        let mut report = ImportReport {
            submitted: docs.len(),
            ..Default::default()
        };
        if self.submit(&docs, 0).await? {
            report.succeeded = docs.len();
            report.documents = docs.len();
        } else {
            report.failed = docs.len();
        }
        self.finish(report).await
    }
}
