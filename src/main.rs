//! # Catalog Indexer CLI (`catidx`)
//!
//! ## Usage
//!
//! ```bash
//! catidx --config ./config/catidx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `catidx ping` | Check the backend and the configured collection |
//! | `catidx core status [name]` | Show collection status |
//! | `catidx core create\|reload\|unload <name>` | Single admin actions |
//! | `catidx core provision [name] --schema <file>` | Copy configset, create, load schema, reload |
//! | `catidx import files <paths..>` | Import office documents, PDFs and text |
//! | `catidx import oaipmh <paths..>` | Import saved OAI-PMH `ListRecords` dumps |
//! | `catidx import isbn <paths..>` | Look up ISBN lists over SRU and import the records |
//! | `catidx harvest oaipmh --date <yyyy-MM-dd>` | Harvest one day of records |
//! | `catidx search "<text>"` | Keyword search with highlighting |
//! | `catidx clear --yes` | Delete every document in the collection |
//!
//! Logs go to stderr (`RUST_LOG` overrides `[logging] level`); summaries go
//! to stdout.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use catalog_indexer::biblio::{OaiPmhClient, SruClient};
use catalog_indexer::client::{AdminAction, AdminClient, DataClient, IndexAdmin, SearchIndex};
use catalog_indexer::config::{self, Config};
use catalog_indexer::error::ImportError;
use catalog_indexer::ingest::{collect_input_files, ImportPipeline, ImportReport, SheetRules};
use catalog_indexer::memory::MemoryIndex;
use catalog_indexer::parse::parser_from_config;
use catalog_indexer::provision::Provisioning;
use catalog_indexer::search::{render_page, search_catalog};

/// Catalog Indexer: builds a searchable catalog on a Solr-compatible backend.
#[derive(Parser)]
#[command(name = "catidx", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/catidx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend and the configured collection respond.
    Ping,

    /// Collection administration.
    Core {
        #[command(subcommand)]
        action: CoreAction,
    },

    /// Import inputs into the configured collection.
    Import {
        #[command(subcommand)]
        source: ImportSource,
    },

    /// Harvest bibliographic records from a remote endpoint.
    Harvest {
        #[command(subcommand)]
        source: HarvestSource,
    },

    /// Search the collection.
    Search {
        /// Free text; empty lists everything.
        #[arg(default_value = "")]
        text: String,

        #[arg(long, default_value_t = 0)]
        start: usize,

        #[arg(long, default_value_t = 10)]
        rows: usize,
    },

    /// Delete every document in the collection.
    Clear {
        /// Required; the operation cannot be undone.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum CoreAction {
    /// Show status of one collection, or all of them.
    Status { name: Option<String> },
    Create { name: String },
    Reload { name: String },
    Unload {
        name: String,
        /// Also delete index, data and instance directories.
        #[arg(long)]
        force: bool,
    },
    /// Run the full provisioning sequence for a new collection.
    Provision {
        /// Defaults to `[search] core`.
        name: Option<String>,
        /// Schema change document (JSON) posted after creation.
        #[arg(long)]
        schema: PathBuf,
    },
}

#[derive(Subcommand)]
enum ImportSource {
    /// Office documents, PDFs and text files. Directories are walked recursively.
    Files {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Run against an in-memory index and report counts only.
        #[arg(long)]
        dry_run: bool,
    },
    /// Saved OAI-PMH `ListRecords` responses.
    Oaipmh {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Text files with one ISBN per line.
    Isbn {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Subcommand)]
enum HarvestSource {
    /// Every record stamped on one day.
    Oaipmh {
        /// Day to harvest, `yyyy-MM-dd`.
        #[arg(long)]
        date: String,
    },
}

fn init_tracing(cfg: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.logging.level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn pipeline<'a>(cfg: &Config, index: &'a dyn SearchIndex) -> Result<ImportPipeline<'a>> {
    let rules = SheetRules::from_rules(&cfg.files).context("invalid [[files]] pattern")?;
    Ok(ImportPipeline::new(index)
        .with_rules(rules)
        .with_whitespace(cfg.extraction.whitespace))
}

fn report(result: Result<ImportReport, ImportError>) -> Result<()> {
    match result {
        Ok(report) => {
            println!("{}", report);
            Ok(())
        }
        Err(e) => {
            println!("success_count={}", e.succeeded);
            Err(e.into())
        }
    }
}

/// Expands input paths; a walk failure is reported like any other abort.
fn inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    match collect_input_files(paths) {
        Ok(files) => Ok(files),
        Err(e) => {
            println!("success_count={}", e.succeeded);
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    init_tracing(&cfg);

    let timeout = cfg.search.timeout();

    match cli.command {
        Commands::Ping => {
            let admin = AdminClient::new(&cfg.search.uri, timeout)?;
            let info = admin.ping().await?;
            println!("backend: {} (home {})", info.spec_version, info.home);
            let data = DataClient::from_config(&cfg.search)?;
            let status = data.ping().await?;
            println!("{}: {} ({} ms)", data.name(), status.status, status.qtime);
        }
        Commands::Core { action } => {
            let admin = AdminClient::new(&cfg.search.uri, timeout)?;
            run_core(&cfg, &admin, action).await?;
        }
        Commands::Import { source } => match source {
            ImportSource::Files { paths, dry_run } => {
                let files = inputs(&paths)?;
                let parser = parser_from_config(&cfg.extraction)?;
                if dry_run {
                    let index = MemoryIndex::new(cfg.search.core.clone());
                    report(
                        pipeline(&cfg, &index)?
                            .import_files(parser.as_ref(), &files)
                            .await,
                    )?;
                    println!("dry run: {} document(s) would be indexed", index.len());
                } else {
                    let index = DataClient::from_config(&cfg.search)?;
                    report(
                        pipeline(&cfg, &index)?
                            .import_files(parser.as_ref(), &files)
                            .await,
                    )?;
                }
            }
            ImportSource::Oaipmh { paths } => {
                let index = DataClient::from_config(&cfg.search)?;
                let files = inputs(&paths)?;
                report(pipeline(&cfg, &index)?.import_oaipmh_files(&files).await)?;
            }
            ImportSource::Isbn { paths } => {
                let index = DataClient::from_config(&cfg.search)?;
                let sru = SruClient::from_config(&cfg.harvest)?;
                let files = inputs(&paths)?;
                report(
                    pipeline(&cfg, &index)?
                        .import_isbn_files(&files, &sru)
                        .await,
                )?;
            }
        },
        Commands::Harvest { source } => match source {
            HarvestSource::Oaipmh { date } => {
                let index = DataClient::from_config(&cfg.search)?;
                let client = OaiPmhClient::from_config(&cfg.harvest)?;
                report(pipeline(&cfg, &index)?.harvest_oaipmh(&client, &date).await)?;
            }
        },
        Commands::Search { text, start, rows } => {
            let index = DataClient::from_config(&cfg.search)?;
            let page = search_catalog(&index, &text, start, rows).await?;
            println!("{}", render_page(&page));
        }
        Commands::Clear { yes } => {
            if !yes {
                bail!(
                    "refusing to delete every document in '{}' without --yes",
                    cfg.search.core
                );
            }
            let index = DataClient::from_config(&cfg.search)?;
            index.delete_all().await?;
            println!("Cleared collection '{}'.", index.name());
        }
    }

    Ok(())
}

async fn run_core(cfg: &Config, admin: &AdminClient, action: CoreAction) -> Result<()> {
    match action {
        CoreAction::Status { name } => {
            let res = match &name {
                Some(n) => admin.status(n).await?,
                None => admin.run(AdminAction::Status, &[]).await?,
            };
            if res.status.is_empty() {
                println!("No collections.");
            }
            let mut cores: Vec<_> = res.status.values().collect();
            cores.sort_by(|a, b| a.name.cmp(&b.name));
            for core in cores {
                if core.name.is_empty() {
                    continue;
                }
                let docs = core.index.as_ref().map(|i| i.num_docs).unwrap_or(0);
                println!("{}  docs={}  dir={}", core.name, docs, core.instance_dir);
            }
        }
        CoreAction::Create { name } => {
            admin.create(&name).await?;
            println!("Created '{}'.", name);
        }
        CoreAction::Reload { name } => {
            admin.reload(&name).await?;
            println!("Reloaded '{}'.", name);
        }
        CoreAction::Unload { name, force } => {
            if force {
                admin.force_unload(&name).await?;
            } else {
                admin.unload(&name).await?;
            }
            println!("Unloaded '{}'.", name);
        }
        CoreAction::Provision { name, schema } => {
            let name = name.unwrap_or_else(|| cfg.search.core.clone());
            let mut p = Provisioning::begin(admin, &name).await?;
            p.run(&schema).await?;
            println!("Provisioned '{}'.", name);
        }
    }
    Ok(())
}
