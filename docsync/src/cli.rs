//! # docsync CLI Interface (Module)
//!
//! Command parsing and orchestration glue for the `docsync` binary. All
//! pipeline logic (normalization, mapping, stages, orchestrators) lives in
//! [`docsync_core`]; this module loads configuration and credentials, builds
//! the concrete clients, runs one direction and emits the run artifacts.
//!
//! ## How To Use
//! - From a CI job: `docsync forward --config sync.yaml` or
//!   `docsync backward --config sync.yaml`, see `--help`.
//! - Programmatically: call [`run`] with a constructed [`Cli`].
//!
//! Credentials are checked before anything else so a misconfigured job
//! fails before any file is touched.
use crate::github::{GitHubClient, DEFAULT_API_URL};
use crate::load_config::{load_config, Credentials, RunConfig};
use crate::output::{append_step_outputs, write_summary_json, write_synced_files, GITHUB_OUTPUT};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use docsync_core::cache::ClassificationCache;
use docsync_core::changes::{git_changed_files, parse_file_list, read_change_list};
use docsync_core::generation::{AnthropicConfig, AnthropicTransport, GenerationClient};
use docsync_core::mapping::MappingTable;
use docsync_core::report::SyncReport;
use docsync_core::synchronise::{BackwardSync, ForwardSync};
use std::path::{Path, PathBuf};

/// CLI for docsync: keep public, docs and private documentation repositories in sync.
#[derive(Parser)]
#[clap(
    name = "docsync",
    version,
    about = "Synchronise documentation between a public repo, a GitBook docs repo and private repos"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert changed public Markdown files into the docs repo checkout
    Forward {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Newline-separated list of changed public-repo paths
        #[clap(long, env = "CHANGED_FILES_PATH", default_value = "changed_source_files.txt")]
        changed_files: PathBuf,
        /// Report what would change without writing anything
        #[clap(long, env = "DRY_RUN")]
        dry_run: bool,
        /// Write a JSON run summary to this path
        #[clap(long)]
        summary_json: Option<PathBuf>,
    },
    /// Propose docs-repo changes to the private repos as pull requests
    Backward {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Base commit for change discovery in the docs checkout
        #[clap(long, env = "BASE_SHA", default_value = "HEAD~1")]
        base: String,
        /// Head commit for change discovery in the docs checkout
        #[clap(long, env = "HEAD_SHA", default_value = "HEAD")]
        head: String,
        /// Comma-separated docs paths; skips git change discovery
        #[clap(long, env = "MANUAL_FILES")]
        files: Option<String>,
        /// Report what would change without opening pull requests
        #[clap(long, env = "DRY_RUN")]
        dry_run: bool,
        /// Write a JSON run summary to this path
        #[clap(long)]
        summary_json: Option<PathBuf>,
        /// GitHub REST API root
        #[clap(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
        github_api_url: String,
    },
}

/// Async CLI entrypoint for integration tests and main().
///
/// Returns the run report; the caller maps [`SyncReport::has_failures`] to
/// the process exit code.
pub async fn run(cli: Cli) -> Result<SyncReport> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Forward {
            config,
            changed_files,
            dry_run,
            summary_json,
        } => {
            let credentials = Credentials::from_env(false)?;
            let config = load_config(config)?;
            tracing::info!(command = "forward", dry_run, "Starting forward sync");

            let table = load_table(&config)?;
            let mut cache = load_cache(&config)?;
            let changed = read_change_list(&changed_files)
                .with_context(|| format!("Failed to read change list {changed_files:?}"))?;
            let stages = config.to_stages();
            let generator = generator(&credentials)?;

            let sync = ForwardSync {
                table: &table,
                stages: &stages,
                generator: &generator,
                public_repo: config.public_repo_path.clone(),
                docs_repo: config.docs_repo_path.clone(),
                dry_run,
            };
            let report = sync.run(&changed, &mut cache).await;

            if dry_run {
                tracing::info!("Dry run, classification cache left untouched");
            } else {
                cache
                    .persist(&config.classification_cache)
                    .context("Failed to persist classification cache")?;
            }
            if let Some(path) = &config.synced_files_path {
                write_synced_files(path, &report)?;
            }
            finish(&report, summary_json.as_deref())?;
            Ok(report)
        }
        Commands::Backward {
            config,
            base,
            head,
            files,
            dry_run,
            summary_json,
            github_api_url,
        } => {
            let credentials = Credentials::from_env(true)?;
            let token = credentials
                .github_token
                .clone()
                .context("GITHUB_TOKEN environment variable is not set")?;
            let config = load_config(config)?;
            tracing::info!(command = "backward", dry_run, "Starting backward sync");

            let table = load_table(&config)?;
            let cache = load_cache(&config)?;
            let changed = match files.as_deref().map(parse_file_list) {
                Some(list) if !list.is_empty() => {
                    tracing::info!(count = list.len(), "Using explicit file list");
                    list
                }
                _ => git_changed_files(&config.docs_repo_path, &base, &head, config.docs_path_prefix())
                    .context("Failed to discover changed docs files")?,
            };
            let stages = config.to_stages();
            let generator = generator(&credentials)?;
            let host = GitHubClient::with_api_url(token, &github_api_url)?;

            let sync = BackwardSync {
                table: &table,
                stages: &stages,
                generator: &generator,
                host: &host,
                docs_repo: config.docs_repo_path.clone(),
                dry_run,
                date: Utc::now().date_naive(),
            };
            let report = sync.run(&changed, &cache).await;
            finish(&report, summary_json.as_deref())?;
            Ok(report)
        }
    }
}

fn load_table(config: &RunConfig) -> Result<MappingTable> {
    MappingTable::load(&config.mapping_table)
        .with_context(|| format!("Failed to load mapping table {:?}", config.mapping_table))
}

fn load_cache(config: &RunConfig) -> Result<ClassificationCache> {
    ClassificationCache::load(&config.classification_cache)
        .with_context(|| format!("Failed to load classification cache {:?}", config.classification_cache))
}

fn generator(credentials: &Credentials) -> Result<GenerationClient<AnthropicTransport>> {
    let transport = AnthropicTransport::new(AnthropicConfig::new(credentials.anthropic_api_key.clone()))?;
    Ok(GenerationClient::new(transport))
}

fn finish(report: &SyncReport, summary_json: Option<&Path>) -> Result<()> {
    println!("{}", report.render());
    if let Some(path) = std::env::var_os(GITHUB_OUTPUT).filter(|p| !p.is_empty()) {
        append_step_outputs(Path::new(&path), report)?;
    }
    if let Some(path) = summary_json {
        write_summary_json(path, report)?;
    }
    tracing::info!(summary = ?report.summary(), "Run complete");
    Ok(())
}
