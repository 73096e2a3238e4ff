//! kbsync CLI - Load, extract, and restore connectivity knowledge

use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use kbsync::config::{self, SyncConfig};
use kbsync::storage::{KnowledgeStore, OpenMode, SourceStats};
use kbsync::sync::{self, LoadOptions, SyncEngine};
use kbsync::ui::{self, Icons, ProgressManager};
use kbsync::HttpRemote;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "kbsync")]
#[command(version)]
#[command(about = "Load, extract, and restore SCKAN NPO connectivity knowledge in a local knowledge store")]
#[command(long_about = r#"
Load, extract, and restore SCKAN NPO connectivity knowledge in a local knowledge store.

Example usage:
  kbsync --store-dir ./store load --save-json
  kbsync --store-dir ./store extract --source sckan-2024-03-04
  kbsync --store-dir ./store restore ./store/sckan-2024-03-04.json
  kbsync --store-dir ./store info
"#)]
struct Cli {
    /// Directory containing a knowledge store
    #[arg(long, alias = "store-directory", global = true)]
    store_dir: Option<PathBuf>,

    /// Name of knowledge store file [default: knowledgebase.db]
    #[arg(long, alias = "knowledge-store", global = true)]
    store_file: Option<String>,

    /// Configuration file [default: <STORE_DIR>/kbsync.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Suppress INFO log messages and progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load connectivity knowledge from SCKAN NPO into a local knowledge store
    Load {
        /// SCKAN release identifier; defaults to the latest available release
        #[arg(long = "version", alias = "sckan", value_name = "VERSION")]
        release: Option<String>,

        /// Also save the loaded knowledge as JSON in the store directory
        #[arg(long)]
        save_json: bool,

        /// Base URL of the remote knowledge service
        #[arg(long)]
        remote_url: Option<String>,
    },

    /// Save connectivity knowledge from a local store as JSON in the store directory
    Extract {
        /// Knowledge source to extract; defaults to the most recent source in the store
        #[arg(long)]
        source: Option<String>,
    },

    /// Restore connectivity knowledge to a local store from JSON
    Restore {
        /// File to load connectivity knowledge from
        #[arg(value_name = "JSON_FILE")]
        json_file: PathBuf,
    },

    /// List knowledge sources in a local store, most recent first
    Info,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    kbsync::output::init_quiet(cli.quiet);
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            ui::error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let Some(store_dir) = cli.store_dir else {
        Cli::command()
            .error(
                clap::error::ErrorKind::MissingRequiredArgument,
                "the following required arguments were not provided:\n  --store-dir <STORE_DIR>",
            )
            .exit();
    };

    let config = config::load_config(&store_dir, cli.config.as_deref())?;
    let store_path = config::store_path(&store_dir, &config.store_file(cli.store_file.as_deref()));
    tracing::debug!("Using knowledge store {}", store_path.display());

    match cli.command {
        Commands::Load { release, save_json, remote_url } => {
            run_load(&config, &store_dir, &store_path, release, save_json, remote_url.as_deref())
        }

        Commands::Extract { source } => {
            let mut store = KnowledgeStore::open(&store_path, OpenMode::ReadOnly)?;
            let report = SyncEngine::new(&mut store, &store_dir).extract(source.as_deref())?;
            ui::success(&format!(
                "Saved {} records for `{}` to {}",
                report.records,
                report.source,
                report.path.display()
            ));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Restore { json_file } => {
            let mut progress = ProgressManager::new("Reading snapshot");
            let (store, report) = sync::restore_file(&store_dir, &store_path, &json_file, &mut progress)?;

            ui::success(&format!(
                "Restored {} records for `{}` in {}",
                report.counts.records,
                report.source,
                progress.elapsed()
            ));
            print_summary(&store.source_stats(&report.source)?);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Info => {
            let mut store = KnowledgeStore::open(&store_path, OpenMode::ReadOnly)?;
            for source in SyncEngine::new(&mut store, &store_dir).info()? {
                println!("{}", source);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_load(
    config: &SyncConfig,
    store_dir: &Path,
    store_path: &Path,
    release: Option<String>,
    save_json: bool,
    remote_url: Option<&str>,
) -> anyhow::Result<ExitCode> {
    let Some(api_key) = config.credential() else {
        tracing::error!("Undefined {} -- cannot load SCKAN knowledge", config.credential_var());
        return Ok(ExitCode::FAILURE);
    };

    config::ensure_store_dir(store_dir)?;
    let mut store = KnowledgeStore::open(store_path, OpenMode::ReadWrite)?;
    let remote_url = config.remote_url(remote_url);
    ui::info("Remote", &remote_url);
    let mut remote = HttpRemote::new(remote_url, api_key)?;

    let options = LoadOptions { version: release, save_json };
    let mut progress = ProgressManager::new("Resolving knowledge source");
    let report = SyncEngine::new(&mut store, store_dir).load(&mut remote, &options, &mut progress)?;

    ui::success(&format!(
        "Loaded connectivity for {} paths for `{}` in {}",
        report.counts.records,
        report.source,
        progress.elapsed()
    ));
    if let Some(snapshot) = &report.snapshot {
        ui::success(&format!("Saved {} records to {}", snapshot.records, snapshot.path.display()));
    }
    print_summary(&store.source_stats(&report.source)?);
    Ok(ExitCode::SUCCESS)
}

fn print_summary(stats: &SourceStats) {
    tracing::debug!("{}", stats);
    ui::section(Icons::STATS, &format!("Knowledge source `{}`", stats.source));
    ui::summary_row("Records:", &stats.records.to_string());
    ui::summary_row("Publications:", &stats.publications.to_string());
    ui::summary_row("Connectivity nodes:", &stats.connectivity_nodes.to_string());
    ui::summary_row("Labels (all sources):", &stats.labels.to_string());
}
