//! proxy-sync command line.
//!
//! One-shot commands (`apply`, `render`, `validate`, `status`, `current`,
//! `import`, `history`) and the long-running `watch`, which re-applies the
//! desired state whenever the records file changes.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;

use proxy_sync::client::AdminClient;
use proxy_sync::config::{load_config, SyncConfig};
use proxy_sync::import::{
    detect_conflicts, into_records, CaddyfileAdapter, Importer, Resolution,
};
use proxy_sync::lifecycle::{shutdown_on_signal, Shutdown};
use proxy_sync::observability::{init_logging, metrics};
use proxy_sync::records::{JsonFileStore, RecordStore, RecordsWatcher};
use proxy_sync::sync::SyncManager;
use proxy_sync::validate::validate_value;

/// Quiet period after a change before re-applying; saves arrive in bursts.
const WATCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Parser)]
#[command(name = "proxy-sync")]
#[command(
    about = "Compile routing records into proxy configuration and keep the proxy in sync",
    long_about = None
)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the admin API URL.
    #[arg(short, long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile, validate, snapshot and push the desired state
    Apply,
    /// Print the compiled document without pushing it
    Render,
    /// Validate a JSON configuration document
    Validate {
        file: PathBuf,
    },
    /// Check that the admin API is reachable
    Status,
    /// Print the configuration the proxy is running
    Current,
    /// Import hosts from a legacy configuration file
    Import {
        file: PathBuf,

        /// Write the imported hosts to the record store
        #[arg(long)]
        commit: bool,

        /// Domain to leave out (repeatable)
        #[arg(long)]
        skip: Vec<String>,

        /// Domain to import under "<domain>-imported" (repeatable)
        #[arg(long)]
        rename: Vec<String>,
    },
    /// Show recent apply attempts
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Re-apply whenever the records file changes
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        config.admin.url = url;
    }

    init_logging(&config.observability.log_level, config.observability.log_format);

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let store = Arc::new(JsonFileStore::new(
        &config.store.records_path,
        &config.store.audit_path,
    ));

    match cli.command {
        Commands::Apply => {
            let manager = build_manager(&config, store)?;
            let report = manager.apply_config().await?;
            println!(
                "Applied snapshot {} ({} routes, sha256 {}, {} old snapshots pruned)",
                report.snapshot_seq, report.routes, report.config_hash, report.pruned
            );
        }
        Commands::Render => {
            let manager = build_manager(&config, store)?;
            let document = manager.render()?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Commands::Validate { file } => {
            let value: Value = serde_json::from_slice(&fs::read(&file)?)?;
            validate_value(&value)?;
            println!("{}: valid", file.display());
        }
        Commands::Status => {
            let manager = build_manager(&config, store)?;
            manager.ping().await?;
            println!("Admin API at {} is reachable", config.admin.url);
        }
        Commands::Current => {
            let manager = build_manager(&config, store)?;
            let document = manager.current_config().await?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Commands::Import {
            file,
            commit,
            skip,
            rename,
        } => {
            run_import(&config, &store, &file, commit, skip, rename)?;
        }
        Commands::History { limit } => {
            let log = store.audit_log()?;
            for record in log.iter().rev().take(limit) {
                let outcome = if record.success { "ok" } else { "FAILED" };
                println!(
                    "{}  {:<6}  {}  {}",
                    record.applied_at.to_rfc3339(),
                    outcome,
                    short_hash(&record.config_hash),
                    record.error.as_deref().unwrap_or("")
                );
            }
        }
        Commands::Watch => {
            let manager = build_manager(&config, store)?;
            run_watch(manager, &config.store.records_path).await?;
        }
    }

    Ok(())
}

fn build_manager(
    config: &SyncConfig,
    store: Arc<JsonFileStore>,
) -> Result<SyncManager, Box<dyn std::error::Error>> {
    let client = AdminClient::new(
        &config.admin.url,
        Duration::from_secs(config.admin.timeout_secs),
    )?;

    Ok(SyncManager::new(client, store, &config.storage.config_dir)
        .with_retention(config.storage.snapshot_keep)
        .with_rollback_target(config.storage.rollback_target))
}

fn run_import(
    config: &SyncConfig,
    store: &JsonFileStore,
    file: &Path,
    commit: bool,
    skip: Vec<String>,
    rename: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let importer = Importer::new(CaddyfileAdapter::new(&config.import.adapter_binary))
        .with_backup_dir(&config.import.backup_dir);
    importer.check_available()?;

    let mut result = importer.import_file(file)?;
    detect_conflicts(&mut result, &store.list_records()?);

    for host in &result.hosts {
        println!(
            "{:<40} → {}://{}:{}{}",
            host.domain_names,
            host.forward_scheme,
            host.forward_host,
            host.forward_port,
            if host.is_actionable() { "" } else { "  (no target, will be dropped)" }
        );
        for warning in &host.warnings {
            println!("    warning: {}", warning);
        }
    }
    for conflict in &result.conflicts {
        println!("conflict: {}", conflict);
    }

    if !commit {
        println!("Dry run; pass --commit to write {} hosts", result.hosts.len());
        return Ok(());
    }

    let resolutions: HashMap<String, Resolution> = skip
        .into_iter()
        .map(|d| (d, Resolution::Skip))
        .chain(rename.into_iter().map(|d| (d, Resolution::Rename)))
        .collect();

    let records = into_records(&result.hosts, &resolutions);
    let created = store.insert_records(records)?;
    println!("Imported {} hosts into {}", created, store.records_path().display());
    Ok(())
}

async fn run_watch(
    manager: SyncManager,
    records_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = Arc::new(Shutdown::new());
    let mut stop = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move { shutdown_on_signal(&trigger).await });

    let (watcher, mut changes) = RecordsWatcher::new(records_path);
    let _watcher = watcher.run()?;

    apply_once(&manager).await;

    loop {
        tokio::select! {
            _ = stop.recv() => break,
            tick = changes.recv() => {
                if tick.is_none() {
                    break;
                }
                tokio::time::sleep(WATCH_DEBOUNCE).await;
                while changes.try_recv().is_ok() {}
                apply_once(&manager).await;
            }
        }
    }

    tracing::info!("Watch stopped");
    Ok(())
}

async fn apply_once(manager: &SyncManager) {
    match manager.apply_config().await {
        Ok(report) => {
            tracing::info!(seq = report.snapshot_seq, routes = report.routes, "Proxy in sync")
        }
        Err(e) if e.is_unrecoverable() => tracing::error!(error = %e, "Proxy state unknown"),
        Err(e) => tracing::warn!(error = %e, state = %e.state(), "Apply failed"),
    }
}

/// Leading characters of a hash for one-line listings.
fn short_hash(hash: &str) -> String {
    hash.chars().take(12).collect()
}
