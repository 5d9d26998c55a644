//! shelfcheck - shelf inventory from the command line
//!
//! Each invocation restores the persisted session (if any), applies one
//! command and exits. Session state lives under the root folder, so a
//! sequence of invocations behaves like one long scanning pass.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shelfcheck_common::config::{
    load_or_default, LoggingConfig, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use shelfcheck_common::models::{LibraryItem, SessionConfig};
use shelfcheck_common::notify::TracingNotifier;
use shelfcheck_session::client::{HttpItemResolver, HttpSessionStarter};
use shelfcheck_session::export::CsvExport;
use shelfcheck_session::{
    filters, ResolutionOutcome, RestoreOutcome, SessionController, SessionStore,
};

/// Command-line arguments for shelfcheck
#[derive(Parser, Debug)]
#[command(name = "shelfcheck")]
#[command(about = "Shelf inventory session engine")]
#[command(version)]
struct Args {
    /// Root folder holding the session store and exports
    #[arg(short, long, env = "SHELFCHECK_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Config file (shelfcheck.toml)
    #[arg(short, long, env = "SHELFCHECK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a session from a JSON start-form file
    Start { config_file: PathBuf },
    /// Record scans from a JSON file holding one item or an array of items
    Scan { item_file: PathBuf },
    /// Confirm (or dismiss) the pending resolution for a barcode
    Resolve {
        barcode: String,
        #[arg(long)]
        dismiss: bool,
    },
    /// Flag barcodes as confirmed absent
    MarkMissing {
        #[arg(required = true)]
        barcodes: Vec<String>,
    },
    /// List expected items not yet scanned
    Missing,
    /// Show the session filters and progress
    Status,
    /// Write the reconciliation report
    Export {
        #[arg(long)]
        missing_only: bool,
        /// Output directory (default: <root>/exports)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write the report and end the session
    End {
        #[arg(long)]
        missing_only: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "shelfcheck={0},shelfcheck_session={0},shelfcheck_common={0}",
            logging.level
        ))
    });

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

async fn build_controller(config: &TomlConfig, root: &RootFolderInitializer) -> Result<SessionController> {
    let store = SessionStore::open(root, &config.storage)
        .await
        .context("Failed to open session store")?;
    let starter = HttpSessionStarter::new(config.server.clone())
        .context("Failed to build start-session client")?;
    let resolver = HttpItemResolver::new(config.server.clone())
        .context("Failed to build item resolver client")?;

    Ok(SessionController::new(
        Arc::new(store),
        Arc::new(starter),
        Arc::new(resolver),
        Arc::new(TracingNotifier),
    )
    .with_catalog_base(config.server.catalog_base()))
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_report(export: &CsvExport, out: Option<PathBuf>, root: &RootFolderInitializer) -> Result<()> {
    let dir = out.unwrap_or_else(|| root.export_dir());
    let path = export
        .write_to_dir(&dir)
        .with_context(|| format!("Failed to write report into {}", dir.display()))?;
    println!("{} ({} rows)", path.display(), export.row_count);
    Ok(())
}

fn print_item_line(item: &LibraryItem) {
    println!(
        "{}\t{}\t{}",
        item.barcode,
        item.call_number.as_deref().unwrap_or("N/A"),
        item.title.as_deref().unwrap_or("N/A")
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_or_default(args.config.as_deref());
    init_tracing(&config.logging)?;

    let root_folder = RootFolderResolver::new("shelfcheck")
        .with_cli_arg(args.root_folder.clone())
        .with_config(config.clone())
        .resolve();
    let root = RootFolderInitializer::new(root_folder);
    info!(root = %root.root().display(), version = env!("CARGO_PKG_VERSION"), "Starting shelfcheck");

    let mut controller = build_controller(&config, &root).await?;
    let restored = match controller.restore().await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "Discarded unreadable session");
            RestoreOutcome::NoSession
        }
    };

    if let Command::Start { config_file } = &args.command {
        if restored != RestoreOutcome::NoSession {
            bail!("A session is already active; end it before starting a new one");
        }
        let session_config: SessionConfig = serde_json::from_value(read_json(config_file)?)
            .with_context(|| format!("Invalid session config in {}", config_file.display()))?;
        controller
            .initiate(session_config)
            .await
            .context("Failed to start inventory session")?;
        return Ok(());
    }

    if restored == RestoreOutcome::NoSession {
        bail!("No active session; run `shelfcheck start <config.json>` first");
    }

    match args.command {
        Command::Start { .. } => {}
        Command::Scan { item_file } => {
            let raw = read_json(&item_file)?;
            let records = match raw {
                Value::Array(records) => records,
                other => vec![other],
            };
            for record in &records {
                let item = LibraryItem::from_json(record)
                    .with_context(|| format!("Invalid item record in {}", item_file.display()))?;
                let outcome = controller.record_scan(item).await.context("Failed to record scan")?;

                let mut flags = Vec::new();
                if outcome.item.wrong_place {
                    flags.push("wrong place".to_string());
                }
                if outcome.item.out_of_order {
                    flags.push("out of order".to_string());
                }
                if let Some(invalid) = &outcome.item.invalid_status {
                    flags.push(format!("{}={}", invalid.key, invalid.value));
                }
                flags.extend(outcome.issues.iter().map(|issue| issue.message.clone()));
                println!("{}\t{}", outcome.item.barcode(), flags.join("; "));

                if let Some(request) = outcome.resolution_request {
                    println!(
                        "{}\tneeds {} resolution (shelfcheck resolve {})",
                        request.barcode,
                        request.modal.as_str(),
                        request.barcode
                    );
                }
            }
        }
        Command::Resolve { barcode, dismiss } => {
            if dismiss {
                controller
                    .finish_resolution(&barcode, ResolutionOutcome::Dismissed)
                    .await
                    .context("Failed to dismiss resolution")?;
            } else {
                controller
                    .confirm_resolution(&barcode)
                    .await
                    .context("Failed to resolve item")?;
            }
        }
        Command::MarkMissing { barcodes } => {
            let added = controller
                .mark_many_missing(barcodes.as_slice())
                .await
                .context("Failed to mark items missing")?;
            println!("{} of {} barcodes newly marked missing", added, barcodes.len());
        }
        Command::Missing => {
            let missing = controller.missing_items();
            for item in &missing {
                print_item_line(item);
            }
            println!("{} items missing", missing.len());
        }
        Command::Status => {
            if let Some(session) = controller.session() {
                for (label, value) in filters::summary(&session.config) {
                    println!("{:<20}{}", label, value);
                }
                println!("{:<20}{}", "Active filters", filters::active_filter_count(&session.config));
                println!("{:<20}{}", "Expected", session.expected().len());
            }
            println!("{:<20}{}", "Scanned", controller.items().len());
            println!("{:<20}{}", "Marked missing", controller.marked_missing().len());
            println!("{:<20}{}", "Missing", controller.missing_count());
        }
        Command::Export { missing_only, out } => {
            let export = controller.export(missing_only).context("Failed to build report")?;
            write_report(&export, out, &root)?;
        }
        Command::End { missing_only, out } => {
            let export = controller.export(missing_only).context("Failed to build report")?;
            write_report(&export, out, &root)?;
            controller
                .complete(|| info!("Scan form cleared"))
                .await
                .context("Failed to end session")?;
        }
    }

    Ok(())
}
