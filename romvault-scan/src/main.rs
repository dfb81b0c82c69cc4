//! romvault-scan - command-line front end of the scan engine
//!
//! Resolves configuration, opens the catalog database, runs one scan and
//! prints the summary. Ctrl+C requests a cooperative stop.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use romvault_common::config::{resolve_database_path, resolve_library_root, TomlConfig};
use romvault_common::events::{EventBus, ScanEvent};
use romvault_common::models::{ProviderId, ScanType};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use romvault_scan::catalog::{Catalog, SqliteCatalog};
use romvault_scan::discovery::Discoverer;
use romvault_scan::{ProviderRegistry, ScanController, ScanOrchestrator, ScanRequest, ScanSettings};

/// Command-line arguments for romvault-scan
#[derive(Parser, Debug)]
#[command(name = "romvault-scan")]
#[command(about = "Scan a ROM library and reconcile metadata")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "ROMVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Library root containing the platform folders
    #[arg(short, long)]
    library: Option<PathBuf>,

    /// Catalog database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scan
    Scan {
        /// new_platforms, quick, unidentified, partial, complete or hashes
        #[arg(short = 't', long = "type", default_value = "quick", value_parser = parse_scan_type)]
        scan_type: ScanType,

        /// Restrict to platform folders, slugs or ids (repeatable)
        #[arg(short, long = "platform")]
        platforms: Vec<String>,

        /// Restrict to providers (repeatable)
        #[arg(long = "provider", value_parser = parse_provider)]
        providers: Vec<ProviderId>,
    },

    /// List platform folders and how they resolve
    Platforms,
}

fn parse_scan_type(value: &str) -> std::result::Result<ScanType, String> {
    value.parse()
}

fn parse_provider(value: &str) -> std::result::Result<ProviderId, String> {
    value.parse()
}

/// Tracing filter: `RUST_LOG` > `[logging] level` > info
fn init_tracing(config: &TomlConfig) {
    let fallback = config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| "romvault_scan=info,romvault_common=info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load_resolved(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config);

    let library_root = resolve_library_root(args.library.as_deref(), &config);
    let settings = ScanSettings::resolve(library_root, &config).context("Invalid scan settings")?;
    info!("Library root: {}", settings.library_root.display());

    match args.command {
        Command::Platforms => list_platforms(&settings),
        Command::Scan {
            scan_type,
            platforms,
            providers,
        } => {
            let db_path = resolve_database_path(args.database.as_deref(), &config);
            info!("Database: {}", db_path.display());
            let catalog = SqliteCatalog::open(&db_path)
                .await
                .context("Failed to open catalog database")?;

            let registry = ProviderRegistry::from_config(&config, &settings);
            info!(providers = ?registry.enabled(), "Metadata providers ready");

            let request = ScanRequest::new(scan_type)
                .platforms(platforms)
                .providers(providers);
            run_scan(settings, Arc::new(catalog), registry, request).await
        }
    }
}

fn list_platforms(settings: &ScanSettings) -> Result<()> {
    let discoverer = Discoverer::new(settings).context("Cannot read library root")?;
    println!("layout: {:?}", discoverer.layout());
    for fs_slug in discoverer.platform_folders()? {
        match discoverer.resolve(&fs_slug) {
            Some(info) => println!("{:<24} {:<16} {}", fs_slug, info.slug, info.name),
            None => println!("{:<24} {:<16} (unrecognized)", fs_slug, "-"),
        }
    }
    Ok(())
}

async fn run_scan(
    settings: ScanSettings,
    catalog: Arc<dyn Catalog>,
    registry: ProviderRegistry,
    request: ScanRequest,
) -> Result<()> {
    let bus = EventBus::new(1000);
    let mut events = bus.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ScanEvent::PlatformCompleted { platform, stats, .. } => {
                    println!(
                        "{}: {} scanned, {} added, {} identified",
                        platform, stats.roms_scanned, stats.roms_added, stats.roms_identified
                    );
                }
                ScanEvent::ScanDone { .. } => break,
                _ => {}
            }
        }
    });

    let orchestrator = ScanOrchestrator::new(settings, catalog, registry, Arc::new(bus));
    let controller = Arc::new(ScanController::new(orchestrator));
    let run_id = controller.start(request).await?;
    info!(run_id = %run_id, "Scan running, press Ctrl+C to stop");

    let stopper = Arc::clone(&controller);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping scan");
            stopper.stop().await;
        }
    });

    let summary = controller
        .wait()
        .await?
        .context("Scan ended without a summary")?;
    let _ = printer.await;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if let Some(reason) = &summary.failure {
        anyhow::bail!("Scan failed: {}", reason);
    }
    Ok(())
}
