//! Shelfwatch CLI
//!
//! Local execution entry point. For AWS Lambda, use `shelfwatch-lambda`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shelfwatch::{
    config,
    error::Result,
    models::Config,
    pipeline::{self, CheckOptions},
    services::{LogNotifier, Notifier, StorefrontCrawler, notifier},
    storage::{self, SnapshotStore},
    utils::{http, log::header},
};

/// Shelfwatch - storefront listing watcher
#[derive(Parser, Debug)]
#[command(
    name = "shelfwatch",
    version,
    about = "Watches storefront collections and emails a digest of changes"
)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Use this local directory for storage instead of the configured backend
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one full check: fetch, diff, notify, persist
    Check {
        /// Print the digest instead of sending it and keep the stored snapshot
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch the current listing and print it as JSON
    Scrape,

    /// Validate the configuration
    Validate,

    /// Show current snapshot info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_config(cli: &Cli) -> Config {
    let mut config = Config::load_or_default(&cli.config);
    config::apply_env(&mut config);
    if let Some(dir) = &cli.storage_dir {
        config.storage.bucket = None;
        config.storage.local_dir = dir.display().to_string();
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Shelfwatch starting...");

    let config = load_config(&cli);
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Check { dry_run } => {
            header("Shelfwatch check");

            let storage = storage::open(&config.storage).await?;
            let client = http::create_async_client(&config.scraper)?;
            let crawler = StorefrontCrawler::with_client(config.scraper.clone(), client.clone())?;
            let (notifier, options): (Box<dyn Notifier>, _) = if dry_run {
                (Box::new(LogNotifier), CheckOptions::dry_run())
            } else {
                (
                    notifier::from_config(&config.notify.mail, client),
                    CheckOptions::default(),
                )
            };

            let report = pipeline::run_check_with(
                &config,
                &crawler,
                storage.as_ref(),
                notifier.as_ref(),
                options,
            )
            .await?;

            if dry_run {
                if let Some(digest) = &report.digest {
                    println!("{}", digest.text);
                }
            }
        }

        Command::Scrape => {
            let crawler = StorefrontCrawler::new(config.scraper.clone())?;
            let outcome = crawler.fetch_all().await;

            log::info!(
                "Fetched {} records ({}/{} pages failed, {}/{} detail pages failed)",
                outcome.records.len(),
                outcome.page_failures,
                outcome.page_total,
                outcome.detail_failures,
                outcome.detail_total
            );
            println!("{}", serde_json::to_string_pretty(&outcome.records)?);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            StorefrontCrawler::new(config.scraper.clone())?;
            log::info!(
                "✓ Config OK ({} collections, selectors compile)",
                config.scraper.collections.len()
            );

            log::info!("All validations passed!");
        }

        Command::Info => {
            let storage = storage::open(&config.storage).await?;
            let snapshot = SnapshotStore::new(storage.as_ref(), config.snapshot_key());

            log::info!("Run mode: {:?}", config.run_mode);
            log::info!("Snapshot: {}", snapshot.location());
            match snapshot.try_load().await {
                Ok(Some(records)) => log::info!("Records in snapshot: {}", records.len()),
                Ok(None) => log::info!("No snapshot found yet."),
                Err(e) => log::warn!("Snapshot unreadable: {}", e),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
