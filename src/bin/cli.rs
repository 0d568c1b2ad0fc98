//! Notice watcher CLI
//!
//! Local execution entry point. Scheduling is left to cron or CI.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use notice_watch::{
    error::Result,
    models::Config,
    pipeline,
    storage::{LocalStorage, SeenStorage},
};

/// notice-watch - forwards new notices to Telegram
#[derive(Parser, Debug)]
#[command(
    name = "notice-watch",
    version,
    about = "Municipal notice board watcher"
)]
struct Cli {
    /// Path to storage directory holding config and state files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check all sites once and send new notices
    Run,

    /// Validate configuration files
    Validate,

    /// Show what the dedup store currently remembers
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.storage_dir.join("config.toml"));
    let mut config = Config::load_or_default(&config_path);
    config.apply_env();

    let storage = LocalStorage::new(&cli.storage_dir, config.store.seen_file.clone());

    match cli.command {
        Command::Run => {
            config.validate()?;
            if let Err(e) = config.validate_credentials() {
                log::error!("{}", e);
                log::error!("Create a bot via @BotFather, then export BOT_TOKEN and CHAT_ID.");
                return Err(e);
            }

            let summary = pipeline::run_watch(Arc::new(config), &storage).await?;
            for report in &summary.sites {
                match &report.error {
                    Some(error) => log::info!("    {}: failed ({})", report.site, error),
                    None => log::info!(
                        "    {}: {} links, {} new, {} sent",
                        report.site,
                        report.discovered,
                        report.new,
                        report.processed
                    ),
                }
            }
            println!("{}", summary.total_new);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({} sites)", config.sites.len());
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            let seen = storage
                .load_seen(config.store.max_entries_per_site)
                .await?;

            if seen.as_map().is_empty() {
                log::info!("No seen notices recorded yet.");
            }
            for (site, entries) in seen.as_map() {
                log::info!("    {}: {} identifiers", site, entries.len());
            }
        }
    }

    Ok(())
}
