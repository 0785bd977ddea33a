//! candy-mint
//!
//! Terminal client for a Candy Machine v1 sale.
//!
//! ## Commands
//!
//! - **show**: one-shot page render (details, button, countdown, counts)
//! - **watch**: live page with one-second countdown ticks and periodic refresh
//! - **mint**: connect the configured wallet and mint one item
//! - **metrics**: Prometheus text exposition of the client's series

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use candy_mint::catalog::{CollectionCatalog, CollectionDisplay};
use candy_mint::config::Config;
use candy_mint::ledger::{LedgerClient, RpcLedger};
use candy_mint::metrics::Metrics;
use candy_mint::purchase::MintOrchestrator;
use candy_mint::sale_state::{SaleStateReader, SaleTarget};
use candy_mint::view::{MintView, Severity};
use candy_mint::wallet::{KeypairWallet, WalletAdapter};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the mint page once
    Show {
        /// Collection id (sale config account address)
        id: String,

        /// Connect the configured wallet before rendering
        #[arg(long)]
        connect: bool,
    },

    /// Keep the mint page live until ctrl-c
    Watch {
        id: String,

        #[arg(long)]
        connect: bool,
    },

    /// Mint one item of the collection
    Mint { id: String },

    /// Print the metrics exposition
    Metrics,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;
    config.validate().context("Invalid configuration")?;

    match args.command {
        Command::Show { id, connect } => show(&config, &id, connect).await,
        Command::Watch { id, connect } => watch(&config, &id, connect).await,
        Command::Mint { id } => mint(&config, &id).await,
        Command::Metrics => {
            let metrics = Metrics::new()?;
            print!("{}", metrics.render()?);
            Ok(())
        }
    }
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "candy_mint=debug,info"
    } else {
        "candy_mint=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        let mut config = Config::default();
        dotenvy::dotenv().ok();
        config.apply_env();
        Ok(config)
    }
}

struct Session {
    view: MintView,
    wallet: Arc<KeypairWallet>,
    metrics: Arc<Metrics>,
}

fn build_session(config: &Config, id: &str) -> Result<Session> {
    let catalog = CollectionCatalog::from_file(&config.catalog.path)
        .with_context(|| format!("Failed to load catalog from {}", config.catalog.path))?;
    info!("📋 Loaded {} collections from {}", catalog.len(), config.catalog.path);

    let display = CollectionDisplay::resolve(&catalog, id);
    if !display.exists {
        let mut known: Vec<&str> = catalog.ids().collect();
        known.sort_unstable();
        warn!("Collection '{}' is not in the catalog (known: {})", id, known.join(", "));
    }
    let sale_config =
        Pubkey::from_str(id).with_context(|| format!("Collection id is not an address: {}", id))?;

    let programs = config.program_ids()?;
    let metrics = Metrics::shared()?;
    let ledger: Arc<dyn LedgerClient> = Arc::new(RpcLedger::new(
        &config.rpc.url,
        config.rpc_timeout(),
        config.commitment()?,
    ));
    info!("🌐 RPC endpoint: {}", ledger.endpoint());

    let wallet = Arc::new(KeypairWallet::new(config.keypair_path()));
    let reader = SaleStateReader::new(
        Arc::clone(&ledger),
        SaleTarget {
            config: sale_config,
            uuid: display.uuid.clone(),
            programs,
        },
        Arc::clone(&metrics),
    );
    let orchestrator = Arc::new(MintOrchestrator::new(
        ledger,
        programs,
        config.transaction.clone(),
        Arc::clone(&metrics),
    ));

    let view = MintView::mount(
        &catalog,
        id,
        config.sale.clone(),
        reader,
        orchestrator,
        wallet.clone() as Arc<dyn WalletAdapter>,
        Utc::now(),
    );
    Ok(Session { view, wallet, metrics })
}

async fn connect(session: &Session) -> Result<()> {
    session.view.connect().await.context("Failed to connect wallet")?;
    if let Some(pubkey) = session.wallet.pubkey() {
        info!("💼 Wallet address: {}", pubkey);
    }
    Ok(())
}

async fn show(config: &Config, id: &str, with_wallet: bool) -> Result<()> {
    let session = build_session(config, id)?;
    if with_wallet {
        connect(&session).await?;
    }
    session.view.reader().wait().await;
    if let Some(error) = session.view.reader().snapshot().last_error {
        warn!("Partial state: {}", error);
    }
    println!("{}", session.view.render(Utc::now()));
    Ok(())
}

async fn watch(config: &Config, id: &str, with_wallet: bool) -> Result<()> {
    let session = build_session(config, id)?;
    if with_wallet {
        connect(&session).await?;
    }

    let mut tick = tokio::time::interval(tokio::time::Duration::from_secs(1));
    let mut refresh = tokio::time::interval(config.refresh_interval());
    // interval fires immediately; mount already refreshed
    refresh.tick().await;
    let mut last_frame = String::new();

    info!("🎬 Watching '{}' (refresh every {:?})", id, config.refresh_interval());
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let now = Utc::now();
                if session.view.tick(now) {
                    info!("🚀 Sale is live");
                }
                let frame = session.view.render(now).to_string();
                if frame != last_frame {
                    println!("{}\n", frame);
                    last_frame = frame;
                }
            }

            _ = refresh.tick() => {
                session.view.reader().refresh(session.wallet.pubkey());
            }

            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Received shutdown signal");
                break;
            }
        }
    }

    info!(
        "📊 Refreshes: {}, stale responses discarded: {}, fetch failures: {}",
        session.metrics.state_refreshes.get(),
        session.metrics.stale_responses_discarded.get(),
        session.metrics.fetch_failures.get()
    );
    Ok(())
}

async fn mint(config: &Config, id: &str) -> Result<()> {
    let session = build_session(config, id)?;
    connect(&session).await?;
    session.view.reader().wait().await;

    let now = Utc::now();
    session.view.tick(now);
    println!("{}\n", session.view.render(now));

    let Some(alert) = session.view.click(now).await else {
        anyhow::bail!("Mint is not available: {}", session.view.render(now).button.label);
    };
    println!("{}", alert.message);
    if alert.severity == Severity::Error {
        anyhow::bail!("Mint failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["candy-mint", "-v", "show", "abc", "--connect"]).unwrap();
        assert!(args.verbose);
        assert_eq!(args.config, "config.toml");
        assert!(matches!(args.command, Command::Show { ref id, connect: true } if id == "abc"));

        let args =
            Args::try_parse_from(["candy-mint", "mint", "abc", "--config", "other.toml"]).unwrap();
        assert_eq!(args.config, "other.toml");
        assert!(matches!(args.command, Command::Mint { .. }));
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let config = load_config("/nonexistent/candy-mint.toml").unwrap();
        assert_eq!(config.sale.refresh_interval_secs, 15);
    }
}
