//! Configuration module for the candy-mint client
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and provides structured configuration types.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::str::FromStr;
use std::time::Duration;

use crate::addresses::ProgramIds;
use crate::countdown::{GoLiveSource, SoldOutPolicy};

/// Environment override for the RPC endpoint
pub const ENV_RPC_URL: &str = "CANDY_MINT_RPC_URL";

/// Environment override for the keypair path
pub const ENV_KEYPAIR: &str = "CANDY_MINT_KEYPAIR";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC connection configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Wallet configuration
    #[serde(default)]
    pub wallet: WalletConfig,

    /// On-chain program identifiers
    #[serde(default)]
    pub programs: ProgramsConfig,

    /// Static collection table
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Sale display behaviour
    #[serde(default)]
    pub sale: SaleConfig,

    /// Transaction building
    #[serde(default)]
    pub transaction: TransactionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Commitment level: processed, confirmed or finalized
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramsConfig {
    #[serde(default = "default_candy_machine_program")]
    pub candy_machine: String,

    #[serde(default = "default_token_metadata_program")]
    pub token_metadata: String,

    #[serde(default = "default_associated_token_program")]
    pub associated_token: String,

    #[serde(default = "default_token_program")]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to the JSON collection table
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleConfig {
    /// Whether "sold out" is derived from live counts
    #[serde(default)]
    pub sold_out: SoldOutPolicy,

    /// Where the countdown start time comes from
    #[serde(default)]
    pub go_live_source: GoLiveSource,

    /// Interval between state refreshes in `watch` mode
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Compute unit limit (0 = no compute budget instruction)
    #[serde(default)]
    pub compute_unit_limit: u32,

    /// Priority fee in micro-lamports per CU (0 = none)
    #[serde(default)]
    pub priority_fee_micro_lamports: u64,
}

// Default value functions
fn default_rpc_url() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_candy_machine_program() -> String { ProgramIds::default().candy_machine.to_string() }
fn default_token_metadata_program() -> String { ProgramIds::default().token_metadata.to_string() }
fn default_associated_token_program() -> String { ProgramIds::default().associated_token.to_string() }
fn default_token_program() -> String { ProgramIds::default().token.to_string() }
fn default_catalog_path() -> String { "candymachines.json".to_string() }
fn default_refresh_interval() -> u64 { 15 }

const MAX_COMPUTE_UNITS: u32 = 1_400_000;

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
            commitment: default_commitment(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self { keypair_path: default_keypair_path() }
    }
}

impl Default for ProgramsConfig {
    fn default() -> Self {
        Self {
            candy_machine: default_candy_machine_program(),
            token_metadata: default_token_metadata_program(),
            associated_token: default_associated_token_program(),
            token: default_token_program(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { path: default_catalog_path() }
    }
}

impl Default for SaleConfig {
    fn default() -> Self {
        Self {
            sold_out: SoldOutPolicy::default(),
            go_live_source: GoLiveSource::default(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self { compute_unit_limit: 0, priority_fee_micro_lamports: 0 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            wallet: WalletConfig::default(),
            programs: ProgramsConfig::default(),
            catalog: CatalogConfig::default(),
            sale: SaleConfig::default(),
            transaction: TransactionConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        Ok(config)
    }

    /// Load configuration with `.env` and environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env();
        Ok(config)
    }

    /// Apply `CANDY_MINT_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_RPC_URL) {
            self.rpc.url = url;
        }
        if let Ok(path) = std::env::var(ENV_KEYPAIR) {
            self.wallet.keypair_path = path;
        }
    }

    /// Reject program ids that do not parse and out-of-range CU limits
    pub fn validate(&self) -> anyhow::Result<()> {
        self.program_ids()?;
        self.commitment()?;
        if self.transaction.compute_unit_limit > MAX_COMPUTE_UNITS {
            bail!(
                "compute_unit_limit {} exceeds maximum {}",
                self.transaction.compute_unit_limit,
                MAX_COMPUTE_UNITS
            );
        }
        if self.sale.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be greater than zero");
        }
        Ok(())
    }

    /// Parse the configured program identifiers
    pub fn program_ids(&self) -> anyhow::Result<ProgramIds> {
        let parse = |name: &str, value: &str| {
            Pubkey::from_str(value).with_context(|| format!("Invalid {} program id: {}", name, value))
        };
        Ok(ProgramIds {
            candy_machine: parse("candy_machine", &self.programs.candy_machine)?,
            token_metadata: parse("token_metadata", &self.programs.token_metadata)?,
            associated_token: parse("associated_token", &self.programs.associated_token)?,
            token: parse("token", &self.programs.token)?,
        })
    }

    pub fn commitment(&self) -> anyhow::Result<CommitmentConfig> {
        CommitmentConfig::from_str(&self.rpc.commitment)
            .map_err(|_| anyhow::anyhow!("Invalid commitment level: {}", self.rpc.commitment))
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.sale.refresh_interval_secs)
    }

    /// Keypair path with a leading `~` expanded from `$HOME`
    pub fn keypair_path(&self) -> String {
        expand_home(&self.wallet.keypair_path)
    }
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path.to_string(),
    }
}
