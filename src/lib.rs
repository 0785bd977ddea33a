//! candy-mint - client for a Candy Machine v1 NFT sale
//!
//! This library exposes the sale reader, countdown, mint orchestration and
//! page model used by the `candy-mint` binary, and the seams
//! ([`ledger::LedgerClient`], [`wallet::WalletAdapter`]) used in tests.

pub mod addresses;
pub mod candy_machine;
pub mod catalog;
pub mod config;
pub mod countdown;
pub mod ledger;
pub mod metrics;
pub mod observability;
pub mod purchase;
pub mod sale_state;
pub mod structured_logging;
pub mod view;
pub mod wallet;

// Re-export commonly used types
pub use addresses::{MintAddresses, ProgramIds};
pub use catalog::{CollectionCatalog, CollectionDisplay};
pub use config::Config;
pub use countdown::{Countdown, GoLiveSource, SaleFlags, SoldOutPolicy};
pub use ledger::{LedgerClient, LedgerError, RpcLedger};
pub use purchase::{MintError, MintOrchestrator, MintReceipt};
pub use sale_state::{LiveSaleState, SaleStateReader, SaleTarget};
pub use view::{Alert, ButtonState, MintView, Severity, ViewModel};
pub use wallet::{KeypairWallet, WalletAdapter, WalletError};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
