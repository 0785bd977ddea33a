//! Wallet connection and signing

use async_trait::async_trait;
use parking_lot::RwLock;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Wallet not connected")]
    NotConnected,

    #[error("Failed to read keypair file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// The wallet as the view sees it: connection state, identity, signing
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    fn is_connected(&self) -> bool;

    fn pubkey(&self) -> Option<Pubkey>;

    /// Establish the connection (prompting the user if needed)
    async fn connect(&self) -> Result<Pubkey, WalletError>;

    /// Add the wallet's signature; other signers may already have signed
    fn sign_transaction(&self, tx: &mut Transaction, blockhash: Hash) -> Result<(), WalletError>;
}

/// Wallet backed by a keypair file, loaded on connect
pub struct KeypairWallet {
    path: String,
    keypair: RwLock<Option<Arc<Keypair>>>,
}

impl KeypairWallet {
    /// Disconnected wallet that will load `path` on connect
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            keypair: RwLock::new(None),
        }
    }

    /// Already-connected wallet
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            path: String::new(),
            keypair: RwLock::new(Some(Arc::new(keypair))),
        }
    }

    pub fn disconnect(&self) {
        *self.keypair.write() = None;
    }
}

/// Parse a keypair file: 64 raw bytes or a JSON byte array
pub fn read_keypair_file(path: &str) -> Result<Keypair, WalletError> {
    let bytes = std::fs::read(path).map_err(|e| WalletError::Read {
        path: path.to_string(),
        message: e.to_string(),
    })?;

    let raw = if bytes.len() == 64 {
        bytes
    } else {
        serde_json::from_slice::<Vec<u8>>(&bytes)
            .map_err(|e| WalletError::InvalidKeypair(format!("not a JSON byte array: {}", e)))?
    };

    if raw.len() != 64 {
        return Err(WalletError::InvalidKeypair(format!(
            "expected 64 bytes, got {}",
            raw.len()
        )));
    }
    if raw.iter().all(|&b| b == 0) {
        return Err(WalletError::InvalidKeypair("all-zero key rejected".to_string()));
    }
    Keypair::try_from(raw.as_slice()).map_err(|e| WalletError::InvalidKeypair(e.to_string()))
}

#[async_trait]
impl WalletAdapter for KeypairWallet {
    fn is_connected(&self) -> bool {
        self.keypair.read().is_some()
    }

    fn pubkey(&self) -> Option<Pubkey> {
        self.keypair.read().as_ref().map(|kp| kp.pubkey())
    }

    async fn connect(&self) -> Result<Pubkey, WalletError> {
        if let Some(pubkey) = self.pubkey() {
            return Ok(pubkey);
        }
        let keypair = read_keypair_file(&self.path)?;
        let pubkey = keypair.pubkey();
        *self.keypair.write() = Some(Arc::new(keypair));
        info!(wallet = %pubkey, "Wallet connected");
        Ok(pubkey)
    }

    fn sign_transaction(&self, tx: &mut Transaction, blockhash: Hash) -> Result<(), WalletError> {
        let keypair = self.keypair.read().clone().ok_or(WalletError::NotConnected)?;
        tx.try_partial_sign(&[keypair.as_ref()], blockhash)
            .map_err(|e| WalletError::Signing(e.to_string()))
    }
}
