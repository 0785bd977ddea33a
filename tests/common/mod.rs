//! Shared fixtures for integration tests: an in-memory ledger and sale data

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use candy_mint::candy_machine::anchor_discriminator;
use candy_mint::catalog::{CollectionCatalog, CollectionDisplay};
use candy_mint::ledger::{LedgerClient, LedgerError};
use candy_mint::metrics::Metrics;
use candy_mint::sale_state::{SaleStateReader, SaleTarget};
use candy_mint::ProgramIds;

pub const UUID: &str = "2DEZfF";

/// Ledger double with scripted responses and call counters
#[derive(Default)]
pub struct MockLedger {
    pub accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    pub balances: Mutex<HashMap<Pubkey, u64>>,
    pub balance_error: Mutex<Option<LedgerError>>,
    pub send_error: Mutex<Option<LedgerError>>,
    pub account_delay: Mutex<Duration>,
    pub send_delay: Mutex<Duration>,
    pub account_reads: AtomicUsize,
    pub balance_reads: AtomicUsize,
    pub sends: AtomicUsize,
    pub sent: Mutex<Vec<Transaction>>,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().insert(address, data);
    }

    pub fn set_balance(&self, owner: Pubkey, lamports: u64) {
        self.balances.lock().insert(owner, lamports);
    }

    pub fn fail_sends_with(&self, error: LedgerError) {
        *self.send_error.lock() = Some(error);
    }

    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, LedgerError> {
        self.balance_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.balance_error.lock().clone() {
            return Err(err);
        }
        Ok(self.balances.lock().get(owner).copied().unwrap_or(0))
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Vec<u8>, LedgerError> {
        self.account_reads.fetch_add(1, Ordering::SeqCst);
        // Read before sleeping so a delayed response carries the old data
        let data = self.accounts.lock().get(address).cloned();
        let delay = *self.account_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        data.ok_or_else(|| LedgerError::AccountNotFound { account: address.to_string() })
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, LedgerError> {
        Ok((data_len as u64 + 128) * 6_960)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, LedgerError> {
        Ok(Hash::new_unique())
    }

    async fn send_and_confirm_transaction(
        &self,
        tx: &Transaction,
    ) -> Result<Signature, LedgerError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        let delay = *self.send_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.send_error.lock().clone() {
            return Err(err);
        }
        self.sent.lock().push(tx.clone());
        Ok(tx.signatures.first().copied().unwrap_or_default())
    }

    fn endpoint(&self) -> &str {
        "mock://ledger"
    }
}

/// Sale account bytes as the program stores them
pub fn encode_candy_machine(
    config: &Pubkey,
    treasury: &Pubkey,
    items_available: u64,
    items_redeemed: u64,
    go_live_date: Option<i64>,
) -> Vec<u8> {
    let mut out = anchor_discriminator("account", "CandyMachine").to_vec();
    out.extend_from_slice(Pubkey::new_unique().as_ref());
    out.extend_from_slice(treasury.as_ref());
    out.push(0);
    out.extend_from_slice(config.as_ref());
    out.extend_from_slice(&(UUID.len() as u32).to_le_bytes());
    out.extend_from_slice(UUID.as_bytes());
    out.extend_from_slice(&500_000_000u64.to_le_bytes());
    out.extend_from_slice(&items_available.to_le_bytes());
    match go_live_date {
        Some(ts) => {
            out.push(1);
            out.extend_from_slice(&ts.to_le_bytes());
        }
        None => out.push(0),
    }
    out.extend_from_slice(&items_redeemed.to_le_bytes());
    out.push(255);
    // accounts are allocated with room to spare
    out.extend_from_slice(&[0u8; 32]);
    out
}

/// One collection id with its sale account on a mock ledger
pub struct SaleFixture {
    pub ledger: Arc<MockLedger>,
    pub programs: ProgramIds,
    pub config: Pubkey,
    pub treasury: Pubkey,
    pub metrics: Arc<Metrics>,
}

impl SaleFixture {
    pub fn new(items_available: u64, items_redeemed: u64) -> Self {
        let fixture = Self {
            ledger: MockLedger::new(),
            programs: ProgramIds::default(),
            config: Pubkey::new_unique(),
            treasury: Pubkey::new_unique(),
            metrics: Metrics::shared().unwrap(),
        };
        fixture.set_counts(items_available, items_redeemed);
        fixture
    }

    pub fn candy_machine(&self) -> Pubkey {
        self.programs.candy_machine_address(&self.config, UUID).unwrap().0
    }

    pub fn set_counts(&self, items_available: u64, items_redeemed: u64) {
        self.ledger.set_account(
            self.candy_machine(),
            encode_candy_machine(
                &self.config,
                &self.treasury,
                items_available,
                items_redeemed,
                Some(1_633_000_000),
            ),
        );
    }

    pub fn target(&self) -> SaleTarget {
        SaleTarget {
            config: self.config,
            uuid: UUID.to_string(),
            programs: self.programs,
        }
    }

    pub fn reader(&self) -> SaleStateReader {
        SaleStateReader::new(
            self.ledger.clone() as Arc<dyn LedgerClient>,
            self.target(),
            Arc::clone(&self.metrics),
        )
    }

    pub fn catalog(&self, start_date: &str) -> CollectionCatalog {
        let json = format!(
            r#"{{
                "{}": {{
                    "name": "Lunar Moths",
                    "uuid": "{}",
                    "startDate": "{}",
                    "price": "0.5",
                    "total": 100,
                    "mainImage": "https://example.org/moth.png",
                    "description": "Nocturnal pixels"
                }}
            }}"#,
            self.config, UUID, start_date
        );
        CollectionCatalog::from_json(&json).unwrap()
    }

    pub fn display(&self) -> CollectionDisplay {
        CollectionDisplay::resolve(&self.catalog("2021-10-01T18:00:00Z"), &self.config.to_string())
    }
}
