//! Live sale state: redeemed/available counts and the viewer's balance
//!
//! Every refresh is tagged with a generation number. Starting a refresh
//! aborts the previous one's fetches, and any response that still arrives
//! with an older tag is dropped instead of overwriting newer state.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use solana_sdk::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::addresses::{AddressError, ProgramIds};
use crate::candy_machine::{CandyMachineAccount, DecodeError};
use crate::countdown::remaining_items;
use crate::ledger::{LedgerClient, LedgerError};
use crate::metrics::{Metrics, Timer};
use crate::structured_logging::MintLogger;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Which sale account to read
#[derive(Debug, Clone)]
pub struct SaleTarget {
    pub config: Pubkey,
    pub uuid: String,
    pub programs: ProgramIds,
}

impl SaleTarget {
    pub fn candy_machine(&self) -> Result<Pubkey, AddressError> {
        Ok(self.programs.candy_machine_address(&self.config, &self.uuid)?.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleCounts {
    pub items_available: u64,
    pub items_redeemed: u64,
    pub go_live: Option<DateTime<Utc>>,
}

impl SaleCounts {
    pub fn remaining(&self) -> i128 {
        remaining_items(self.items_available, self.items_redeemed)
    }
}

impl From<&CandyMachineAccount> for SaleCounts {
    fn from(account: &CandyMachineAccount) -> Self {
        Self {
            items_available: account.items_available,
            items_redeemed: account.items_redeemed,
            go_live: account.go_live(),
        }
    }
}

/// Snapshot of fetched state; each slot is replaced wholesale by its fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveSaleState {
    pub generation: u64,
    pub identity: Option<Pubkey>,
    pub counts: Option<SaleCounts>,
    pub balance_sol: Option<f64>,
    /// Most recent fetch failure of the current generation
    pub last_error: Option<String>,
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

pub async fn fetch_counts(
    ledger: &dyn LedgerClient,
    target: &SaleTarget,
) -> Result<SaleCounts, FetchError> {
    let data = ledger.get_account_data(&target.candy_machine()?).await?;
    let account = CandyMachineAccount::decode(&data)?;
    Ok(SaleCounts::from(&account))
}

pub async fn fetch_balance_sol(ledger: &dyn LedgerClient, owner: &Pubkey) -> Result<f64, FetchError> {
    Ok(lamports_to_sol(ledger.get_balance(owner).await?))
}

struct Shared {
    state: RwLock<LiveSaleState>,
    generation: AtomicU64,
    metrics: Arc<Metrics>,
}

impl Shared {
    fn apply<T>(
        &self,
        generation: u64,
        slot: &str,
        result: Result<T, FetchError>,
        store: impl FnOnce(&mut LiveSaleState, Option<T>),
    ) -> bool {
        let mut state = self.state.write();
        // refresh() bumps the generation under this same lock
        if state.generation != generation {
            self.metrics.stale_responses_discarded.inc();
            debug!(slot, generation, "Discarding stale response");
            return false;
        }
        match result {
            Ok(value) => store(&mut state, Some(value)),
            Err(e) => {
                self.metrics.fetch_failures.inc();
                warn!(slot, generation, error = %e, "Sale state fetch failed");
                store(&mut state, None);
                state.last_error = Some(format!("{}: {}", slot, e));
            }
        }
        true
    }
}

/// Keeps [`LiveSaleState`] current for one collection
pub struct SaleStateReader {
    ledger: RwLock<Arc<dyn LedgerClient>>,
    target: Arc<SaleTarget>,
    shared: Arc<Shared>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl SaleStateReader {
    pub fn new(ledger: Arc<dyn LedgerClient>, target: SaleTarget, metrics: Arc<Metrics>) -> Self {
        Self {
            ledger: RwLock::new(ledger),
            target: Arc::new(target),
            shared: Arc::new(Shared {
                state: RwLock::new(LiveSaleState::default()),
                generation: AtomicU64::new(0),
                metrics,
            }),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    pub fn target(&self) -> &SaleTarget {
        &self.target
    }

    pub fn snapshot(&self) -> LiveSaleState {
        self.shared.state.read().clone()
    }

    pub fn current_generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// Start a refresh for `identity`, superseding any refresh in flight.
    ///
    /// Counts are always fetched; the balance only when an identity is given.
    /// Must be called from within a tokio runtime.
    pub fn refresh(&self, identity: Option<Pubkey>) -> u64 {
        // Held from the bump through the spawns so that concurrent refreshes
        // abort and spawn in generation order
        let mut in_flight = self.in_flight.lock();
        let generation = {
            let mut state = self.shared.state.write();
            let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
            let identity_changed = state.identity != identity;
            state.generation = generation;
            state.identity = identity;
            state.last_error = None;
            if identity_changed {
                state.balance_sol = None;
            }
            generation
        };
        self.shared.metrics.state_refreshes.inc();
        MintLogger::default().log_refresh(generation, identity.map(|p| p.to_string()).as_deref());

        for handle in in_flight.drain(..) {
            handle.abort();
        }

        let ledger = self.ledger.read().clone();

        {
            let ledger = Arc::clone(&ledger);
            let target = Arc::clone(&self.target);
            let shared = Arc::clone(&self.shared);
            in_flight.push(tokio::spawn(async move {
                let timer = Timer::new();
                let result = fetch_counts(ledger.as_ref(), &target).await;
                timer.observe_duration(&shared.metrics.fetch_latency);
                shared.apply(generation, "counts", result, |state, counts| {
                    state.counts = counts;
                });
            }));
        }

        if let Some(owner) = identity {
            let shared = Arc::clone(&self.shared);
            in_flight.push(tokio::spawn(async move {
                let timer = Timer::new();
                let result = fetch_balance_sol(ledger.as_ref(), &owner).await;
                timer.observe_duration(&shared.metrics.fetch_latency);
                shared.apply(generation, "balance", result, |state, balance| {
                    state.balance_sol = balance;
                });
            }));
        }

        generation
    }

    /// Swap the ledger connection and refresh for the current identity
    pub fn reconnect(&self, ledger: Arc<dyn LedgerClient>) -> u64 {
        debug!(endpoint = ledger.endpoint(), "Ledger connection changed");
        *self.ledger.write() = ledger;
        let identity = self.shared.state.read().identity;
        self.refresh(identity)
    }

    /// Wait for the fetches of the latest refresh to finish
    pub async fn wait(&self) {
        let handles: Vec<_> = self.in_flight.lock().drain(..).collect();
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                if !e.is_cancelled() {
                    warn!(error = %e, "Sale state fetch task panicked");
                }
            }
        }
    }

    /// Record a counts response for `generation`; false if it was stale
    pub fn apply_counts(&self, generation: u64, result: Result<SaleCounts, FetchError>) -> bool {
        self.shared.apply(generation, "counts", result, |state, counts| {
            state.counts = counts;
        })
    }

    /// Record a balance response (in SOL) for `generation`; false if it was stale
    pub fn apply_balance(&self, generation: u64, result: Result<f64, FetchError>) -> bool {
        self.shared.apply(generation, "balance", result, |state, balance| {
            state.balance_sol = balance;
        })
    }
}

impl Drop for SaleStateReader {
    fn drop(&mut self) {
        for handle in self.in_flight.get_mut().drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lamports_to_sol() {
        assert_eq!(lamports_to_sol(1_500_000_000), 1.5);
        assert_eq!(lamports_to_sol(0), 0.0);
    }

    #[test]
    fn test_sale_counts_remaining() {
        let counts = SaleCounts { items_available: 10, items_redeemed: 12, go_live: None };
        assert_eq!(counts.remaining(), -2);
    }
}
