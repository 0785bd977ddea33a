//! Purchase orchestration
//!
//! A mint is one composite transaction: create and initialize a fresh
//! token mint, create the buyer's associated token account, mint one token
//! into it and call the sale program's `mint_nft`, which charges the price
//! and writes the metadata and master-edition records.
//!
//! - **errors**: failure taxonomy and user-facing messages
//! - **instructions**: instruction planning and order validation
//! - **guard**: single-slot in-flight guard against double submission

pub mod errors;
pub mod guard;
pub mod instructions;

pub use errors::{FailureKind, MintError};
pub use guard::InFlightGuard;
pub use instructions::{plan_mint_instructions, sanity_check_ix_order, InstructionPlan};

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::str::FromStr;
use std::sync::Arc;

use crate::addresses::ProgramIds;
use crate::candy_machine::CandyMachineAccount;
use crate::catalog::CollectionDisplay;
use crate::config::TransactionConfig;
use crate::ledger::LedgerClient;
use crate::metrics::{Metrics, Timer};
use crate::observability::CorrelationId;
use crate::structured_logging::MintLogger;
use crate::wallet::{WalletAdapter, WalletError};
use instructions::{MintPlanInputs, MINT_ACCOUNT_LEN};

/// Result of a confirmed mint
#[derive(Debug, Clone)]
pub struct MintReceipt {
    pub signature: Signature,
    pub mint: Pubkey,
    pub token_account: Pubkey,
    pub correlation_id: CorrelationId,
}

pub struct MintOrchestrator {
    ledger: Arc<dyn LedgerClient>,
    programs: ProgramIds,
    transaction: TransactionConfig,
    guard: InFlightGuard,
    metrics: Arc<Metrics>,
}

impl MintOrchestrator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        programs: ProgramIds,
        transaction: TransactionConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            ledger,
            programs,
            transaction,
            guard: InFlightGuard::new(),
            metrics,
        }
    }

    pub fn programs(&self) -> &ProgramIds {
        &self.programs
    }

    /// True while a mint holds the in-flight slot
    pub fn is_minting(&self) -> bool {
        self.guard.is_held()
    }

    /// Mint one item of `collection` for the connected `wallet`.
    ///
    /// Fails with [`MintError::AlreadyInFlight`] without touching the ledger
    /// if another mint from this orchestrator has not finished.
    pub async fn mint(
        &self,
        wallet: &dyn WalletAdapter,
        collection: &CollectionDisplay,
    ) -> Result<MintReceipt, MintError> {
        let Some(_permit) = self.guard.try_acquire() else {
            self.metrics.mint_rejected_in_flight.inc();
            return Err(MintError::AlreadyInFlight);
        };

        let payer = match wallet.pubkey() {
            Some(pubkey) if wallet.is_connected() => pubkey,
            _ => return Err(MintError::WalletNotConnected),
        };
        if !collection.exists {
            return Err(MintError::UnknownCollection(collection.id.clone()));
        }
        let config = Pubkey::from_str(&collection.id).map_err(|e| MintError::InvalidCollectionId {
            id: collection.id.clone(),
            reason: e.to_string(),
        })?;

        self.metrics.mint_attempts.inc();
        let logger = MintLogger::new(CorrelationId::new());
        let timer = Timer::new();
        let _latency = scopeguard::guard(&timer, |timer| {
            timer.observe_duration(&self.metrics.mint_latency)
        });

        let result = self
            .submit(wallet, payer, config, &collection.uuid, &logger)
            .await;

        match &result {
            Ok(receipt) => {
                self.metrics.mint_success.inc();
                logger.log_mint_success(
                    &receipt.mint.to_string(),
                    &receipt.signature.to_string(),
                    timer.elapsed_ms(),
                );
            }
            Err(e) => {
                self.metrics.mint_failed.inc();
                logger.log_mint_failure(&e.to_string(), e.category(), timer.elapsed_ms());
            }
        }
        result
    }

    async fn submit(
        &self,
        wallet: &dyn WalletAdapter,
        payer: Pubkey,
        config: Pubkey,
        uuid: &str,
        logger: &MintLogger,
    ) -> Result<MintReceipt, MintError> {
        let mint = Keypair::new();
        let addresses = self
            .programs
            .derive_mint_addresses(&config, uuid, &payer, &mint.pubkey())
            .map_err(|e| MintError::InvalidCollectionId {
                id: config.to_string(),
                reason: e.to_string(),
            })?;
        logger.log_mint_attempt(&config.to_string(), &mint.pubkey().to_string(), &payer.to_string());

        let data = self.ledger.get_account_data(&addresses.candy_machine).await?;
        let account = CandyMachineAccount::decode(&data)?;
        if account.items_remaining() <= 0 {
            return Err(MintError::SoldOut {
                available: account.items_available,
                redeemed: account.items_redeemed,
            });
        }

        let mint_rent_lamports = self
            .ledger
            .get_minimum_balance_for_rent_exemption(MINT_ACCOUNT_LEN)
            .await?;

        let plan = plan_mint_instructions(
            &self.programs,
            &MintPlanInputs {
                payer,
                mint: mint.pubkey(),
                config,
                treasury: account.wallet,
                addresses,
                mint_rent_lamports,
                compute_unit_limit: self.transaction.compute_unit_limit,
                priority_fee_micro_lamports: self.transaction.priority_fee_micro_lamports,
            },
        )?;
        sanity_check_ix_order(&self.programs, &plan.instructions)?;

        let blockhash = self.ledger.get_latest_blockhash().await?;
        let mut tx = Transaction::new_with_payer(&plan.instructions, Some(&payer));
        tx.try_partial_sign(&[&mint], blockhash)
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        wallet.sign_transaction(&mut tx, blockhash)?;

        let signature = self.ledger.send_and_confirm_transaction(&tx).await?;

        Ok(MintReceipt {
            signature,
            mint: mint.pubkey(),
            token_account: addresses.token_account,
            correlation_id: logger.correlation_id().clone(),
        })
    }
}
