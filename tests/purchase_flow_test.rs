//! End-to-end mint flow against the in-memory ledger

mod common;

use solana_sdk::{compute_budget, signature::Keypair, signer::Signer, system_program};
use std::sync::Arc;
use std::time::Duration;

use candy_mint::catalog::CollectionDisplay;
use candy_mint::config::TransactionConfig;
use candy_mint::ledger::{LedgerClient, LedgerError};
use candy_mint::purchase::errors::{MSG_INSUFFICIENT_FUNDS, MSG_NOT_LIVE, MSG_SOLD_OUT};
use candy_mint::purchase::{FailureKind, MintError, MintOrchestrator};
use candy_mint::wallet::KeypairWallet;
use common::SaleFixture;

fn orchestrator(fixture: &SaleFixture, transaction: TransactionConfig) -> MintOrchestrator {
    MintOrchestrator::new(
        fixture.ledger.clone() as Arc<dyn LedgerClient>,
        fixture.programs,
        transaction,
        Arc::clone(&fixture.metrics),
    )
}

fn no_budget() -> TransactionConfig {
    TransactionConfig { compute_unit_limit: 0, priority_fee_micro_lamports: 0 }
}

#[tokio::test]
async fn test_mint_submits_one_signed_transaction() {
    let fixture = SaleFixture::new(100, 42);
    let orchestrator = orchestrator(&fixture, no_budget());
    let payer = Keypair::new();
    let payer_pubkey = payer.pubkey();
    let wallet = KeypairWallet::from_keypair(payer);

    let receipt = orchestrator.mint(&wallet, &fixture.display()).await.unwrap();

    assert_eq!(fixture.ledger.send_count(), 1);
    let sent = fixture.ledger.sent.lock();
    let tx = &sent[0];
    assert!(tx.is_signed());
    assert_eq!(tx.message.account_keys[0], payer_pubkey);
    assert_eq!(tx.message.instructions.len(), 5);

    let programs: Vec<_> = tx
        .message
        .instructions
        .iter()
        .map(|ix| tx.message.account_keys[ix.program_id_index as usize])
        .collect();
    assert_eq!(programs[0], system_program::id());
    assert_eq!(programs[4], fixture.programs.candy_machine);

    // the buyer's token account for the new mint receives the item
    assert_eq!(
        receipt.token_account,
        fixture.programs.token_account_address(&payer_pubkey, &receipt.mint)
    );
    assert!(tx.message.account_keys.contains(&receipt.mint));
    assert!(tx.message.account_keys.contains(&fixture.treasury));
    assert_eq!(fixture.metrics.mint_success.get(), 1);
    assert!(!orchestrator.is_minting());
}

#[tokio::test]
async fn test_compute_budget_instructions_come_first() {
    let fixture = SaleFixture::new(100, 0);
    let orchestrator = orchestrator(
        &fixture,
        TransactionConfig { compute_unit_limit: 300_000, priority_fee_micro_lamports: 1_000 },
    );
    let wallet = KeypairWallet::from_keypair(Keypair::new());

    orchestrator.mint(&wallet, &fixture.display()).await.unwrap();

    let sent = fixture.ledger.sent.lock();
    let message = &sent[0].message;
    assert_eq!(message.instructions.len(), 7);
    let first = message.account_keys[message.instructions[0].program_id_index as usize];
    assert_eq!(first, compute_budget::id());
}

#[tokio::test]
async fn test_concurrent_mints_submit_once() {
    let fixture = SaleFixture::new(100, 0);
    *fixture.ledger.send_delay.lock() = Duration::from_millis(50);
    let orchestrator = orchestrator(&fixture, no_budget());
    let wallet = KeypairWallet::from_keypair(Keypair::new());
    let display = fixture.display();

    let (first, second) = tokio::join!(
        orchestrator.mint(&wallet, &display),
        orchestrator.mint(&wallet, &display)
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(MintError::AlreadyInFlight)));
    assert_eq!(fixture.ledger.send_count(), 1);
    assert_eq!(fixture.metrics.mint_rejected_in_flight.get(), 1);

    // slot is released once the first mint completes
    assert!(orchestrator.mint(&wallet, &display).await.is_ok());
    assert_eq!(fixture.ledger.send_count(), 2);
}

#[tokio::test]
async fn test_program_errors_map_to_messages() {
    let cases = [
        (311, FailureKind::SoldOut, MSG_SOLD_OUT),
        (312, FailureKind::NotLive, MSG_NOT_LIVE),
        (309, FailureKind::InsufficientFunds, MSG_INSUFFICIENT_FUNDS),
    ];
    for (code, kind, message) in cases {
        let fixture = SaleFixture::new(100, 0);
        fixture.ledger.fail_sends_with(LedgerError::Transaction {
            code: Some(code),
            message: format!("custom program error: {:#x}", code),
        });
        let orchestrator = orchestrator(&fixture, no_budget());
        let wallet = KeypairWallet::from_keypair(Keypair::new());

        let err = orchestrator.mint(&wallet, &fixture.display()).await.unwrap_err();
        assert_eq!(err.failure_kind(), kind);
        assert_eq!(err.user_message(), message);
        assert_eq!(fixture.metrics.mint_failed.get(), 1);
        assert!(!orchestrator.is_minting());
    }
}

#[tokio::test]
async fn test_sold_out_is_detected_before_sending() {
    let fixture = SaleFixture::new(10, 10);
    let orchestrator = orchestrator(&fixture, no_budget());
    let wallet = KeypairWallet::from_keypair(Keypair::new());

    let err = orchestrator.mint(&wallet, &fixture.display()).await.unwrap_err();
    assert!(matches!(err, MintError::SoldOut { available: 10, redeemed: 10 }));
    assert_eq!(err.user_message(), MSG_SOLD_OUT);
    assert_eq!(fixture.ledger.send_count(), 0);
}

#[tokio::test]
async fn test_rejects_without_wallet_or_collection() {
    let fixture = SaleFixture::new(100, 0);
    let orchestrator = orchestrator(&fixture, no_budget());

    let disconnected = KeypairWallet::new("/nonexistent/id.json");
    let err = orchestrator.mint(&disconnected, &fixture.display()).await.unwrap_err();
    assert!(matches!(err, MintError::WalletNotConnected));

    let wallet = KeypairWallet::from_keypair(Keypair::new());
    let unknown = CollectionDisplay::resolve(&fixture.catalog(""), "missing");
    let err = orchestrator.mint(&wallet, &unknown).await.unwrap_err();
    assert!(matches!(err, MintError::UnknownCollection(ref id) if id == "missing"));

    assert_eq!(fixture.ledger.send_count(), 0);
    assert_eq!(fixture.metrics.mint_attempts.get(), 0);
}

#[tokio::test]
async fn test_missing_sale_account_fails_without_sending() {
    let fixture = SaleFixture::new(100, 0);
    fixture.ledger.accounts.lock().clear();
    let orchestrator = orchestrator(&fixture, no_budget());
    let wallet = KeypairWallet::from_keypair(Keypair::new());

    let err = orchestrator.mint(&wallet, &fixture.display()).await.unwrap_err();
    assert!(matches!(err, MintError::Ledger(LedgerError::AccountNotFound { .. })));
    assert_eq!(err.failure_kind(), FailureKind::Other);
    assert_eq!(fixture.ledger.send_count(), 0);
}

#[tokio::test]
async fn test_oversized_uuid_fails_with_typed_error() {
    let fixture = SaleFixture::new(100, 0);
    let orchestrator = orchestrator(&fixture, no_budget());
    let wallet = KeypairWallet::from_keypair(Keypair::new());
    let display = CollectionDisplay { uuid: "x".repeat(40), ..fixture.display() };

    let err = orchestrator.mint(&wallet, &display).await.unwrap_err();
    assert!(matches!(err, MintError::InvalidCollectionId { ref reason, .. } if reason.contains("40 bytes")));
    assert_eq!(err.failure_kind(), FailureKind::Other);
    assert_eq!(fixture.ledger.send_count(), 0);
    assert_eq!(fixture.metrics.mint_failed.get(), 1);
    assert!(!orchestrator.is_minting());
}
