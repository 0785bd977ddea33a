//! Candy machine account layout and the `mint_nft` entry point
//!
//! The sale program is an Anchor program: accounts start with an 8-byte
//! discriminator followed by Borsh-encoded fields, and instructions start
//! with an 8-byte sighash of `global:<name>`.

use borsh::BorshDeserialize;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};
use thiserror::Error;

use crate::addresses::{MintAddresses, ProgramIds};

pub const DISCRIMINATOR_LEN: usize = 8;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Account data too short: {len} bytes")]
    TooShort { len: usize },

    #[error("Account discriminator mismatch (expected CandyMachine)")]
    Discriminator,

    #[error("Malformed account data: {0}")]
    Malformed(String),
}

/// `sha256(namespace:name)[..8]`
pub fn anchor_discriminator(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize)]
struct RawCandyMachineData {
    uuid: String,
    price: u64,
    items_available: u64,
    go_live_date: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize)]
struct RawCandyMachine {
    authority: [u8; 32],
    wallet: [u8; 32],
    token_mint: Option<[u8; 32]>,
    config: [u8; 32],
    data: RawCandyMachineData,
    items_redeemed: u64,
    bump: u8,
}

/// Decoded on-chain sale account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandyMachineAccount {
    pub authority: Pubkey,
    /// Treasury receiving the sale price
    pub wallet: Pubkey,
    pub token_mint: Option<Pubkey>,
    pub config: Pubkey,
    pub uuid: String,
    /// Price in lamports
    pub price: u64,
    pub items_available: u64,
    pub go_live_date: Option<i64>,
    pub items_redeemed: u64,
    pub bump: u8,
}

impl CandyMachineAccount {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(DecodeError::TooShort { len: data.len() });
        }
        let (disc, mut body) = data.split_at(DISCRIMINATOR_LEN);
        if disc != anchor_discriminator("account", "CandyMachine") {
            return Err(DecodeError::Discriminator);
        }
        // Accounts are allocated larger than their contents; trailing bytes are padding.
        let raw = RawCandyMachine::deserialize(&mut body)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        Ok(Self {
            authority: Pubkey::new_from_array(raw.authority),
            wallet: Pubkey::new_from_array(raw.wallet),
            token_mint: raw.token_mint.map(Pubkey::new_from_array),
            config: Pubkey::new_from_array(raw.config),
            uuid: raw.data.uuid,
            price: raw.data.price,
            items_available: raw.data.items_available,
            go_live_date: raw.data.go_live_date,
            items_redeemed: raw.items_redeemed,
            bump: raw.bump,
        })
    }

    /// Signed remaining count; not clamped at zero
    pub fn items_remaining(&self) -> i128 {
        crate::countdown::remaining_items(self.items_available, self.items_redeemed)
    }

    pub fn go_live(&self) -> Option<DateTime<Utc>> {
        self.go_live_date
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }
}

/// Accounts of one `mint_nft` call
#[derive(Debug, Clone, Copy)]
pub struct MintNftAccounts {
    pub config: Pubkey,
    pub payer: Pubkey,
    pub treasury: Pubkey,
    pub mint: Pubkey,
    pub addresses: MintAddresses,
}

/// Build the sale program's `mint_nft` instruction.
///
/// The payer doubles as mint authority and update authority.
pub fn mint_nft_instruction(programs: &ProgramIds, accounts: &MintNftAccounts) -> Instruction {
    let payer = accounts.payer;
    let metas = vec![
        AccountMeta::new_readonly(accounts.config, false),
        AccountMeta::new(accounts.addresses.candy_machine, false),
        AccountMeta::new(payer, true),
        AccountMeta::new(accounts.treasury, false),
        AccountMeta::new(accounts.addresses.metadata, false),
        AccountMeta::new(accounts.mint, false),
        AccountMeta::new_readonly(payer, true),
        AccountMeta::new_readonly(payer, true),
        AccountMeta::new(accounts.addresses.master_edition, false),
        AccountMeta::new_readonly(programs.token_metadata, false),
        AccountMeta::new_readonly(programs.token, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
    ];

    Instruction {
        program_id: programs.candy_machine,
        accounts: metas,
        data: anchor_discriminator("global", "mint_nft").to_vec(),
    }
}
