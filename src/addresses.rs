//! Program identifiers and derived addresses
//!
//! Every address a purchase touches is either one of the configured
//! program ids or a program derived address computed from fixed seeds.

use solana_sdk::{
    pubkey,
    pubkey::{Pubkey, MAX_SEED_LEN},
};
use thiserror::Error;

/// Seed prefix of the candy machine account
pub const CANDY_MACHINE_SEED: &[u8] = b"candy_machine";

/// Seed prefix shared by metadata and master-edition records
pub const METADATA_SEED: &[u8] = b"metadata";

/// Trailing seed of the master-edition record
pub const EDITION_SEED: &[u8] = b"edition";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("uuid {uuid:?} is {len} bytes; seeds are limited to {MAX_SEED_LEN}")]
    SeedTooLong { uuid: String, len: usize },

    #[error("No viable bump seed for uuid {0:?}")]
    NoViableBump(String),
}

/// Programs a mint transaction talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    /// Sale program enforcing supply and payment
    pub candy_machine: Pubkey,
    pub token_metadata: Pubkey,
    pub associated_token: Pubkey,
    pub token: Pubkey,
}

impl Default for ProgramIds {
    fn default() -> Self {
        Self {
            candy_machine: pubkey!("cndyAnrLdpjq1Ssp1z8xxDsB8dxe7u4HL5Nxi2K5WXZ"),
            token_metadata: pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s"),
            associated_token: spl_associated_token_account::id(),
            token: spl_token::id(),
        }
    }
}

/// The set of addresses derived for one new mint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintAddresses {
    pub candy_machine: Pubkey,
    pub token_account: Pubkey,
    pub metadata: Pubkey,
    pub master_edition: Pubkey,
}

impl ProgramIds {
    /// Candy machine account for a config address and its uuid.
    ///
    /// The uuid comes from the catalog, so its length is checked here
    /// rather than trusted.
    pub fn candy_machine_address(
        &self,
        config: &Pubkey,
        uuid: &str,
    ) -> Result<(Pubkey, u8), AddressError> {
        if uuid.len() > MAX_SEED_LEN {
            return Err(AddressError::SeedTooLong { uuid: uuid.to_string(), len: uuid.len() });
        }
        Pubkey::try_find_program_address(
            &[CANDY_MACHINE_SEED, config.as_ref(), uuid.as_bytes()],
            &self.candy_machine,
        )
        .ok_or_else(|| AddressError::NoViableBump(uuid.to_string()))
    }

    pub fn metadata_address(&self, mint: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(
            &[METADATA_SEED, self.token_metadata.as_ref(), mint.as_ref()],
            &self.token_metadata,
        )
        .0
    }

    pub fn master_edition_address(&self, mint: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(
            &[
                METADATA_SEED,
                self.token_metadata.as_ref(),
                mint.as_ref(),
                EDITION_SEED,
            ],
            &self.token_metadata,
        )
        .0
    }

    /// Associated token account holding `wallet`'s balance of `mint`
    pub fn token_account_address(&self, wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(
            &[wallet.as_ref(), self.token.as_ref(), mint.as_ref()],
            &self.associated_token,
        )
        .0
    }

    pub fn derive_mint_addresses(
        &self,
        config: &Pubkey,
        uuid: &str,
        wallet: &Pubkey,
        mint: &Pubkey,
    ) -> Result<MintAddresses, AddressError> {
        Ok(MintAddresses {
            candy_machine: self.candy_machine_address(config, uuid)?.0,
            token_account: self.token_account_address(wallet, mint),
            metadata: self.metadata_address(mint),
            master_edition: self.master_edition_address(mint),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spl_associated_token_account::get_associated_token_address;

    #[test]
    fn test_token_account_matches_spl_derivation() {
        let ids = ProgramIds::default();
        let wallet = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        assert_eq!(
            ids.token_account_address(&wallet, &mint),
            get_associated_token_address(&wallet, &mint)
        );
    }

    #[test]
    fn test_metadata_and_edition_differ() {
        let ids = ProgramIds::default();
        let mint = Pubkey::new_unique();
        let metadata = ids.metadata_address(&mint);
        let edition = ids.master_edition_address(&mint);
        assert_ne!(metadata, edition);
        assert_eq!(metadata, ids.metadata_address(&mint));
    }

    #[test]
    fn test_candy_machine_address_depends_on_uuid() {
        let ids = ProgramIds::default();
        let config = Pubkey::new_unique();
        let (a, _) = ids.candy_machine_address(&config, "2DEZfF").unwrap();
        let (b, _) = ids.candy_machine_address(&config, "2DEZfG").unwrap();
        assert_ne!(a, b);

        let (again, bump) = ids.candy_machine_address(&config, "2DEZfF").unwrap();
        assert_eq!(a, again);
        let recreated = Pubkey::create_program_address(
            &[CANDY_MACHINE_SEED, config.as_ref(), b"2DEZfF", &[bump]],
            &ids.candy_machine,
        )
        .unwrap();
        assert_eq!(recreated, a);
    }

    #[test]
    fn test_oversized_uuid_is_an_error() {
        let ids = ProgramIds::default();
        let config = Pubkey::new_unique();
        let uuid = "x".repeat(40);
        assert_eq!(
            ids.candy_machine_address(&config, &uuid),
            Err(AddressError::SeedTooLong { uuid: uuid.clone(), len: 40 })
        );
        let wallet = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        assert!(ids.derive_mint_addresses(&config, &uuid, &wallet, &mint).is_err());
        assert!(ids.candy_machine_address(&config, &"x".repeat(32)).is_ok());
    }

    #[test]
    fn test_custom_program_ids_change_derivation() {
        let mut ids = ProgramIds::default();
        let mint = Pubkey::new_unique();
        let before = ids.metadata_address(&mint);
        ids.token_metadata = Pubkey::new_unique();
        assert_ne!(before, ids.metadata_address(&mint));
    }
}
