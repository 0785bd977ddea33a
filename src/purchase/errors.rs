//! Error types for the mint flow and their user-facing messages

use thiserror::Error;

use crate::candy_machine::DecodeError;
use crate::ledger::LedgerError;
use crate::wallet::WalletError;

/// Sale program error codes (Anchor custom errors start at 300)
pub const NOT_ENOUGH_SOL: u32 = 309;
pub const CANDY_MACHINE_EMPTY: u32 = 311;
pub const CANDY_MACHINE_NOT_LIVE: u32 = 312;

pub const MSG_SOLD_OUT: &str = "SOLD OUT!";
pub const MSG_NOT_LIVE: &str = "Minting period hasn't started yet.";
pub const MSG_INSUFFICIENT_FUNDS: &str = "Insufficient funds to mint. Please fund your wallet.";
pub const MSG_GENERIC: &str = "Minting failed! Please try again!";

/// Known outcomes a user can act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    SoldOut,
    NotLive,
    InsufficientFunds,
    Other,
}

impl FailureKind {
    pub fn from_code(code: u32) -> Self {
        match code {
            CANDY_MACHINE_EMPTY => Self::SoldOut,
            CANDY_MACHINE_NOT_LIVE => Self::NotLive,
            NOT_ENOUGH_SOL => Self::InsufficientFunds,
            _ => Self::Other,
        }
    }

    /// Match the hex form of a known code inside a log or error message
    pub fn from_message(message: &str) -> Self {
        let message = message.to_lowercase();
        if message.contains("0x137") {
            Self::SoldOut
        } else if message.contains("0x138") {
            Self::NotLive
        } else if message.contains("0x135") {
            Self::InsufficientFunds
        } else {
            Self::Other
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::SoldOut => MSG_SOLD_OUT,
            Self::NotLive => MSG_NOT_LIVE,
            Self::InsufficientFunds => MSG_INSUFFICIENT_FUNDS,
            Self::Other => MSG_GENERIC,
        }
    }
}

#[derive(Error, Debug)]
pub enum MintError {
    /// Another mint from this client has not finished yet
    #[error("A mint is already in flight")]
    AlreadyInFlight,

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Invalid collection id {id}: {reason}")]
    InvalidCollectionId { id: String, reason: String },

    /// Fetched sale account shows no items left
    #[error("Collection sold out ({redeemed}/{available} redeemed)")]
    SoldOut { available: u64, redeemed: u64 },

    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild { program: String, reason: String },

    #[error("Invalid instruction order: {0}")]
    InvalidInstructionOrder(String),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl MintError {
    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild { program: program.into(), reason: reason.into() }
    }

    pub fn invalid_order(reason: impl Into<String>) -> Self {
        Self::InvalidInstructionOrder(reason.into())
    }

    /// Classify by program error code first, then by message substring
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::SoldOut { .. } => FailureKind::SoldOut,
            Self::Ledger(err) => match err.program_code().map(FailureKind::from_code) {
                Some(kind) if kind != FailureKind::Other => kind,
                _ => FailureKind::from_message(&err.to_string()),
            },
            _ => FailureKind::Other,
        }
    }

    /// Text shown in the alert
    pub fn user_message(&self) -> String {
        match self {
            Self::AlreadyInFlight => "A mint is already in progress.".to_string(),
            Self::WalletNotConnected => "Connect a wallet first.".to_string(),
            _ => self.failure_kind().message().to_string(),
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::AlreadyInFlight => "in_flight",
            Self::WalletNotConnected | Self::Wallet(_) => "wallet",
            Self::UnknownCollection(_) | Self::InvalidCollectionId { .. } => "config",
            Self::SoldOut { .. } => "sold_out",
            Self::InstructionBuild { .. } | Self::InvalidInstructionOrder(_) => "instruction",
            Self::Decode(_) => "decode",
            Self::Ledger(_) => "ledger",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx_error(code: Option<u32>, message: &str) -> MintError {
        MintError::Ledger(LedgerError::Transaction { code, message: message.to_string() })
    }

    #[test]
    fn test_codes_map_to_messages() {
        assert_eq!(tx_error(Some(311), "x").user_message(), MSG_SOLD_OUT);
        assert_eq!(tx_error(Some(312), "x").user_message(), MSG_NOT_LIVE);
        assert_eq!(tx_error(Some(309), "x").user_message(), MSG_INSUFFICIENT_FUNDS);
        assert_eq!(tx_error(Some(305), "x").user_message(), MSG_GENERIC);
    }

    #[test]
    fn test_message_substrings() {
        let err = tx_error(None, "Program failed: custom program error: 0x137");
        assert_eq!(err.failure_kind(), FailureKind::SoldOut);
        let err = tx_error(None, "custom program error: 0x138");
        assert_eq!(err.failure_kind(), FailureKind::NotLive);
        let err = tx_error(None, "custom program error: 0x135");
        assert_eq!(err.failure_kind(), FailureKind::InsufficientFunds);
        let err = MintError::Ledger(LedgerError::Transport {
            endpoint: "http://localhost:8899".into(),
            message: "connection refused".into(),
        });
        assert_eq!(err.user_message(), MSG_GENERIC);
    }

    #[test]
    fn test_unmapped_code_falls_back_to_message() {
        let err = tx_error(Some(1), "custom program error: 0x137");
        assert_eq!(err.failure_kind(), FailureKind::SoldOut);
    }

    #[test]
    fn test_local_errors() {
        let err = MintError::SoldOut { available: 10, redeemed: 10 };
        assert_eq!(err.user_message(), MSG_SOLD_OUT);
        assert_eq!(err.category(), "sold_out");
        assert_eq!(MintError::AlreadyInFlight.category(), "in_flight");
        assert_eq!(
            MintError::instruction_failed("spl_token", "bad mint").to_string(),
            "Instruction build error (program=spl_token): bad mint"
        );
    }
}
