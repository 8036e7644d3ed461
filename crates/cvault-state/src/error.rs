//! # Vault Error Types
//!
//! Every rejection names the account it concerns. Errors are grouped into
//! classes for callers that only need to know what kind of thing went
//! wrong; see [`VaultError::class`].

use thiserror::Error;

use cvault_core::{AccountId, NativeAmount, Timestamp};
use cvault_gateway::GatewayError;

use crate::transfer::TransferError;

/// Coarse error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The request itself is malformed.
    Validation,
    /// The request is not allowed in the account's current state.
    State,
    /// A proof did not check out.
    Integrity,
    /// Funds could not be moved.
    Resource,
    /// An external collaborator failed.
    Collaborator,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::State => "state",
            Self::Integrity => "integrity",
            Self::Resource => "resource",
            Self::Collaborator => "collaborator",
        };
        f.write_str(s)
    }
}

/// Errors from vault operations. A failed operation leaves no trace in the
/// ledger or the event journal.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The account already has a stake.
    #[error("account {account} already has an active stake")]
    StakeAlreadyActive {
        /// The caller.
        account: AccountId,
    },

    /// Lock duration outside the configured bounds.
    #[error("lock duration {duration}s outside [{min}s, {max}s]")]
    InvalidLockDuration {
        /// Requested duration in seconds.
        duration: u64,
        /// Lower bound in seconds.
        min: u64,
        /// Upper bound in seconds.
        max: u64,
    },

    /// Zero deposit.
    #[error("account {account} staked a zero amount")]
    InvalidStakeAmount {
        /// The caller.
        account: AccountId,
    },

    /// Deposit does not fit in 128 bits.
    #[error("stake of {amount} by {account} exceeds the 128-bit limit")]
    StakeAmountTooLarge {
        /// The caller.
        account: AccountId,
        /// The rejected deposit.
        amount: NativeAmount,
    },

    /// No stake for the account.
    #[error("account {account} has no active stake")]
    NoActiveStake {
        /// The caller.
        account: AccountId,
    },

    /// The lock period has not elapsed.
    #[error("stake of {account} is locked until {unlock_at} (now {now})")]
    LockPeriodActive {
        /// The caller.
        account: AccountId,
        /// First second at which withdrawal may be requested.
        unlock_at: Timestamp,
        /// Time of the attempt.
        now: Timestamp,
    },

    /// Withdrawal was already requested.
    #[error("account {account} already requested withdrawal")]
    WithdrawalAlreadyRequested {
        /// The caller.
        account: AccountId,
    },

    /// Finalize called before request.
    #[error("account {account} has not requested withdrawal")]
    WithdrawalNotRequested {
        /// The caller.
        account: AccountId,
    },

    /// The decryption proof or cleartext was rejected.
    #[error("decryption proof for {account} rejected: {reason}")]
    ProofVerificationFailed {
        /// The caller.
        account: AccountId,
        /// Verifier detail.
        reason: String,
    },

    /// The payout failed; the stake is restored.
    #[error("transfer to {account} failed: {source}")]
    TransferFailed {
        /// The caller.
        account: AccountId,
        /// Executor error.
        #[source]
        source: TransferError,
    },

    /// The encryption gateway failed.
    #[error("encryption gateway: {0}")]
    Gateway(#[from] GatewayError),
}

impl VaultError {
    /// The taxonomy class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidLockDuration { .. }
            | Self::InvalidStakeAmount { .. }
            | Self::StakeAmountTooLarge { .. } => ErrorClass::Validation,
            Self::StakeAlreadyActive { .. }
            | Self::NoActiveStake { .. }
            | Self::LockPeriodActive { .. }
            | Self::WithdrawalAlreadyRequested { .. }
            | Self::WithdrawalNotRequested { .. } => ErrorClass::State,
            Self::ProofVerificationFailed { .. } => ErrorClass::Integrity,
            Self::TransferFailed { .. } => ErrorClass::Resource,
            Self::Gateway(_) => ErrorClass::Collaborator,
        }
    }
}
