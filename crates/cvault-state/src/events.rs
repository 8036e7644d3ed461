//! Lifecycle events emitted by committed vault operations.

use serde::{Deserialize, Serialize};

use cvault_core::{AccountId, EncryptedHandle, NativeAmount};

/// A committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VaultEvent {
    /// A stake was created.
    StakeCreated {
        /// The staker.
        account: AccountId,
        /// Deposit in the smallest unit.
        amount: NativeAmount,
        /// Lock length in seconds.
        lock_duration: u64,
        /// Handle of the encrypted amount.
        handle: EncryptedHandle,
    },
    /// The stake's amount was released for public decryption.
    WithdrawalRequested {
        /// The staker.
        account: AccountId,
        /// Handle now publicly decryptable.
        handle: EncryptedHandle,
    },
    /// The stake was paid out and deleted.
    WithdrawalFinalized {
        /// The staker.
        account: AccountId,
        /// Proven amount paid out.
        amount: NativeAmount,
        /// Handle of the deleted stake.
        handle: EncryptedHandle,
    },
}

impl VaultEvent {
    /// The account the event concerns.
    pub fn account(&self) -> &AccountId {
        match self {
            Self::StakeCreated { account, .. }
            | Self::WithdrawalRequested { account, .. }
            | Self::WithdrawalFinalized { account, .. } => account,
        }
    }

    /// Event name as it appears in serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StakeCreated { .. } => "stake_created",
            Self::WithdrawalRequested { .. } => "withdrawal_requested",
            Self::WithdrawalFinalized { .. } => "withdrawal_finalized",
        }
    }
}
