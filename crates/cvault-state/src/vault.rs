//! # Vault State Machine
//!
//! Per-account lifecycle:
//!
//! ```text
//! Absent --stake--> Active --request_withdrawal--> PendingFinalization
//!    ^                                                     |
//!    +--------------------finalize_withdrawal--------------+
//! ```
//!
//! ## Security Invariant
//!
//! Each mutating operation is one transaction. The vault state sits behind
//! a re-entrant mutex; an operation takes a ledger and event checkpoint on
//! entry and rolls back to it on any error. `finalize_withdrawal` deletes
//! the record *before* paying out, so an executor that re-enters the vault
//! on the same thread sees no stake. If the payout fails, the deletion is
//! rolled back with everything else.
//!
//! No `RefCell` borrow of the state is held across a call into a
//! collaborator.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};

use cvault_core::{AccountId, Clock, EncryptedHandle, NativeAmount, Timestamp};
use cvault_gateway::{EncryptionGateway, GatewayError};
use cvault_proof::{decode_cleartexts, ProofVerifier};

use crate::config::{ConfigError, VaultConfig};
use crate::error::VaultError;
use crate::events::VaultEvent;
use crate::ledger::{AccountLedger, Checkpoint, StakeRecord};
use crate::transfer::TransferExecutor;

// ---------------------------------------------------------------------------
// Read model
// ---------------------------------------------------------------------------

/// Public view of an account's stake. All fields are zero when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeSummary {
    /// Handle of the staked amount, or the zero handle.
    pub encrypted_amount_handle: EncryptedHandle,
    /// Creation time, or the epoch.
    pub start_timestamp: Timestamp,
    /// `start + lock_duration`, or the epoch.
    pub unlock_timestamp: Timestamp,
    /// Lock length in seconds, or 0.
    pub lock_duration: u64,
    /// Whether withdrawal has been requested.
    pub withdrawal_requested: bool,
    /// Whether the account has a stake.
    pub exists: bool,
}

impl StakeSummary {
    fn absent() -> Self {
        Self {
            encrypted_amount_handle: EncryptedHandle::ZERO,
            start_timestamp: Timestamp::EPOCH,
            unlock_timestamp: Timestamp::EPOCH,
            lock_duration: 0,
            withdrawal_requested: false,
            exists: false,
        }
    }
}

impl From<&StakeRecord> for StakeSummary {
    fn from(record: &StakeRecord) -> Self {
        Self {
            encrypted_amount_handle: record.encrypted_amount,
            start_timestamp: record.start,
            unlock_timestamp: record.unlock_at(),
            lock_duration: record.lock_duration,
            withdrawal_requested: record.withdrawal_requested,
            exists: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct VaultState {
    ledger: AccountLedger,
    events: Vec<VaultEvent>,
    depth: usize,
}

/// The confidential time-locked vault.
pub struct Vault {
    config: VaultConfig,
    gateway: Arc<dyn EncryptionGateway>,
    verifier: Arc<dyn ProofVerifier>,
    executor: Arc<dyn TransferExecutor>,
    clock: Arc<dyn Clock>,
    state: ReentrantMutex<RefCell<VaultState>>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("config", &self.config)
            .field("stakes", &self.stake_count())
            .finish_non_exhaustive()
    }
}

impl Vault {
    /// Assemble a vault from its collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails validation.
    pub fn new(
        config: VaultConfig,
        gateway: Arc<dyn EncryptionGateway>,
        verifier: Arc<dyn ProofVerifier>,
        executor: Arc<dyn TransferExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            gateway,
            verifier,
            executor,
            clock,
            state: ReentrantMutex::new(RefCell::new(VaultState::default())),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Principal granted access to every stake.
    pub fn vault_principal(&self) -> &AccountId {
        &self.config.vault_principal
    }

    // -- operations ---------------------------------------------------------

    /// Lock `deposit` for `lock_duration` seconds.
    ///
    /// Checks run in order and the first failure wins:
    /// [`StakeAlreadyActive`](VaultError::StakeAlreadyActive),
    /// [`InvalidLockDuration`](VaultError::InvalidLockDuration),
    /// [`InvalidStakeAmount`](VaultError::InvalidStakeAmount),
    /// [`StakeAmountTooLarge`](VaultError::StakeAmountTooLarge).
    /// Gateway failures surface as [`VaultError::Gateway`].
    pub fn stake(
        &self,
        account: &AccountId,
        lock_duration: u64,
        deposit: NativeAmount,
    ) -> Result<EncryptedHandle, VaultError> {
        self.transact("stake", || {
            if self.has_stake(account) {
                return Err(VaultError::StakeAlreadyActive { account: *account });
            }
            let (min, max) = (self.config.min_lock_duration, self.config.max_lock_duration);
            if !(min..=max).contains(&lock_duration) {
                return Err(VaultError::InvalidLockDuration {
                    duration: lock_duration,
                    min,
                    max,
                });
            }
            if deposit.is_zero() {
                return Err(VaultError::InvalidStakeAmount { account: *account });
            }
            let clear = deposit.to_u128().ok_or(VaultError::StakeAmountTooLarge {
                account: *account,
                amount: deposit,
            })?;

            let handle = self.gateway.encrypt(clear)?;
            if handle.is_zero() {
                return Err(GatewayError::ZeroHandle.into());
            }
            self.gateway.grant_access(&handle, account)?;
            self.gateway.grant_access(&handle, &self.config.vault_principal)?;

            let record = StakeRecord {
                encrypted_amount: handle,
                lock_duration,
                start: self.clock.now(),
                withdrawal_requested: false,
            };
            let unlock_at = record.unlock_at();
            self.with_state(|state| {
                state.ledger.insert(*account, record);
                state.events.push(VaultEvent::StakeCreated {
                    account: *account,
                    amount: deposit,
                    lock_duration,
                    handle,
                });
            });
            tracing::info!(%account, %handle, lock_duration, %unlock_at, "stake created");
            Ok(handle)
        })
    }

    /// Release the stake's amount for public decryption once the lock has
    /// elapsed.
    pub fn request_withdrawal(&self, account: &AccountId) -> Result<EncryptedHandle, VaultError> {
        self.transact("request_withdrawal", || {
            let record = self
                .record(account)
                .ok_or(VaultError::NoActiveStake { account: *account })?;
            let now = self.clock.now();
            let unlock_at = record.unlock_at();
            if now < unlock_at {
                return Err(VaultError::LockPeriodActive {
                    account: *account,
                    unlock_at,
                    now,
                });
            }
            if record.withdrawal_requested {
                return Err(VaultError::WithdrawalAlreadyRequested { account: *account });
            }

            let handle = record.encrypted_amount;
            self.with_state(|state| state.ledger.mark_withdrawal_requested(account));
            self.gateway.mark_publicly_decryptable(&handle)?;
            self.with_state(|state| {
                state.events.push(VaultEvent::WithdrawalRequested {
                    account: *account,
                    handle,
                })
            });
            tracing::info!(%account, %handle, "withdrawal requested");
            Ok(handle)
        })
    }

    /// Verify the published decryption and pay the stake out.
    ///
    /// Returns the amount transferred.
    pub fn finalize_withdrawal(
        &self,
        account: &AccountId,
        cleartexts: &[u8],
        proof: &[u8],
    ) -> Result<u128, VaultError> {
        self.transact("finalize_withdrawal", || {
            let record = self
                .record(account)
                .ok_or(VaultError::NoActiveStake { account: *account })?;
            if !record.withdrawal_requested {
                return Err(VaultError::WithdrawalNotRequested { account: *account });
            }

            let handle = record.encrypted_amount;
            let handles = [EncryptedHandle::from_bytes(
                self.gateway.to_canonical_bytes(&handle),
            )];
            let reject = |reason: String| {
                tracing::warn!(%account, %handle, %reason, "decryption proof rejected");
                VaultError::ProofVerificationFailed {
                    account: *account,
                    reason,
                }
            };
            let amount = self
                .verifier
                .verify(&handles, cleartexts, proof)
                .and_then(|()| decode_cleartexts(cleartexts, handles.len()))
                .map_err(|e| reject(e.to_string()))?
                .into_iter()
                .next()
                .ok_or_else(|| reject("no cleartext for the stake handle".to_string()))?;

            self.with_state(|state| state.ledger.remove(account));
            self.executor.transfer(account, amount).map_err(|source| {
                tracing::warn!(%account, %handle, error = %source, "payout failed");
                VaultError::TransferFailed {
                    account: *account,
                    source,
                }
            })?;

            self.with_state(|state| {
                state.events.push(VaultEvent::WithdrawalFinalized {
                    account: *account,
                    amount: NativeAmount::from_u128(amount),
                    handle,
                })
            });
            tracing::info!(%account, %handle, amount, "withdrawal finalized");
            Ok(amount)
        })
    }

    // -- reads --------------------------------------------------------------

    /// Summary of `account`'s stake. Never fails.
    pub fn get_stake_summary(&self, account: &AccountId) -> StakeSummary {
        self.record(account)
            .as_ref()
            .map(StakeSummary::from)
            .unwrap_or_else(StakeSummary::absent)
    }

    /// Handle of the staked amount, or [`EncryptedHandle::ZERO`].
    pub fn get_encrypted_amount(&self, account: &AccountId) -> EncryptedHandle {
        self.record(account)
            .map(|r| r.encrypted_amount)
            .unwrap_or(EncryptedHandle::ZERO)
    }

    /// Whether `account` has a stake.
    pub fn has_stake(&self, account: &AccountId) -> bool {
        self.with_state(|state| state.ledger.contains(account))
    }

    /// Number of live stakes.
    pub fn stake_count(&self) -> usize {
        self.with_state(|state| state.ledger.len())
    }

    /// Committed events, oldest first.
    pub fn events(&self) -> Vec<VaultEvent> {
        self.with_state(|state| state.events.clone())
    }

    /// Take the committed events, leaving the journal empty.
    pub fn drain_events(&self) -> Vec<VaultEvent> {
        self.with_state(|state| std::mem::take(&mut state.events))
    }

    // -- internals ----------------------------------------------------------

    fn record(&self, account: &AccountId) -> Option<StakeRecord> {
        self.with_state(|state| state.ledger.get(account).cloned())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut VaultState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    fn transact<T>(
        &self,
        operation: &'static str,
        body: impl FnOnce() -> Result<T, VaultError>,
    ) -> Result<T, VaultError> {
        let _serial = self.state.lock();
        let mut tx = self.with_state(|state| {
            state.depth += 1;
            Transaction {
                vault: self,
                operation,
                checkpoint: state.ledger.checkpoint(),
                events_mark: state.events.len(),
                committed: false,
            }
        });
        tracing::debug!(operation, checkpoint = ?tx.checkpoint, "transaction opened");

        let result = body();
        match &result {
            Ok(_) => tx.committed = true,
            Err(err) => tracing::debug!(operation, error = %err, "transaction rolled back"),
        }
        result
    }
}

/// Open transaction scope. Dropping it without `committed` set, including
/// while unwinding from a collaborator panic, rolls the ledger and event
/// journal back to the checkpoint.
struct Transaction<'a> {
    vault: &'a Vault,
    operation: &'static str,
    checkpoint: Checkpoint,
    events_mark: usize,
    committed: bool,
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        let committed = self.committed;
        let (checkpoint, events_mark) = (self.checkpoint, self.events_mark);
        self.vault.with_state(|state| {
            state.depth -= 1;
            if !committed {
                state.ledger.rollback(checkpoint);
                state.events.truncate(events_mark);
            } else if state.depth == 0 {
                state.ledger.clear_journal();
            }
        });
        if !committed && std::thread::panicking() {
            tracing::warn!(operation = self.operation, "transaction unwound by panic");
        }
    }
}
