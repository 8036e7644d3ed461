//! # Account Ledger
//!
//! The mapping from account to its single stake record, and the only
//! mutable shared state in the vault. Presence in the map is what "has a
//! stake" means; there is no separate existence flag.
//!
//! Every write is journaled with the record it replaced so a transaction
//! can roll the ledger back to a [`Checkpoint`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use cvault_core::{AccountId, EncryptedHandle, Timestamp};

/// One account's stake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    /// Gateway handle of the staked amount.
    pub encrypted_amount: EncryptedHandle,
    /// Lock length in seconds, fixed at creation.
    pub lock_duration: u64,
    /// Creation time, fixed at creation.
    pub start: Timestamp,
    /// Set once by a withdrawal request; never cleared.
    pub withdrawal_requested: bool,
}

impl StakeRecord {
    /// First second at which a withdrawal may be requested.
    pub fn unlock_at(&self) -> Timestamp {
        self.start
            .checked_add_secs(self.lock_duration)
            .unwrap_or(Timestamp::from_secs(u64::MAX))
    }
}

/// Journal position to roll back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

#[derive(Debug, Clone)]
struct JournalEntry {
    account: AccountId,
    previous: Option<StakeRecord>,
}

/// Account → stake record, with an undo journal.
#[derive(Debug, Default)]
pub struct AccountLedger {
    records: HashMap<AccountId, StakeRecord>,
    journal: Vec<JournalEntry>,
}

impl AccountLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// The record for `account`, if any.
    pub fn get(&self, account: &AccountId) -> Option<&StakeRecord> {
        self.records.get(account)
    }

    /// Whether `account` has a record.
    pub fn contains(&self, account: &AccountId) -> bool {
        self.records.contains_key(account)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a record for an account that has none.
    ///
    /// Returns `false` and leaves the ledger untouched if a record exists.
    pub fn insert(&mut self, account: AccountId, record: StakeRecord) -> bool {
        if self.records.contains_key(&account) {
            return false;
        }
        self.journal.push(JournalEntry {
            account,
            previous: None,
        });
        self.records.insert(account, record);
        true
    }

    /// Set the withdrawal flag. Returns `false` if there is no record.
    pub fn mark_withdrawal_requested(&mut self, account: &AccountId) -> bool {
        let Some(record) = self.records.get_mut(account) else {
            return false;
        };
        self.journal.push(JournalEntry {
            account: *account,
            previous: Some(record.clone()),
        });
        record.withdrawal_requested = true;
        true
    }

    /// Delete and return the record.
    pub fn remove(&mut self, account: &AccountId) -> Option<StakeRecord> {
        let removed = self.records.remove(account)?;
        self.journal.push(JournalEntry {
            account: *account,
            previous: Some(removed.clone()),
        });
        Some(removed)
    }

    /// Current journal position.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.journal.len())
    }

    /// Undo every write made after `checkpoint`, newest first.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.0 {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry.previous {
                Some(record) => {
                    self.records.insert(entry.account, record);
                }
                None => {
                    self.records.remove(&entry.account);
                }
            }
        }
    }

    /// Forget the journal. Called when the outermost transaction commits.
    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Entries awaiting commit.
    #[cfg(test)]
    pub(crate) fn journal_len(&self) -> usize {
        self.journal.len()
    }
}
