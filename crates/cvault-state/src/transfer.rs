//! # Transfer Executors
//!
//! The vault pays out through a [`TransferExecutor`]. The executor is
//! untrusted: it may fail, and it may call back into the vault while a
//! payout is in flight.

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

use cvault_core::AccountId;

/// Errors from a value transfer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The paying reserve cannot cover the amount.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Amount requested.
        requested: u128,
        /// Amount available.
        available: u128,
    },

    /// The recipient cannot receive the transfer.
    #[error("transfer to {account} rejected: {reason}")]
    Rejected {
        /// Intended recipient.
        account: AccountId,
        /// Why the transfer was refused.
        reason: String,
    },
}

/// Moves native value out of the vault.
pub trait TransferExecutor: Send + Sync {
    /// Pay `amount` to `to`.
    fn transfer(&self, to: &AccountId, amount: u128) -> Result<(), TransferError>;
}

#[derive(Debug, Default)]
struct Book {
    reserve: u128,
    balances: HashMap<AccountId, u128>,
}

/// In-memory balance book: a vault reserve plus per-account wallets.
///
/// Deposits move value from a wallet into the reserve; payouts move it back.
#[derive(Debug, Default)]
pub struct NativeTreasury {
    book: Mutex<Book>,
}

impl NativeTreasury {
    /// Create a treasury with an empty reserve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `account`'s wallet.
    pub fn fund(&self, account: &AccountId, amount: u128) -> Result<(), TransferError> {
        let mut book = self.book.lock();
        let balance = book.balances.entry(*account).or_default();
        *balance = balance.checked_add(amount).ok_or_else(|| overflow(account))?;
        Ok(())
    }

    /// Move `amount` from `account`'s wallet into the reserve.
    pub fn collect(&self, account: &AccountId, amount: u128) -> Result<(), TransferError> {
        let mut book = self.book.lock();
        let available = book.balances.get(account).copied().unwrap_or(0);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                requested: amount,
                available,
            });
        }
        let reserve = book.reserve.checked_add(amount).ok_or_else(|| overflow(account))?;
        book.reserve = reserve;
        book.balances.insert(*account, available - amount);
        Ok(())
    }

    /// Value held by the vault.
    pub fn reserve(&self) -> u128 {
        self.book.lock().reserve
    }

    /// Wallet balance of `account`.
    pub fn balance_of(&self, account: &AccountId) -> u128 {
        self.book.lock().balances.get(account).copied().unwrap_or(0)
    }
}

impl TransferExecutor for NativeTreasury {
    fn transfer(&self, to: &AccountId, amount: u128) -> Result<(), TransferError> {
        let mut book = self.book.lock();
        if book.reserve < amount {
            return Err(TransferError::InsufficientFunds {
                requested: amount,
                available: book.reserve,
            });
        }
        let current = book.balances.get(to).copied().unwrap_or(0);
        let credited = current.checked_add(amount).ok_or_else(|| overflow(to))?;
        book.reserve -= amount;
        book.balances.insert(*to, credited);
        Ok(())
    }
}

fn overflow(account: &AccountId) -> TransferError {
    TransferError::Rejected {
        account: *account,
        reason: "balance overflow".to_string(),
    }
}
