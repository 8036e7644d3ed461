#![deny(missing_docs)]

//! # cvault-state: Stake Lifecycle State Machine
//!
//! The vault itself. Accounts stake native value under an encrypted handle,
//! wait out a lock, request withdrawal (which releases the handle for
//! public decryption), and finalize with a proof of the cleartext amount.
//!
//! ## Architecture
//!
//! - **Ledger** (`ledger.rs`): `AccountLedger`, at most one `StakeRecord`
//!   per account, journaled for rollback.
//! - **Vault** (`vault.rs`): `Vault`, the transactional operations and
//!   read model.
//! - **Transfer** (`transfer.rs`): `TransferExecutor` and the in-memory
//!   `NativeTreasury`.
//! - **Events** (`events.rs`): `VaultEvent`.
//! - **Config** (`config.rs`): `VaultConfig`, protocol constants.
//! - **Error** (`error.rs`): `VaultError` and its `ErrorClass`.
//!
//! ## Crate Policy
//!
//! - Collaborators are injected as `Arc<dyn Trait>`; the vault never
//!   constructs its own gateway, verifier, executor or clock.
//! - Every mutating operation either commits fully or has no effect on the
//!   ledger and event journal.

pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod transfer;
pub mod vault;

pub use config::{
    ConfigError, VaultConfig, DEFAULT_VAULT_PRINCIPAL, MAX_ENCRYPTED_AMOUNT_BITS,
    MAX_LOCK_DURATION, MIN_LOCK_DURATION,
};
pub use error::{ErrorClass, VaultError};
pub use events::VaultEvent;
pub use ledger::{AccountLedger, Checkpoint, StakeRecord};
pub use transfer::{NativeTreasury, TransferError, TransferExecutor};
pub use vault::{StakeSummary, Vault};
