#![deny(missing_docs)]

//! # cvault-core: Foundational Types for the Confidential Vault
//!
//! Every other crate in the workspace depends on `cvault-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `AccountId`,
//!    `EncryptedHandle` and `NativeAmount` are newtypes with validated
//!    constructors. No bare byte arrays cross crate boundaries.
//!
//! 2. **`CanonicalBytes` newtype.** Every signed or hashed document flows
//!    through `CanonicalBytes::new()` (RFC 8785 JSON). Signers and verifiers
//!    therefore always agree on the byte sequence.
//!
//! 3. **Seconds-precision UTC time behind a `Clock`.** The vault never reads
//!    the wall clock directly, so lock periods are testable without sleeping.
//!
//! 4. **The zero handle is a sentinel.** `EncryptedHandle::ZERO` means "no
//!    stake" and is never a valid reference to an encrypted value.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cvault-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod handle;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use amount::{NativeAmount, NATIVE_DECIMALS};
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, CryptoError, ParseError};
pub use handle::EncryptedHandle;
pub use identity::AccountId;
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
