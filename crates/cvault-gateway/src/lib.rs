#![deny(missing_docs)]

//! # cvault-gateway: Encryption Gateway Boundary
//!
//! The vault never sees cleartext balances. It asks an [`EncryptionGateway`]
//! to encrypt a deposit and gets back an opaque [`EncryptedHandle`]; later it
//! asks the gateway to mark that handle publicly decryptable. Decryption
//! itself happens outside the vault, through a [`Decryptor`] held by the
//! decryption authority.
//!
//! ## Architecture
//!
//! - **Traits** (`traits.rs`): `EncryptionGateway` (encrypt, grant access,
//!   mark publicly decryptable, canonical bytes) and `Decryptor`.
//! - **Access** (`access.rs`): the per-handle access list and the monotone
//!   public-decryption set shared by both backends.
//! - **Mock** (`mock.rs`): `MockGateway`, deterministic handles and
//!   in-memory cleartexts. Behind the default `mock` feature.
//! - **Sealed** (`sealed.rs`): `SealedGateway`, values sealed to the
//!   authority's x25519 key; `SealedDecryptor` opens them.
//!
//! ## Crate Policy
//!
//! - Depends on `cvault-core` and `cvault-crypto` internally.
//! - Gateways are `Send + Sync`; interior state sits behind `parking_lot`
//!   locks that are never held across calls into other components.
//!
//! [`EncryptedHandle`]: cvault_core::EncryptedHandle

pub mod access;
#[cfg(feature = "mock")]
pub mod mock;
pub mod sealed;
pub mod traits;

pub use access::AccessControl;
#[cfg(feature = "mock")]
pub use mock::MockGateway;
pub use sealed::{SealedDecryptor, SealedGateway};
pub use traits::{Decryptor, EncryptionGateway, GatewayError};
