//! # Gateway Traits
//!
//! The capability set the vault consumes from its encryption backend, and
//! the decryption capability the authority consumes.
//!
//! ## Security Invariant
//!
//! `mark_publicly_decryptable` is monotone: once a handle is public it stays
//! public. There is no revocation method on the trait.

use thiserror::Error;

use cvault_core::{AccountId, CryptoError, EncryptedHandle};

/// Errors raised by an encryption backend.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The handle is not known to this backend.
    #[error("unknown handle {0}")]
    UnknownHandle(EncryptedHandle),

    /// The backend produced the all-zero handle, which is reserved as the
    /// "no stake" sentinel.
    #[error("backend produced the reserved zero handle")]
    ZeroHandle,

    /// The principal has no decryption access to the handle.
    #[error("{principal} has no access to handle {handle}")]
    AccessDenied {
        /// The handle requested.
        handle: EncryptedHandle,
        /// The principal that asked.
        principal: AccountId,
    },

    /// The handle has not been marked publicly decryptable.
    #[error("handle {0} is not publicly decryptable")]
    NotPubliclyDecryptable(EncryptedHandle),

    /// The backend is temporarily unable to serve requests.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// A cryptographic operation inside the backend failed.
    #[error("cryptographic failure: {0}")]
    Crypto(#[from] CryptoError),
}

/// Encryption backend consumed by the vault.
pub trait EncryptionGateway: Send + Sync {
    /// Encrypt `clear` and return a fresh handle.
    ///
    /// The caller is the implicit owner; no principal has access until
    /// [`grant_access`](Self::grant_access) is called.
    fn encrypt(&self, clear: u128) -> Result<EncryptedHandle, GatewayError>;

    /// Grant `principal` the capability to decrypt `handle`.
    fn grant_access(
        &self,
        handle: &EncryptedHandle,
        principal: &AccountId,
    ) -> Result<(), GatewayError>;

    /// Irreversibly allow anyone holding a valid proof to learn the
    /// cleartext behind `handle`.
    fn mark_publicly_decryptable(&self, handle: &EncryptedHandle) -> Result<(), GatewayError>;

    /// Whether `principal` may decrypt `handle`.
    fn has_access(&self, handle: &EncryptedHandle, principal: &AccountId) -> bool;

    /// Whether `handle` has been marked publicly decryptable.
    fn is_publicly_decryptable(&self, handle: &EncryptedHandle) -> bool;

    /// Canonical byte serialization of a handle.
    fn to_canonical_bytes(&self, handle: &EncryptedHandle) -> [u8; 32] {
        handle.to_bytes()
    }
}

/// Decryption capability held by the decryption authority.
///
/// The vault is handed an [`EncryptionGateway`], never a decryptor.
pub trait Decryptor: Send + Sync {
    /// The gateway whose handles this decryptor can open.
    fn gateway(&self) -> &dyn EncryptionGateway;

    /// Recover the cleartext behind `handle`. Performs no access checks;
    /// callers decide who may see the result.
    fn decrypt(&self, handle: &EncryptedHandle) -> Result<u128, GatewayError>;
}
