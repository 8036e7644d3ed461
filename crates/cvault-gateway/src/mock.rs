//! # Mock Gateway
//!
//! A deterministic, transparent gateway for tests and local simulation.
//! Cleartexts are kept in memory; handles are content digests of
//! `{backend, sequence, value}` so two runs that perform the same
//! operations in the same order produce identical handles.
//!
//! ## Security Notice
//!
//! Nothing is encrypted. Use [`SealedGateway`](crate::SealedGateway) for
//! anything that leaves the test harness.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;

use cvault_core::{sha256_digest, AccountId, CanonicalBytes, CryptoError, EncryptedHandle};

use crate::access::AccessControl;
use crate::traits::{Decryptor, EncryptionGateway, GatewayError};

#[derive(Serialize)]
struct HandlePreimage<'a> {
    backend: &'a str,
    sequence: u64,
    value: String,
}

/// In-memory gateway with deterministic handles.
#[derive(Debug, Default)]
pub struct MockGateway {
    sequence: AtomicU64,
    values: RwLock<HashMap<EncryptedHandle, u128>>,
    access: AccessControl,
    unavailable: AtomicBool,
}

impl MockGateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every mutating call fail with [`GatewayError::Unavailable`]
    /// until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of values encrypted so far.
    pub fn issued(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> Result<(), GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("mock gateway switched off".to_string()));
        }
        Ok(())
    }
}

impl EncryptionGateway for MockGateway {
    fn encrypt(&self, clear: u128) -> Result<EncryptedHandle, GatewayError> {
        self.ensure_available()?;
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let preimage = HandlePreimage {
            backend: "mock",
            sequence,
            value: clear.to_string(),
        };
        let canonical = CanonicalBytes::new(&preimage).map_err(CryptoError::from)?;
        let handle = EncryptedHandle::from(sha256_digest(&canonical));
        if handle.is_zero() {
            return Err(GatewayError::ZeroHandle);
        }
        self.values.write().insert(handle, clear);
        self.access.register(handle);
        Ok(handle)
    }

    fn grant_access(
        &self,
        handle: &EncryptedHandle,
        principal: &AccountId,
    ) -> Result<(), GatewayError> {
        self.ensure_available()?;
        self.access.grant(handle, principal)
    }

    fn mark_publicly_decryptable(&self, handle: &EncryptedHandle) -> Result<(), GatewayError> {
        self.ensure_available()?;
        self.access.mark_public(handle)
    }

    fn has_access(&self, handle: &EncryptedHandle, principal: &AccountId) -> bool {
        self.access.has_access(handle, principal)
    }

    fn is_publicly_decryptable(&self, handle: &EncryptedHandle) -> bool {
        self.access.is_public(handle)
    }
}

impl Decryptor for MockGateway {
    fn gateway(&self) -> &dyn EncryptionGateway {
        self
    }

    fn decrypt(&self, handle: &EncryptedHandle) -> Result<u128, GatewayError> {
        self.values
            .read()
            .get(handle)
            .copied()
            .ok_or(GatewayError::UnknownHandle(*handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_deterministic_per_sequence() {
        let a = MockGateway::new();
        let b = MockGateway::new();
        assert_eq!(a.encrypt(5).unwrap(), b.encrypt(5).unwrap());
        // Same value, next sequence number: different handle.
        assert_ne!(a.encrypt(5).unwrap(), b.encrypt(6).unwrap());
        assert_eq!(a.issued(), 2);
    }

    #[test]
    fn decrypt_returns_cleartext() {
        let gw = MockGateway::new();
        let h = gw.encrypt(1_500).unwrap();
        assert_eq!(gw.decrypt(&h).unwrap(), 1_500);
        assert!(!h.is_zero());
    }

    #[test]
    fn decrypt_unknown_handle_fails() {
        let gw = MockGateway::new();
        assert!(matches!(
            gw.decrypt(&EncryptedHandle::from_bytes([7; 32])),
            Err(GatewayError::UnknownHandle(_))
        ));
    }

    #[test]
    fn unavailable_gateway_rejects_mutations() {
        let gw = MockGateway::new();
        let h = gw.encrypt(1).unwrap();
        gw.set_unavailable(true);
        assert!(matches!(gw.encrypt(2), Err(GatewayError::Unavailable(_))));
        assert!(gw.mark_publicly_decryptable(&h).is_err());
        assert!(!gw.is_publicly_decryptable(&h));
        gw.set_unavailable(false);
        gw.mark_publicly_decryptable(&h).unwrap();
        assert!(gw.is_publicly_decryptable(&h));
    }

    #[test]
    fn access_is_per_principal() {
        let gw = MockGateway::new();
        let h = gw.encrypt(10).unwrap();
        let alice = AccountId::from_bytes([1; 20]);
        let bob = AccountId::from_bytes([2; 20]);
        gw.grant_access(&h, &alice).unwrap();
        assert!(gw.has_access(&h, &alice));
        assert!(!gw.has_access(&h, &bob));
    }
}
