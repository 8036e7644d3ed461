//! # Sealed Gateway
//!
//! Production backend. Each deposit is sealed to the decryption authority's
//! x25519 public key (see `cvault_crypto::sealing`), and the handle is the
//! SHA-256 digest of the canonical envelope document. The gateway stores
//! envelopes and access state but cannot open anything: only a
//! [`SealedDecryptor`] holding the authority's secret key can.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use cvault_core::{sha256_digest, AccountId, CanonicalBytes, CryptoError, EncryptedHandle};
use cvault_crypto::{seal, SealedEnvelope, SealingPublicKey, SealingSecretKey};

use crate::access::AccessControl;
use crate::traits::{Decryptor, EncryptionGateway, GatewayError};

#[derive(Serialize)]
struct EnvelopeDocument<'a> {
    backend: &'a str,
    recipient: &'a SealingPublicKey,
    envelope: &'a SealedEnvelope,
}

/// Gateway that seals values to a fixed authority key.
#[derive(Debug)]
pub struct SealedGateway {
    recipient: SealingPublicKey,
    envelopes: RwLock<HashMap<EncryptedHandle, SealedEnvelope>>,
    access: AccessControl,
}

impl SealedGateway {
    /// Create a gateway sealing to `recipient`.
    pub fn new(recipient: SealingPublicKey) -> Self {
        Self {
            recipient,
            envelopes: RwLock::new(HashMap::new()),
            access: AccessControl::new(),
        }
    }

    /// The authority key values are sealed to.
    pub fn recipient(&self) -> &SealingPublicKey {
        &self.recipient
    }

    /// The stored envelope behind `handle`.
    pub fn envelope(&self, handle: &EncryptedHandle) -> Option<SealedEnvelope> {
        self.envelopes.read().get(handle).cloned()
    }
}

impl EncryptionGateway for SealedGateway {
    fn encrypt(&self, clear: u128) -> Result<EncryptedHandle, GatewayError> {
        let envelope = seal(&self.recipient, clear)?;
        let document = EnvelopeDocument {
            backend: "sealed",
            recipient: &self.recipient,
            envelope: &envelope,
        };
        let canonical = CanonicalBytes::new(&document).map_err(CryptoError::from)?;
        let handle = EncryptedHandle::from(sha256_digest(&canonical));
        if handle.is_zero() {
            return Err(GatewayError::ZeroHandle);
        }
        self.envelopes.write().insert(handle, envelope);
        self.access.register(handle);
        tracing::debug!(%handle, "sealed value registered");
        Ok(handle)
    }

    fn grant_access(
        &self,
        handle: &EncryptedHandle,
        principal: &AccountId,
    ) -> Result<(), GatewayError> {
        self.access.grant(handle, principal)
    }

    fn mark_publicly_decryptable(&self, handle: &EncryptedHandle) -> Result<(), GatewayError> {
        self.access.mark_public(handle)
    }

    fn has_access(&self, handle: &EncryptedHandle, principal: &AccountId) -> bool {
        self.access.has_access(handle, principal)
    }

    fn is_publicly_decryptable(&self, handle: &EncryptedHandle) -> bool {
        self.access.is_public(handle)
    }
}

/// Opens envelopes stored in a [`SealedGateway`].
#[derive(Debug)]
pub struct SealedDecryptor {
    gateway: Arc<SealedGateway>,
    key: SealingSecretKey,
}

impl SealedDecryptor {
    /// Pair a gateway with the authority secret key.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Crypto`] if `key` does not match the
    /// gateway's recipient key.
    pub fn new(gateway: Arc<SealedGateway>, key: SealingSecretKey) -> Result<Self, GatewayError> {
        if &key.public_key() != gateway.recipient() {
            return Err(GatewayError::Crypto(CryptoError::KeyError(
                "secret key does not match the gateway recipient".to_string(),
            )));
        }
        Ok(Self { gateway, key })
    }
}

impl Decryptor for SealedDecryptor {
    fn gateway(&self) -> &dyn EncryptionGateway {
        self.gateway.as_ref()
    }

    fn decrypt(&self, handle: &EncryptedHandle) -> Result<u128, GatewayError> {
        let envelope = self
            .gateway
            .envelope(handle)
            .ok_or(GatewayError::UnknownHandle(*handle))?;
        Ok(self.key.open(&envelope)?)
    }
}
