//! # Decryption Oracle
//!
//! The trust authority side of public decryption. It opens handles through
//! a [`Decryptor`], encodes the cleartexts, and signs the attestation with
//! every authority key it holds. The resulting `(cleartexts, proof)` pair is
//! what a caller hands to the vault's finalize operation.

use std::sync::Arc;

use thiserror::Error;

use cvault_core::{AccountId, CanonicalizationError, EncryptedHandle};
use cvault_crypto::{Ed25519KeyPair, Ed25519PublicKey};
use cvault_gateway::{Decryptor, GatewayError};

use crate::attestation::{attestation_bytes, encode_cleartexts};
use crate::proof::DecryptionProof;
use crate::threshold::ThresholdSignatureVerifier;
use crate::traits::VerifyError;

/// Errors raised while issuing a decryption.
#[derive(Error, Debug)]
pub enum OracleError {
    /// No handles requested.
    #[error("empty handle set")]
    EmptyHandleSet,

    /// The gateway refused or failed.
    #[error("gateway: {0}")]
    Gateway(#[from] GatewayError),

    /// The attestation could not be built.
    #[error("attestation: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The proof could not be encoded.
    #[error("proof encoding: {0}")]
    Proof(#[from] VerifyError),
}

/// A published decryption: the cleartext encoding and its proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicDecryption {
    /// Handles the decryption covers, in order.
    pub handles: Vec<EncryptedHandle>,
    /// Decrypted values, in handle order.
    pub values: Vec<u128>,
    /// One 32-byte big-endian word per handle.
    pub cleartexts: Vec<u8>,
    /// Wire-format proof over `(handles, cleartexts)`.
    pub proof: Vec<u8>,
}

/// Issues signed public decryptions.
pub struct DecryptionOracle {
    decryptor: Arc<dyn Decryptor>,
    signers: Vec<Ed25519KeyPair>,
}

impl std::fmt::Debug for DecryptionOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptionOracle")
            .field("signers", &self.signers.len())
            .finish_non_exhaustive()
    }
}

impl DecryptionOracle {
    /// Create an oracle signing with `signers`.
    pub fn new(decryptor: Arc<dyn Decryptor>, signers: Vec<Ed25519KeyPair>) -> Self {
        Self { decryptor, signers }
    }

    /// Public keys of the authority signers.
    pub fn signer_keys(&self) -> Vec<Ed25519PublicKey> {
        self.signers.iter().map(Ed25519KeyPair::public_key).collect()
    }

    /// A verifier trusting this oracle's signers with the given threshold.
    pub fn verifier(&self, threshold: usize) -> Result<ThresholdSignatureVerifier, VerifyError> {
        ThresholdSignatureVerifier::new(self.signer_keys(), threshold)
    }

    /// Decrypt publicly decryptable handles and sign the result.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NotPubliclyDecryptable`] (wrapped) for any handle not
    /// yet released, and any gateway failure while decrypting.
    pub fn public_decrypt(
        &self,
        handles: &[EncryptedHandle],
    ) -> Result<PublicDecryption, OracleError> {
        if handles.is_empty() {
            return Err(OracleError::EmptyHandleSet);
        }
        let gateway = self.decryptor.gateway();
        let mut values = Vec::with_capacity(handles.len());
        for handle in handles {
            if !gateway.is_publicly_decryptable(handle) {
                return Err(GatewayError::NotPubliclyDecryptable(*handle).into());
            }
            values.push(self.decryptor.decrypt(handle)?);
        }

        let cleartexts = encode_cleartexts(&values);
        let message = attestation_bytes(handles, &cleartexts)?;
        let proof = DecryptionProof::new(self.signers.iter().map(|k| k.sign(&message)).collect())
            .encode()?;

        tracing::debug!(handles = handles.len(), signers = self.signers.len(), "public decryption issued");
        Ok(PublicDecryption {
            handles: handles.to_vec(),
            values,
            cleartexts,
            proof,
        })
    }

    /// Decrypt `handle` for `principal`, who must hold an access grant.
    pub fn user_decrypt(
        &self,
        handle: &EncryptedHandle,
        principal: &AccountId,
    ) -> Result<u128, OracleError> {
        if !self.decryptor.gateway().has_access(handle, principal) {
            return Err(GatewayError::AccessDenied {
                handle: *handle,
                principal: *principal,
            }
            .into());
        }
        Ok(self.decryptor.decrypt(handle)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ProofVerifier;
    use cvault_gateway::{EncryptionGateway, MockGateway};

    fn oracle(gw: Arc<MockGateway>, signers: u8) -> DecryptionOracle {
        let keys = (1..=signers).map(|i| Ed25519KeyPair::from_seed(&[i; 32])).collect();
        DecryptionOracle::new(gw, keys)
    }

    #[test]
    fn refuses_unreleased_handle() {
        let gw = Arc::new(MockGateway::new());
        let h = gw.encrypt(9).unwrap();
        let result = oracle(Arc::clone(&gw), 1).public_decrypt(&[h]);
        assert!(matches!(
            result,
            Err(OracleError::Gateway(GatewayError::NotPubliclyDecryptable(_)))
        ));
    }

    #[test]
    fn issued_proof_verifies() {
        let gw = Arc::new(MockGateway::new());
        let h = gw.encrypt(1_500).unwrap();
        gw.mark_publicly_decryptable(&h).unwrap();
        let oracle = oracle(Arc::clone(&gw), 3);
        let decryption = oracle.public_decrypt(&[h]).unwrap();
        assert_eq!(decryption.values, vec![1_500]);
        oracle
            .verifier(3)
            .unwrap()
            .verify(&[h], &decryption.cleartexts, &decryption.proof)
            .unwrap();
    }

    #[test]
    fn user_decrypt_checks_grant() {
        let gw = Arc::new(MockGateway::new());
        let h = gw.encrypt(77).unwrap();
        let alice = AccountId::from_bytes([0xa1; 20]);
        let oracle = oracle(Arc::clone(&gw), 1);
        assert!(matches!(
            oracle.user_decrypt(&h, &alice),
            Err(OracleError::Gateway(GatewayError::AccessDenied { .. }))
        ));
        gw.grant_access(&h, &alice).unwrap();
        assert_eq!(oracle.user_decrypt(&h, &alice).unwrap(), 77);
    }

    #[test]
    fn empty_request_rejected() {
        let gw = Arc::new(MockGateway::new());
        assert!(matches!(
            oracle(gw, 1).public_decrypt(&[]),
            Err(OracleError::EmptyHandleSet)
        ));
    }
}
