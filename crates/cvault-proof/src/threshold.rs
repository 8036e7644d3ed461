//! # Threshold Signature Verifier
//!
//! Accepts a proof when at least `threshold` distinct trusted signers signed
//! the attestation for the declared handles and cleartexts.
//!
//! ## Security Invariant
//!
//! Verification fails closed. An unparseable proof, an empty handle set, a
//! cleartext encoding of the wrong width, a signature from outside the
//! trusted set, or the same signer counted twice all reject the whole proof.

use std::collections::HashSet;

use cvault_core::EncryptedHandle;
use cvault_crypto::{verify_with_public_key, Ed25519PublicKey};

use crate::attestation::{attestation_bytes, CLEARTEXT_WORD_LEN};
use crate::proof::DecryptionProof;
use crate::traits::{ProofVerifier, VerifyError};

/// Ed25519 k-of-n verifier over a fixed trusted signer set.
#[derive(Debug, Clone)]
pub struct ThresholdSignatureVerifier {
    signers: Vec<Ed25519PublicKey>,
    threshold: usize,
}

impl ThresholdSignatureVerifier {
    /// Build a verifier.
    ///
    /// # Errors
    ///
    /// [`VerifyError::InvalidConfiguration`] when the signer set is empty or
    /// contains duplicates, or when `threshold` is zero or exceeds the
    /// number of signers.
    pub fn new(signers: Vec<Ed25519PublicKey>, threshold: usize) -> Result<Self, VerifyError> {
        if signers.is_empty() {
            return Err(VerifyError::InvalidConfiguration(
                "no trusted signers".to_string(),
            ));
        }
        let distinct: HashSet<_> = signers.iter().collect();
        if distinct.len() != signers.len() {
            return Err(VerifyError::InvalidConfiguration(
                "duplicate trusted signer".to_string(),
            ));
        }
        if threshold == 0 || threshold > signers.len() {
            return Err(VerifyError::InvalidConfiguration(format!(
                "threshold {threshold} outside 1..={}",
                signers.len()
            )));
        }
        Ok(Self { signers, threshold })
    }

    /// The trusted signer set.
    pub fn signers(&self) -> &[Ed25519PublicKey] {
        &self.signers
    }

    /// Minimum number of distinct signatures.
    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl ProofVerifier for ThresholdSignatureVerifier {
    fn verify(
        &self,
        handles: &[EncryptedHandle],
        cleartexts: &[u8],
        proof: &[u8],
    ) -> Result<(), VerifyError> {
        if handles.is_empty() {
            return Err(VerifyError::EmptyHandleSet);
        }
        let expected = handles.len() * CLEARTEXT_WORD_LEN;
        if cleartexts.len() != expected {
            return Err(VerifyError::CleartextLength {
                expected,
                actual: cleartexts.len(),
            });
        }

        let proof = DecryptionProof::decode(proof)?;
        let message = attestation_bytes(handles, cleartexts)?;

        let mut seen: HashSet<usize> = HashSet::new();
        for (index, signature) in proof.signatures.iter().enumerate() {
            let signer = self
                .signers
                .iter()
                .position(|key| verify_with_public_key(&message, signature, key).is_ok())
                .ok_or(VerifyError::UnknownSigner { index })?;
            if !seen.insert(signer) {
                return Err(VerifyError::DuplicateSigner { index });
            }
        }

        if seen.len() < self.threshold {
            return Err(VerifyError::InsufficientSignatures {
                valid: seen.len(),
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}
