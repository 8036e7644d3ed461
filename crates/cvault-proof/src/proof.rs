//! # Decryption Proof Wire Format
//!
//! ```text
//! [n: u8][n × 64-byte Ed25519 signature][extra data …]
//! ```
//!
//! The extra data is opaque to verification; authorities may use it for
//! their own bookkeeping. It is not covered by the signatures.

use cvault_crypto::Ed25519Signature;

use crate::traits::VerifyError;

/// A decoded proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionProof {
    /// Signer signatures over the attestation, at most 255.
    pub signatures: Vec<Ed25519Signature>,
    /// Trailing bytes after the signatures.
    pub extra_data: Vec<u8>,
}

impl DecryptionProof {
    /// Wrap signatures with no extra data.
    pub fn new(signatures: Vec<Ed25519Signature>) -> Self {
        Self {
            signatures,
            extra_data: Vec::new(),
        }
    }

    /// Serialize to wire bytes.
    ///
    /// # Errors
    ///
    /// [`VerifyError::MalformedProof`] if there are more than 255 signatures.
    pub fn encode(&self) -> Result<Vec<u8>, VerifyError> {
        let count = u8::try_from(self.signatures.len()).map_err(|_| {
            VerifyError::MalformedProof(format!(
                "{} signatures exceed the 255 limit",
                self.signatures.len()
            ))
        })?;
        let mut out =
            Vec::with_capacity(1 + self.signatures.len() * Ed25519Signature::LEN + self.extra_data.len());
        out.push(count);
        for sig in &self.signatures {
            out.extend_from_slice(sig.as_bytes());
        }
        out.extend_from_slice(&self.extra_data);
        Ok(out)
    }

    /// Parse wire bytes.
    ///
    /// # Errors
    ///
    /// [`VerifyError::MalformedProof`] if the input is empty or shorter than
    /// its declared signature count.
    pub fn decode(bytes: &[u8]) -> Result<Self, VerifyError> {
        let (&count, rest) = bytes
            .split_first()
            .ok_or_else(|| VerifyError::MalformedProof("empty proof".to_string()))?;
        let sig_bytes = usize::from(count) * Ed25519Signature::LEN;
        if rest.len() < sig_bytes {
            return Err(VerifyError::MalformedProof(format!(
                "declares {count} signatures but carries {} bytes",
                rest.len()
            )));
        }
        let (sigs, extra) = rest.split_at(sig_bytes);
        let signatures = sigs
            .chunks_exact(Ed25519Signature::LEN)
            .map(|chunk| {
                Ed25519Signature::from_slice(chunk)
                    .map_err(|e| VerifyError::MalformedProof(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            signatures,
            extra_data: extra.to_vec(),
        })
    }
}
