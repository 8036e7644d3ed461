//! # Proof Verifier Trait
//!
//! The vault hands a verifier the handle set it expects, the claimed
//! cleartext encoding, and the opaque proof bytes. The verifier either
//! accepts all three together or rejects them.

use thiserror::Error;

use cvault_core::{CanonicalizationError, EncryptedHandle};

/// Error during proof verification.
///
/// Every variant means "do not release funds". The vault collapses them all
/// into a single integrity failure; the detail is kept for logs.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The proof bytes do not follow the wire format.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// No handles were supplied.
    #[error("empty handle set")]
    EmptyHandleSet,

    /// The cleartext encoding does not hold one 32-byte word per handle.
    #[error("cleartext encoding is {actual} bytes, expected {expected} for the handle set")]
    CleartextLength {
        /// Expected length in bytes.
        expected: usize,
        /// Length received.
        actual: usize,
    },

    /// A cleartext word exceeds the 128-bit value range.
    #[error("cleartext word {index} exceeds 128 bits")]
    CleartextOutOfRange {
        /// Position of the offending word.
        index: usize,
    },

    /// A signature does not verify under any trusted signer.
    #[error("signature {index} is not from a trusted signer")]
    UnknownSigner {
        /// Position of the offending signature in the proof.
        index: usize,
    },

    /// Two signatures in the proof come from the same signer.
    #[error("signature {index} repeats an earlier signer")]
    DuplicateSigner {
        /// Position of the repeated signature in the proof.
        index: usize,
    },

    /// Fewer distinct trusted signatures than the threshold.
    #[error("{valid} valid signatures, threshold is {threshold}")]
    InsufficientSignatures {
        /// Distinct trusted signatures found.
        valid: usize,
        /// Required count.
        threshold: usize,
    },

    /// The verifier was constructed with an unusable signer set.
    #[error("invalid verifier configuration: {0}")]
    InvalidConfiguration(String),

    /// The attestation could not be canonicalized.
    #[error("attestation canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Checks that a trust authority attested `cleartexts` as the decryption of
/// exactly `handles`.
pub trait ProofVerifier: Send + Sync {
    /// Accept or reject the proof.
    ///
    /// # Errors
    ///
    /// Any [`VerifyError`]. Implementations fail closed: a proof that cannot
    /// be fully checked is rejected.
    fn verify(
        &self,
        handles: &[EncryptedHandle],
        cleartexts: &[u8],
        proof: &[u8],
    ) -> Result<(), VerifyError>;
}
