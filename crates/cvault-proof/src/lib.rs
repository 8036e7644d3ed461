#![deny(missing_docs)]

//! # cvault-proof: Public Decryption Proofs
//!
//! When a stake unlocks, its handle is marked publicly decryptable. A trust
//! authority then publishes the cleartext together with a proof. The vault
//! releases funds only after a [`ProofVerifier`] accepts that proof for
//! exactly the handle it holds.
//!
//! ## Architecture
//!
//! - **Traits** (`traits.rs`): `ProofVerifier` and `VerifyError`.
//! - **Attestation** (`attestation.rs`): the signed document and the
//!   32-byte-word cleartext encoding.
//! - **Proof** (`proof.rs`): `[n][n × signature][extra]` wire format.
//! - **Threshold** (`threshold.rs`): k-of-n Ed25519 verifier.
//! - **Oracle** (`oracle.rs`): `DecryptionOracle`, the authority that
//!   issues proofs from a `Decryptor`.
//!
//! ## Crate Policy
//!
//! - Verifiers fail closed.
//! - Signatures cover only `CanonicalBytes` attestations.

pub mod attestation;
pub mod oracle;
pub mod proof;
pub mod threshold;
pub mod traits;

pub use attestation::{
    attestation_bytes, decode_cleartexts, encode_cleartexts, ATTESTATION_DOMAIN,
    CLEARTEXT_WORD_LEN,
};
pub use oracle::{DecryptionOracle, OracleError, PublicDecryption};
pub use proof::DecryptionProof;
pub use threshold::ThresholdSignatureVerifier;
pub use traits::{ProofVerifier, VerifyError};
