#![deny(missing_docs)]

//! # cvault-crypto: Cryptographic Primitives
//!
//! - **Ed25519** signing and verification. The decryption authority signs
//!   `CanonicalBytes` attestations binding handles to cleartexts; the vault's
//!   proof verifier checks them.
//! - **Sealing**: a 128-bit cleartext is sealed to the authority's x25519
//!   public key (ephemeral Diffie-Hellman, SHA-256 key derivation,
//!   AES-256-GCM). Only the holder of the matching secret can open it.
//!
//! ## Crate Policy
//!
//! - Depends only on `cvault-core` internally.
//! - Private key material is never serialized or logged; secret types have
//!   redacting `Debug` impls and zeroize on drop.
//! - Tests use real keys and real ciphers, never mocks.

pub mod ed25519;
pub mod sealing;

pub use ed25519::{
    verify, verify_with_public_key, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature,
};
pub use sealing::{seal, SealedEnvelope, SealingPublicKey, SealingSecretKey};
