//! # Sealed Envelopes
//!
//! Seals a 128-bit cleartext to the decryption authority's x25519 public
//! key. Each envelope uses a fresh ephemeral key:
//!
//! ```text
//! shared = X25519(ephemeral_secret, authority_public)
//! key    = SHA-256("cvault/seal/v1" || shared || ephemeral_public || authority_public)
//! body   = AES-256-GCM(key, nonce = 0^96, aad = ephemeral_public, be128(value))
//! ```
//!
//! The derived key is used for exactly one message, so the fixed nonce is
//! never reused under the same key.
//!
//! ## Security Invariant
//!
//! Non-contributory Diffie-Hellman results (low-order points) are rejected
//! on both seal and open. `SealingSecretKey` never serializes and zeroizes
//! on drop.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use cvault_core::CryptoError;

const KDF_DOMAIN: &[u8] = b"cvault/seal/v1";
const NONCE: [u8; 12] = [0u8; 12];

/// The authority's x25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SealingPublicKey(pub [u8; 32]);

/// The authority's x25519 secret key.
pub struct SealingSecretKey {
    secret: StaticSecret,
}

/// A sealed 128-bit value: ephemeral public key plus AES-GCM ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEnvelope {
    /// Ephemeral x25519 public key used for this envelope.
    #[serde(with = "hex::serde")]
    pub ephemeral_public: [u8; 32],
    /// AES-256-GCM ciphertext with appended tag.
    #[serde(with = "hex::serde")]
    pub ciphertext: Vec<u8>,
}

impl SealingPublicKey {
    /// Render as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let mut arr = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut arr)
            .map_err(|e| CryptoError::KeyError(format!("invalid sealing key hex: {e}")))?;
        Ok(Self(arr))
    }
}

impl std::fmt::Debug for SealingPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SealingPublicKey({}...)", hex::encode(&self.0[..4]))
    }
}

impl Serialize for SealingPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SealingPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl SealingSecretKey {
    /// Generate a fresh secret key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            secret: StaticSecret::random_from_rng(rand::rngs::OsRng),
        }
    }

    /// Restore a secret key from its 32 bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            secret: StaticSecret::from(bytes),
        }
    }

    /// Parse a secret key from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(s.trim(), &mut bytes[..])
            .map_err(|e| CryptoError::KeyError(format!("invalid sealing secret hex: {e}")))?;
        Ok(Self::from_bytes(*bytes))
    }

    /// Export the secret as hex, for writing key files.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.secret.to_bytes()))
    }

    /// The matching public key.
    pub fn public_key(&self) -> SealingPublicKey {
        SealingPublicKey(PublicKey::from(&self.secret).to_bytes())
    }

    /// Open an envelope sealed to this key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EnvelopeError`] if the key agreement is
    /// non-contributory, the tag does not authenticate, or the plaintext is
    /// not a 16-byte big-endian integer.
    pub fn open(&self, envelope: &SealedEnvelope) -> Result<u128, CryptoError> {
        let ephemeral = PublicKey::from(envelope.ephemeral_public);
        let shared = self.secret.diffie_hellman(&ephemeral);
        if !shared.was_contributory() {
            return Err(CryptoError::EnvelopeError(
                "non-contributory key agreement".to_string(),
            ));
        }
        let cipher = derive_cipher(
            shared.as_bytes(),
            &envelope.ephemeral_public,
            &self.public_key().0,
        )?;
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(
                    Nonce::from_slice(&NONCE),
                    Payload {
                        msg: &envelope.ciphertext,
                        aad: &envelope.ephemeral_public,
                    },
                )
                .map_err(|_| CryptoError::EnvelopeError("authentication failed".to_string()))?,
        );
        let bytes: [u8; 16] = plaintext.as_slice().try_into().map_err(|_| {
            CryptoError::EnvelopeError(format!(
                "sealed value must be 16 bytes, got {}",
                plaintext.len()
            ))
        })?;
        Ok(u128::from_be_bytes(bytes))
    }
}

impl std::fmt::Debug for SealingSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SealingSecretKey(<private>)")
    }
}

/// Seal a 128-bit value to `recipient`.
pub fn seal(recipient: &SealingPublicKey, value: u128) -> Result<SealedEnvelope, CryptoError> {
    let ephemeral = EphemeralSecret::random_from_rng(rand::rngs::OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral).to_bytes();
    let shared = ephemeral.diffie_hellman(&PublicKey::from(recipient.0));
    if !shared.was_contributory() {
        return Err(CryptoError::EnvelopeError(
            "recipient key is a low-order point".to_string(),
        ));
    }
    let cipher = derive_cipher(shared.as_bytes(), &ephemeral_public, &recipient.0)?;
    let plaintext = Zeroizing::new(value.to_be_bytes());
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&NONCE),
            Payload {
                msg: plaintext.as_slice(),
                aad: &ephemeral_public,
            },
        )
        .map_err(|_| CryptoError::EnvelopeError("encryption failed".to_string()))?;
    Ok(SealedEnvelope {
        ephemeral_public,
        ciphertext,
    })
}

fn derive_cipher(
    shared: &[u8; 32],
    ephemeral_public: &[u8; 32],
    recipient_public: &[u8; 32],
) -> Result<Aes256Gcm, CryptoError> {
    let mut hasher = Sha256::new();
    hasher.update(KDF_DOMAIN);
    hasher.update(shared);
    hasher.update(ephemeral_public);
    hasher.update(recipient_public);
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&hasher.finalize());
    Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| CryptoError::EnvelopeError(format!("key derivation failed: {e}")))
}
