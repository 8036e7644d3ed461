//! # Error Types: Shared Error Hierarchy
//!
//! Leaf error types used across the vault workspace. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//! Higher crates wrap these in their own enums rather than re-exporting a
//! single catch-all error.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts must be strings or integers.
    #[error("float values are not permitted in canonical documents: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error in cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// Sealing or opening an encrypted envelope failed.
    #[error("envelope error: {0}")]
    EnvelopeError(String),

    /// Canonicalization of the signed or hashed document failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Error parsing a textual representation of a domain primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input was not valid hexadecimal.
    #[error("invalid hex for {kind}: {reason}")]
    InvalidHex {
        /// The primitive being parsed (e.g. "account", "handle").
        kind: &'static str,
        /// What was wrong with the input.
        reason: String,
    },

    /// Input decoded to the wrong number of bytes.
    #[error("{kind} must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// The primitive being parsed.
        kind: &'static str,
        /// Required byte length.
        expected: usize,
        /// Decoded byte length.
        actual: usize,
    },

    /// Input was not a valid decimal amount.
    #[error("invalid amount \"{input}\": {reason}")]
    InvalidAmount {
        /// The rejected input.
        input: String,
        /// What was wrong with the input.
        reason: String,
    },
}

/// Decode an optionally `0x`-prefixed hex string into exactly `N` bytes.
pub(crate) fn decode_fixed_hex<const N: usize>(
    kind: &'static str,
    input: &str,
) -> Result<[u8; N], ParseError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|e| ParseError::InvalidHex {
        kind,
        reason: e.to_string(),
    })?;
    if bytes.len() != N {
        return Err(ParseError::InvalidLength {
            kind,
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_accepts_prefixed_and_bare_hex() {
        let a: [u8; 2] = decode_fixed_hex("test", "0xabcd").unwrap();
        let b: [u8; 2] = decode_fixed_hex("test", "ABCD").unwrap();
        assert_eq!(a, [0xab, 0xcd]);
        assert_eq!(a, b);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let err = decode_fixed_hex::<4>("account", "0xabcd").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidLength {
                kind: "account",
                expected: 4,
                actual: 2
            }
        );
    }

    #[test]
    fn decode_rejects_non_hex() {
        assert!(matches!(
            decode_fixed_hex::<2>("handle", "zzzz"),
            Err(ParseError::InvalidHex { kind: "handle", .. })
        ));
    }
}
