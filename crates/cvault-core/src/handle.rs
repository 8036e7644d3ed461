//! # Encrypted Handles
//!
//! An `EncryptedHandle` is an opaque 256-bit reference to a value held by
//! an encryption gateway. It carries no cleartext information and exposes no
//! arithmetic: the vault only stores it, forwards it, and compares it.
//!
//! ## Sentinel
//!
//! `EncryptedHandle::ZERO` is returned by read operations for accounts
//! without a stake. Gateways must never hand out the zero handle for a real
//! value; the vault checks this on every `stake`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::digest::ContentDigest;
use crate::error::{decode_fixed_hex, ParseError};

/// Opaque 32-byte reference to an encrypted value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncryptedHandle([u8; 32]);

impl EncryptedHandle {
    /// The "no stake" sentinel.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a handle from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a 64-digit hex handle, with or without the `0x` prefix.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        decode_fixed_hex::<32>("handle", s).map(Self)
    }

    /// Canonical byte serialization of the handle.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Borrow the raw handle bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Render as `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<ContentDigest> for EncryptedHandle {
    fn from(digest: ContentDigest) -> Self {
        Self(digest.0)
    }
}

impl Default for EncryptedHandle {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::fmt::Display for EncryptedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for EncryptedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncryptedHandle(0x{}...)", hex::encode(&self.0[..4]))
    }
}

impl Serialize for EncryptedHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EncryptedHandle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sentinel_is_default() {
        assert!(EncryptedHandle::default().is_zero());
        assert!(!EncryptedHandle::from_bytes([1u8; 32]).is_zero());
    }

    #[test]
    fn hex_roundtrip() {
        let h = EncryptedHandle::from_bytes([0xab; 32]);
        assert_eq!(h.to_hex().len(), 66);
        assert_eq!(EncryptedHandle::parse(&h.to_hex()).unwrap(), h);
    }

    #[test]
    fn debug_shows_prefix_only() {
        let h = EncryptedHandle::from_bytes([0xcd; 32]);
        assert_eq!(format!("{h:?}"), "EncryptedHandle(0xcdcdcdcd...)");
    }

    #[test]
    fn canonical_bytes_are_raw_handle() {
        let mut raw = [0u8; 32];
        raw[31] = 7;
        assert_eq!(EncryptedHandle::from_bytes(raw).to_bytes(), raw);
    }
}
