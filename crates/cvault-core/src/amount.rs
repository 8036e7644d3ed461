//! # Native Amounts
//!
//! `NativeAmount` is an unsigned 256-bit quantity of the native currency in
//! its smallest unit. Deposits arrive at this width; only values that fit in
//! 128 bits can be encrypted, so the narrowing happens in exactly one place
//! ([`NativeAmount::to_u128`]) and the vault rejects anything wider.
//!
//! Amounts serialize as base-10 strings so no precision is lost in JSON or
//! YAML.

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// Number of fractional digits in one whole native unit.
pub const NATIVE_DECIMALS: u32 = 18;

/// Unsigned 256-bit amount, stored as a big-endian word.
///
/// Derived ordering on the big-endian byte array is numeric ordering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NativeAmount([u8; 32]);

impl NativeAmount {
    /// The zero amount.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create an amount from a 128-bit value.
    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Create an amount from a big-endian 256-bit word.
    pub const fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The big-endian 256-bit word.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Narrow to 128 bits. Returns `None` if any of the upper 128 bits is set.
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(low))
    }

    /// Whether the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse a base-10 integer string in the smallest unit.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidAmount`] for empty input, non-digit
    /// characters, or values above 2^256 − 1.
    pub fn parse_decimal(s: &str) -> Result<Self, ParseError> {
        let input = s.trim();
        if input.is_empty() {
            return Err(invalid(s, "empty amount"));
        }
        if let Some(c) = input.chars().find(|c| !c.is_ascii_digit()) {
            return Err(invalid(s, &format!("unexpected character '{c}'")));
        }
        let value: BigUint = input
            .parse()
            .map_err(|_| invalid(s, "not a decimal number"))?;
        if value.bits() > 256 {
            return Err(invalid(s, "exceeds 256 bits"));
        }
        let be = value.to_bytes_be();
        let mut word = [0u8; 32];
        word[32 - be.len()..].copy_from_slice(&be);
        Ok(Self(word))
    }

    /// Parse a decimal string in whole units, scaling by `10^decimals`.
    ///
    /// `parse_units("1.5", 18)` is 1.5 × 10^18 in the smallest unit.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidAmount`] for malformed input or more
    /// fractional digits than `decimals`.
    pub fn parse_units(s: &str, decimals: u32) -> Result<Self, ParseError> {
        let input = s.trim();
        let (whole, frac) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid(s, "empty amount"));
        }
        let scale = decimals as usize;
        if frac.len() > scale {
            return Err(invalid(
                s,
                &format!("more than {decimals} fractional digits"),
            ));
        }
        let mut digits = String::with_capacity(whole.len() + scale);
        digits.push_str(if whole.is_empty() { "0" } else { whole });
        digits.push_str(frac);
        digits.extend(std::iter::repeat('0').take(scale - frac.len()));
        Self::parse_decimal(&digits).map_err(|_| invalid(s, "not a decimal number"))
    }

    /// Render as a base-10 string in the smallest unit.
    pub fn to_decimal_string(&self) -> String {
        BigUint::from_bytes_be(&self.0).to_string()
    }

    /// Render in whole units with `decimals` fractional digits, trimming
    /// trailing zeros (`1500000000000000000` at 18 decimals is `"1.5"`).
    pub fn format_units(&self, decimals: u32) -> String {
        let raw = self.to_decimal_string();
        let scale = decimals as usize;
        if scale == 0 {
            return raw;
        }
        let padded = format!("{raw:0>width$}", width = scale + 1);
        let (whole, frac) = padded.split_at(padded.len() - scale);
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            whole.to_string()
        } else {
            format!("{whole}.{frac}")
        }
    }
}

fn invalid(input: &str, reason: &str) -> ParseError {
    ParseError::InvalidAmount {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

impl From<u128> for NativeAmount {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}

impl std::fmt::Display for NativeAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl std::fmt::Debug for NativeAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NativeAmount({})", self.to_decimal_string())
    }
}

impl Serialize for NativeAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de> Deserialize<'de> for NativeAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_decimal(&s).map_err(serde::de::Error::custom)
    }
}
