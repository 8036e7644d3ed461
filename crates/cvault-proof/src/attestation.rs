//! # Decryption Attestation
//!
//! The document a trust authority signs when it publishes a decryption:
//!
//! ```json
//! {"cleartexts":"0x…","domain":"cvault/public-decryption/v1","handles":["0x…"]}
//! ```
//!
//! serialized through [`CanonicalBytes`]. Cleartexts are encoded as one
//! 32-byte big-endian word per handle, in handle order.

use serde::Serialize;

use cvault_core::{CanonicalBytes, CanonicalizationError, EncryptedHandle, NativeAmount};

use crate::traits::VerifyError;

/// Domain separator for public-decryption attestations.
pub const ATTESTATION_DOMAIN: &str = "cvault/public-decryption/v1";

/// Width of one encoded cleartext word.
pub const CLEARTEXT_WORD_LEN: usize = 32;

#[derive(Serialize)]
struct DecryptionAttestation<'a> {
    domain: &'a str,
    handles: &'a [EncryptedHandle],
    cleartexts: String,
}

/// Canonical bytes a signer signs for `(handles, cleartexts)`.
pub fn attestation_bytes(
    handles: &[EncryptedHandle],
    cleartexts: &[u8],
) -> Result<CanonicalBytes, CanonicalizationError> {
    CanonicalBytes::new(&DecryptionAttestation {
        domain: ATTESTATION_DOMAIN,
        handles,
        cleartexts: format!("0x{}", hex::encode(cleartexts)),
    })
}

/// Encode 128-bit cleartexts as consecutive 32-byte big-endian words.
pub fn encode_cleartexts(values: &[u128]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|v| NativeAmount::from_u128(*v).to_be_bytes())
        .collect()
}

/// Decode an encoding produced by [`encode_cleartexts`] for `count` handles.
///
/// # Errors
///
/// [`VerifyError::CleartextLength`] when the encoding is not exactly
/// `count` words; [`VerifyError::CleartextOutOfRange`] when a word does not
/// fit in 128 bits.
pub fn decode_cleartexts(encoded: &[u8], count: usize) -> Result<Vec<u128>, VerifyError> {
    let expected = count * CLEARTEXT_WORD_LEN;
    if encoded.len() != expected {
        return Err(VerifyError::CleartextLength {
            expected,
            actual: encoded.len(),
        });
    }
    encoded
        .chunks_exact(CLEARTEXT_WORD_LEN)
        .enumerate()
        .map(|(index, chunk)| {
            let mut word = [0u8; CLEARTEXT_WORD_LEN];
            word.copy_from_slice(chunk);
            NativeAmount::from_be_bytes(word)
                .to_u128()
                .ok_or(VerifyError::CleartextOutOfRange { index })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_big_endian() {
        let encoded = encode_cleartexts(&[1, 256]);
        assert_eq!(encoded.len(), 64);
        assert_eq!(encoded[31], 1);
        assert_eq!(encoded[62], 1);
        assert_eq!(encoded[63], 0);
        assert_eq!(decode_cleartexts(&encoded, 2).unwrap(), vec![1, 256]);
    }

    #[test]
    fn wrong_length_rejected() {
        let encoded = encode_cleartexts(&[5]);
        assert!(matches!(
            decode_cleartexts(&encoded[..31], 1),
            Err(VerifyError::CleartextLength { expected: 32, actual: 31 })
        ));
        assert!(decode_cleartexts(&encoded, 2).is_err());
    }

    #[test]
    fn word_above_u128_rejected() {
        let mut word = [0u8; 32];
        word[15] = 1;
        assert!(matches!(
            decode_cleartexts(&word, 1),
            Err(VerifyError::CleartextOutOfRange { index: 0 })
        ));
    }

    #[test]
    fn attestation_is_domain_separated_and_sorted() {
        let h = EncryptedHandle::from_bytes([0xab; 32]);
        let bytes = attestation_bytes(&[h], &encode_cleartexts(&[7])).unwrap();
        let text = std::str::from_utf8(bytes.as_bytes()).unwrap();
        assert!(text.starts_with("{\"cleartexts\":\"0x"));
        assert!(text.contains(ATTESTATION_DOMAIN));
        assert!(text.contains(&h.to_hex()));
    }

    #[test]
    fn handle_order_changes_the_message() {
        let a = EncryptedHandle::from_bytes([1; 32]);
        let b = EncryptedHandle::from_bytes([2; 32]);
        let clear = encode_cleartexts(&[1, 2]);
        assert_ne!(
            attestation_bytes(&[a, b], &clear).unwrap(),
            attestation_bytes(&[b, a], &clear).unwrap()
        );
    }
}
