//! Cleartext payload codec for decryption responses.
//!
//! The oracle returns decrypted values as consecutive 32-byte big-endian
//! words, one per requested handle, in request order.

use thiserror::Error;

/// Size of one encoded word.
pub const WORD_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CleartextError {
    #[error("Cleartext payload too short: need {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },

    #[error("Word {0} does not fit in u64")]
    Overflow(usize),
}

/// Encode values as big-endian 32-byte words.
pub fn encode_words(values: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * WORD_SIZE);
    for value in values {
        let mut word = [0u8; WORD_SIZE];
        word[WORD_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
        out.extend_from_slice(&word);
    }
    out
}

/// Decode the word at `index` as a `u64`.
pub fn decode_u64_word(payload: &[u8], index: usize) -> Result<u64, CleartextError> {
    let start = index * WORD_SIZE;
    let end = start + WORD_SIZE;
    let word = payload.get(start..end).ok_or(CleartextError::TooShort {
        need: end,
        got: payload.len(),
    })?;

    if word[..WORD_SIZE - 8].iter().any(|b| *b != 0) {
        return Err(CleartextError::Overflow(index));
    }

    let mut low = [0u8; 8];
    low.copy_from_slice(&word[WORD_SIZE - 8..]);
    Ok(u64::from_be_bytes(low))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_second_word() {
        let payload = encode_words(&[5, u64::MAX]);
        assert_eq!(payload.len(), 64);
        assert_eq!(decode_u64_word(&payload, 1).unwrap(), u64::MAX);
    }

    #[test]
    fn test_short_payload() {
        assert_eq!(
            decode_u64_word(&[0u8; 31], 0),
            Err(CleartextError::TooShort { need: 32, got: 31 })
        );
    }

    #[test]
    fn test_overflowing_word() {
        let mut payload = encode_words(&[1]);
        payload[0] = 1;
        assert_eq!(decode_u64_word(&payload, 0), Err(CleartextError::Overflow(0)));
    }
}
