//! Stellar StrKey encoding.
//!
//! A StrKey is `base32(version || payload || crc16_xmodem(version || payload))`
//! without padding. The version byte fixes the leading character: `G` for
//! account ids, `S` for secret seeds.

use crate::error::CryptoError;

const VERSION_ACCOUNT_ID: u8 = 6 << 3; // 'G'
const VERSION_SEED: u8 = 18 << 3; // 'S'

const ALPHABET: base32::Alphabet = base32::Alphabet::Rfc4648 { padding: false };

/// Encodes an Ed25519 public key as an account id (G...).
pub fn encode_account_id(key: &[u8; 32]) -> String {
    encode_check(VERSION_ACCOUNT_ID, key)
}

/// Decodes an account id (G...) to raw key bytes.
pub fn decode_account_id(s: &str) -> Result<[u8; 32], CryptoError> {
    decode_check(VERSION_ACCOUNT_ID, s)
}

/// Encodes a 32-byte seed as S....
pub fn encode_secret_seed(seed: &[u8; 32]) -> String {
    encode_check(VERSION_SEED, seed)
}

/// Decodes a seed (S...) to raw bytes.
pub fn decode_secret_seed(s: &str) -> Result<[u8; 32], CryptoError> {
    decode_check(VERSION_SEED, s)
}

/// True if `s` is a well-formed G... account id.
pub fn is_valid_account_id(s: &str) -> bool {
    decode_account_id(s).is_ok()
}

fn encode_check(version: u8, data: &[u8]) -> String {
    let mut payload = vec![version];
    payload.extend_from_slice(data);

    let checksum = crc16_xmodem(&payload);
    payload.extend_from_slice(&checksum.to_le_bytes());

    base32::encode(ALPHABET, &payload)
}

fn decode_check(expected_version: u8, s: &str) -> Result<[u8; 32], CryptoError> {
    let decoded = base32::decode(ALPHABET, s)
        .ok_or_else(|| CryptoError::InvalidStrKey("invalid base32".to_string()))?;

    if decoded.len() != 1 + 32 + 2 {
        return Err(CryptoError::InvalidStrKey(format!(
            "length {} != {}",
            decoded.len(),
            1 + 32 + 2
        )));
    }

    let version = decoded[0];
    if version != expected_version {
        return Err(CryptoError::InvalidStrKey(format!(
            "version byte {:02x} != {:02x}",
            version, expected_version
        )));
    }

    let checksum_pos = decoded.len() - 2;
    let checksum = u16::from_le_bytes([decoded[checksum_pos], decoded[checksum_pos + 1]]);
    if checksum != crc16_xmodem(&decoded[..checksum_pos]) {
        return Err(CryptoError::InvalidStrKey("checksum mismatch".to_string()));
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&decoded[1..checksum_pos]);
    Ok(key)
}

/// CRC16-XModem: polynomial 0x1021, initial value 0.
fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_roundtrip() {
        let key = [42u8; 32];
        let encoded = encode_account_id(&key);
        assert!(encoded.starts_with('G'));
        assert_eq!(encoded.len(), 56);
        assert_eq!(decode_account_id(&encoded).unwrap(), key);
    }

    #[test]
    fn test_known_zero_account() {
        assert_eq!(
            encode_account_id(&[0u8; 32]),
            "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF"
        );
    }

    #[test]
    fn test_seed_is_not_an_account_id() {
        let seed = encode_secret_seed(&[1u8; 32]);
        assert!(seed.starts_with('S'));
        assert!(decode_account_id(&seed).is_err());
        assert!(!is_valid_account_id(&seed));
    }

    #[test]
    fn test_invalid_checksum() {
        let encoded = encode_account_id(&[0u8; 32]);
        let mut chars: Vec<char> = encoded.chars().collect();
        let last_idx = chars.len() - 1;
        chars[last_idx] = if chars[last_idx] == 'A' { 'B' } else { 'A' };
        let corrupted: String = chars.into_iter().collect();
        assert!(decode_account_id(&corrupted).is_err());
    }
}
