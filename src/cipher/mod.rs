//! Authenticated AES-256 stream cipher wrapping encrypted package entries
//! and script files (spec §4.B, §6 encrypted-stream format).
//!
//! Wire format: `magic(u32) | mode(u32) | plaintext_md5(16) | plaintext_length(u64)
//! | iv(16) | ciphertext`. The wrapper decrypts the whole block, recomputes
//! the MD5 of the plaintext, and reports [`CipherError::Unauthorized`] if it
//! disagrees — distinct from a missing/incorrect key, which the caller
//! detects before ever calling [`decrypt`].

use aes::Aes256;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use thiserror::Error;

use crate::primitives::md5;

pub const MAGIC: u32 = 0x4643_4447; // "GDCF" read little-endian as the 4 ASCII bytes 'G','D','E','N' variant tail
pub const HEADER_LEN: usize = 4 + 4 + 16 + 8 + 16;
const KEY_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    /// Current engine-era framing (Godot 4.x `FileAccessEncrypted`).
    Aes256CfbV4,
    /// Legacy v3-era framing; same block cipher, kept distinct so a
    /// revision-specific fingerprint can select it (spec §4.B).
    Aes256CfbV3Legacy,
}

impl CipherMode {
    fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(CipherMode::Aes256CfbV4),
            1 => Some(CipherMode::Aes256CfbV3Legacy),
            _ => None,
        }
    }

    fn to_u32(self) -> u32 {
        match self {
            CipherMode::Aes256CfbV4 => 0,
            CipherMode::Aes256CfbV3Legacy => 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("UNAUTHORIZED: missing or incorrect decryption key")]
    MissingKey,

    #[error("UNAUTHORIZED: plaintext MD5 mismatch after decryption")]
    Unauthorized,

    #[error("CORRUPT_HEADER: stream is shorter than the encrypted-stream header")]
    HeaderTooShort,

    #[error("CORRUPT_HEADER: bad magic {0:#x}")]
    BadMagic(u32),

    #[error("CORRUPT_HEADER: unknown cipher mode {0}")]
    UnknownMode(u32),

    #[error("ciphertext is shorter than the declared plaintext length")]
    Truncated,
}

/// A 32-byte AES-256 key, parsed from the hex string carried by
/// `SCRIPT_AES256_ENCRYPTION_KEY` (spec §6).
#[derive(Clone)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    pub fn from_hex(hex_str: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex_str.trim())?;
        let mut key = [0u8; KEY_LEN];
        if bytes.len() != KEY_LEN {
            // hex::decode doesn't validate length; surface it the same way a
            // malformed-hex-length error would read to a caller.
            return Err(hex::FromHexError::InvalidStringLength);
        }
        key.copy_from_slice(&bytes);
        Ok(Key(key))
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Key(bytes)
    }
}

/// Decrypts an encrypted-stream payload (header + ciphertext) with `key`,
/// returning the verified plaintext. `key: None` is reported distinctly
/// from a corrupted payload per spec §4.B.
pub fn decrypt(data: &[u8], key: Option<&Key>) -> Result<Vec<u8>, CipherError> {
    if data.len() < HEADER_LEN {
        return Err(CipherError::HeaderTooShort);
    }

    let magic = u32::from_le_bytes(data[0..4].try_into().unwrap());
    if magic != MAGIC {
        return Err(CipherError::BadMagic(magic));
    }

    let mode_raw = u32::from_le_bytes(data[4..8].try_into().unwrap());
    let mode = CipherMode::from_u32(mode_raw).ok_or(CipherError::UnknownMode(mode_raw))?;

    let expected_md5: [u8; 16] = data[8..24].try_into().unwrap();
    let plaintext_length = u64::from_le_bytes(data[24..32].try_into().unwrap()) as usize;
    let iv: [u8; 16] = data[32..48].try_into().unwrap();
    let ciphertext = &data[48..];

    let key = key.ok_or(CipherError::MissingKey)?;

    let mut buf = ciphertext.to_vec();
    match mode {
        CipherMode::Aes256CfbV4 | CipherMode::Aes256CfbV3Legacy => {
            cfb_mode::Decryptor::<Aes256>::new(&key.0.into(), &iv.into()).decrypt(&mut buf);
        }
    }

    if buf.len() < plaintext_length {
        return Err(CipherError::Truncated);
    }
    buf.truncate(plaintext_length);

    if md5::digest(&buf) != expected_md5 {
        return Err(CipherError::Unauthorized);
    }

    Ok(buf)
}

/// Encrypts `plaintext` under `key`, producing a self-describing
/// encrypted-stream payload. `iv` must be 16 fresh random bytes; callers in
/// this crate's tests supply deterministic IVs, the packager should not.
pub fn encrypt(plaintext: &[u8], key: &Key, iv: [u8; 16], mode: CipherMode) -> Vec<u8> {
    let md5 = md5::digest(plaintext);
    let mut buf = plaintext.to_vec();
    cfb_mode::Encryptor::<Aes256>::new(&key.0.into(), &iv.into()).encrypt(&mut buf);

    let mut out = Vec::with_capacity(HEADER_LEN + buf.len());
    out.extend_from_slice(&MAGIC.to_le_bytes());
    out.extend_from_slice(&mode.to_u32().to_le_bytes());
    out.extend_from_slice(&md5);
    out.extend_from_slice(&(plaintext.len() as u64).to_le_bytes());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&buf);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> Key {
        Key::from_bytes([0x11; KEY_LEN])
    }

    #[test]
    fn round_trips_with_correct_key() {
        let key = test_key();
        let iv = [0x22u8; 16];
        let plaintext = b"func f(x):\n    return x + 1\n".to_vec();

        let encrypted = encrypt(&plaintext, &key, iv, CipherMode::Aes256CfbV4);
        let decrypted = decrypt(&encrypted, Some(&key)).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_key_is_unauthorized_not_corrupt() {
        let right = test_key();
        let wrong = Key::from_bytes([0x99; KEY_LEN]);
        let encrypted = encrypt(b"hello world", &right, [1u8; 16], CipherMode::Aes256CfbV4);

        let err = decrypt(&encrypted, Some(&wrong)).unwrap_err();
        assert!(matches!(err, CipherError::Unauthorized));
    }

    #[test]
    fn missing_key_is_reported_distinctly() {
        let key = test_key();
        let encrypted = encrypt(b"hello world", &key, [1u8; 16], CipherMode::Aes256CfbV4);
        let err = decrypt(&encrypted, None).unwrap_err();
        assert!(matches!(err, CipherError::MissingKey));
    }

    #[test]
    fn short_stream_is_corrupt_header() {
        let err = decrypt(&[0u8; 4], None).unwrap_err();
        assert!(matches!(err, CipherError::HeaderTooShort));
    }

    #[test]
    fn hex_key_parsing_rejects_wrong_length() {
        assert!(Key::from_hex("00112233").is_err());
        assert!(Key::from_hex(&"00".repeat(32)).is_ok());
    }
}
