//! UTF-8/UTF-16/UTF-32 string codecs used by length-prefixed string records.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StringError {
    #[error("invalid utf-8 in string record: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("invalid utf-16 in string record")]
    InvalidUtf16,

    #[error("invalid utf-32 codepoint {0:#x} in string record")]
    InvalidUtf32(u32),

    #[error("string record length {0} is not a multiple of the code unit size")]
    MisalignedLength(usize),
}

/// Which code unit a length-prefixed string record is encoded with. Godot's
/// variant codec and bytecode identifier table both need this explicit,
/// since `String`/`StringName` payloads switch encoding by context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEncoding {
    Utf8,
    Utf16,
    Utf32,
}

impl StringEncoding {
    pub fn decode(self, bytes: &[u8]) -> Result<String, StringError> {
        match self {
            StringEncoding::Utf8 => Ok(std::str::from_utf8(bytes)?.to_owned()),
            StringEncoding::Utf16 => {
                if bytes.len() % 2 != 0 {
                    return Err(StringError::MisalignedLength(bytes.len()));
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&units).map_err(|_| StringError::InvalidUtf16)
            }
            StringEncoding::Utf32 => {
                if bytes.len() % 4 != 0 {
                    return Err(StringError::MisalignedLength(bytes.len()));
                }
                bytes
                    .chunks_exact(4)
                    .map(|c| {
                        let cp = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                        char::from_u32(cp).ok_or(StringError::InvalidUtf32(cp))
                    })
                    .collect::<Result<String, _>>()
            }
        }
    }

    pub fn encode(self, s: &str) -> Vec<u8> {
        match self {
            StringEncoding::Utf8 => s.as_bytes().to_vec(),
            StringEncoding::Utf16 => s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect(),
            StringEncoding::Utf32 => s.chars().flat_map(|c| (c as u32).to_le_bytes()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_round_trips() {
        let encoded = StringEncoding::Utf8.encode("hello");
        assert_eq!(StringEncoding::Utf8.decode(&encoded).unwrap(), "hello");
    }

    #[test]
    fn utf32_round_trips_identifier_table_payload() {
        let encoded = StringEncoding::Utf32.encode("_ready");
        assert_eq!(StringEncoding::Utf32.decode(&encoded).unwrap(), "_ready");
    }

    #[test]
    fn misaligned_utf16_is_rejected() {
        let err = StringEncoding::Utf16.decode(&[0u8; 3]).unwrap_err();
        assert!(matches!(err, StringError::MisalignedLength(3)));
    }
}
