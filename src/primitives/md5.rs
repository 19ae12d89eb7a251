//! MD5 digests, used for package entry integrity and encrypted-stream
//! plaintext verification (spec §3, §4.B).

use md5::{Digest, Md5};

/// Computes the MD5 digest of `data`.
pub fn digest(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// The all-zero sentinel a package entry uses to mean "no checksum, skip
/// verification" (spec §4.C).
pub const EMPTY: [u8; 16] = [0u8; 16];

pub fn is_empty(md5: &[u8; 16]) -> bool {
    *md5 == EMPTY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_known_vector() {
        // MD5("") = d41d8cd98f00b204e9800998ecf8427e
        let d = digest(b"");
        assert_eq!(hex::encode(d), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn empty_sentinel_detection() {
        assert!(is_empty(&EMPTY));
        assert!(!is_empty(&digest(b"x")));
    }
}
