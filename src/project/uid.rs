//! The UID-indexed path cache: every recovered resource that carries a
//! `uid://` reference needs that UID remapped to wherever this crate wrote
//! the resource (spec §4.G "Remap and UID maintenance").

use indexmap::IndexMap;
use thiserror::Error;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuv";
const PREFIX: &str = "uid://";

#[derive(Debug, Error)]
pub enum UidError {
    #[error("uid text must start with 'uid://'")]
    MissingPrefix,
    #[error("uid text contains a character outside the base32 alphabet: {0:?}")]
    BadDigit(char),
}

/// Encodes a 64-bit UID as the `uid://…` text form the engine reads from
/// `.import` sidecars and script headers.
pub fn encode_uid(mut value: u64) -> String {
    if value == 0 {
        return format!("{PREFIX}0");
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 32) as usize]);
        value /= 32;
    }
    digits.reverse();
    format!("{PREFIX}{}", String::from_utf8(digits).unwrap())
}

pub fn decode_uid(text: &str) -> Result<u64, UidError> {
    let digits = text.strip_prefix(PREFIX).ok_or(UidError::MissingPrefix)?;
    let mut value = 0u64;
    for c in digits.chars() {
        let digit = ALPHABET
            .iter()
            .position(|&b| b as char == c)
            .ok_or(UidError::BadDigit(c))? as u64;
        value = value.wrapping_mul(32).wrapping_add(digit);
    }
    Ok(value)
}

/// A bidirectional UID ↔ path lookup, rebuilt from scratch after every
/// export pass rather than patched incrementally (spec §4.G).
#[derive(Debug, Default, Clone)]
pub struct UidCache {
    uid_to_path: IndexMap<u64, String>,
}

impl UidCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uid: u64, path: impl Into<String>) {
        self.uid_to_path.insert(uid, path.into());
    }

    pub fn path_for(&self, uid: u64) -> Option<&str> {
        self.uid_to_path.get(&uid).map(|s| s.as_str())
    }

    pub fn uid_for(&self, path: &str) -> Option<u64> {
        self.uid_to_path.iter().find(|(_, p)| p.as_str() == path).map(|(uid, _)| *uid)
    }

    pub fn len(&self) -> usize {
        self.uid_to_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uid_to_path.is_empty()
    }

    /// One `<uid_text>\t<path>` line per entry, insertion order preserved.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (uid, path) in &self.uid_to_path {
            out.push_str(&encode_uid(*uid));
            out.push('\t');
            out.push_str(path);
            out.push('\n');
        }
        out
    }

    pub fn from_text(text: &str) -> Result<Self, UidError> {
        let mut cache = Self::new();
        for line in text.lines() {
            let Some((uid_text, path)) = line.split_once('\t') else { continue };
            cache.insert(decode_uid(uid_text)?, path.to_string());
        }
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_text_round_trips() {
        for value in [0u64, 1, 31, 32, 1234567890, u64::MAX] {
            let text = encode_uid(value);
            assert_eq!(decode_uid(&text).unwrap(), value);
        }
    }

    #[test]
    fn malformed_uid_text_is_rejected() {
        assert!(matches!(decode_uid("not-a-uid"), Err(UidError::MissingPrefix)));
        assert!(matches!(decode_uid("uid://!!!"), Err(UidError::BadDigit('!'))));
    }

    #[test]
    fn cache_round_trips_through_text() {
        let mut cache = UidCache::new();
        cache.insert(42, "res://scripts/player.gd");
        cache.insert(7, "res://scenes/main.tscn");
        let text = cache.to_text();
        let reloaded = UidCache::from_text(&text).unwrap();
        assert_eq!(reloaded.path_for(42), Some("res://scripts/player.gd"));
        assert_eq!(reloaded.uid_for("res://scenes/main.tscn"), Some(7));
        assert_eq!(reloaded.len(), 2);
    }
}
