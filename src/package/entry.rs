//! A single package entry record: path, offset, size, MD5, per-entry flags
//! (spec §3). Paths use `/` separation and the `res://` scheme prefix.

use binrw::{binrw, BinResult};
use std::io::{Read, Seek};

#[bitfield_struct::bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct EntryFlags {
    pub encrypted: bool,
    #[bits(31)]
    __: u32,
}

#[binrw]
#[brw(little)]
pub struct RawEntryHeader {
    #[br(parse_with = read_prefixed_path)]
    #[bw(write_with = write_prefixed_path)]
    pub path: String,
    pub offset: u64,
    pub size: u64,
    pub md5: [u8; 16],
    flags_raw: u32,
}

#[binrw::parser(reader, endian)]
fn read_prefixed_path() -> BinResult<String> {
    let len = u32::read_options(reader, endian, ())?;
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    let pad = (4 - (len % 4) % 4) % 4;
    if pad > 0 {
        reader.seek(std::io::SeekFrom::Current(pad as i64))?;
    }
    String::from_utf8(buf).map_err(|e| binrw::Error::Custom {
        pos: 0,
        err: Box::new(e),
    })
}

#[binrw::writer(writer, endian)]
fn write_prefixed_path(path: &String) -> BinResult<()> {
    use binrw::BinWrite;
    let bytes = path.as_bytes();
    (bytes.len() as u32).write_options(writer, endian, ())?;
    writer.write_all(bytes)?;
    let pad = (4 - (bytes.len() % 4) % 4) % 4;
    writer.write_all(&vec![0u8; pad])?;
    Ok(())
}

impl RawEntryHeader {
    pub fn flags(&self) -> EntryFlags {
        EntryFlags::from_bits(self.flags_raw)
    }
}

/// A fully resolved entry: the directory-index record plus the absolute
/// offset computed from the container's `offsets_relative_to_base` flag.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub path: String,
    pub absolute_offset: u64,
    pub size: u64,
    pub md5: [u8; 16],
    pub encrypted: bool,
}

impl EntryInfo {
    /// `true` if the logical path needed sanitizing (backslash or `..`
    /// segment) before it was safe to join under an output root.
    pub fn is_malformed(&self) -> bool {
        self.path.contains('\\') || self.path.split('/').any(|seg| seg == "..")
    }

    /// The path with a `res://`/scheme prefix stripped and malformed
    /// segments neutralized, safe to join under an output root.
    pub fn sanitized_path(&self) -> String {
        let stripped = self
            .path
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.path);
        stripped
            .replace('\\', "/")
            .split('/')
            .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_malformed_paths() {
        let e = EntryInfo {
            path: "res://../../etc/passwd".to_string(),
            absolute_offset: 0,
            size: 0,
            md5: [0; 16],
            encrypted: false,
        };
        assert!(e.is_malformed());
        assert_eq!(e.sanitized_path(), "etc/passwd");
    }

    #[test]
    fn well_formed_path_is_untouched() {
        let e = EntryInfo {
            path: "res://scenes/main.tscn".to_string(),
            absolute_offset: 0,
            size: 0,
            md5: [0; 16],
            encrypted: false,
        };
        assert!(!e.is_malformed());
        assert_eq!(e.sanitized_path(), "scenes/main.tscn");
    }
}
