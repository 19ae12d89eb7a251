//! Open, verify, and extract entries from a PCK container (spec §4.C).

use std::fs::File;
use std::io::{Cursor as IoCursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use binrw::BinRead;
use memmap2::Mmap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cipher::{self, Key};
use crate::primitives::md5;

use super::entry::{EntryInfo, RawEntryHeader};
use super::header::{EngineVersion, PckHeader, EMBED_SENTINEL, EMBED_TAIL_LEN, MAGIC, MAX_SUPPORTED_VERSION};

#[derive(Debug, Error)]
pub enum PckError {
    #[error("CORRUPT_HEADER: {0}")]
    CorruptHeader(String),

    #[error("UNSUPPORTED_VERSION: format version {found} is newer than the supported maximum {max}")]
    UnsupportedVersion { found: u32, max: u32 },

    #[error("UNAUTHORIZED: {0}")]
    Unauthorized(#[from] cipher::CipherError),

    #[error("TRUNCATED_ENTRY: entry '{path}' spans [{offset}, {end}) which exceeds the package length {package_len}")]
    TruncatedEntry { path: String, offset: u64, end: u64, package_len: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("binary parse error: {0}")]
    Parse(#[from] binrw::Error),

    #[error("entry '{0}' was not found in this package")]
    EntryNotFound(String),

    #[error("CORRUPT_HEADER: duplicate entry path (case-insensitive): {0}")]
    DuplicatePath(String),
}

enum Source {
    Mmap(Mmap),
    Memory(Vec<u8>),
}

impl Source {
    fn bytes(&self) -> &[u8] {
        match self {
            Source::Mmap(m) => &m[..],
            Source::Memory(v) => &v[..],
        }
    }
}

/// Aggregate, order-independent result of [`PckContainer::verify_all`]
/// (spec §4.C: "deterministic order-independent aggregate").
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VerifyReport {
    pub ok: usize,
    pub broken: usize,
    pub skipped: usize,
}

pub struct PckContainer {
    source: Source,
    header: PckHeader,
    entries: Vec<EntryInfo>,
    encryption_error: std::sync::atomic::AtomicBool,
}

impl PckContainer {
    pub fn open(path: &Path, key: Option<&Key>) -> Result<Self, PckError> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_source(Source::Mmap(mmap), key)
    }

    pub fn from_memory(data: Vec<u8>, key: Option<&Key>) -> Result<Self, PckError> {
        Self::from_source(Source::Memory(data), key)
    }

    fn from_source(source: Source, key: Option<&Key>) -> Result<Self, PckError> {
        let bytes = source.bytes();
        let header_start = locate_header(bytes)?;

        let mut cursor = IoCursor::new(&bytes[header_start as usize..]);
        let header = PckHeader::read(&mut cursor)
            .map_err(|e| PckError::CorruptHeader(e.to_string()))?;

        if header.format_version > MAX_SUPPORTED_VERSION {
            warn!(found = header.format_version, max = MAX_SUPPORTED_VERSION, "package format version too new");
            return Err(PckError::UnsupportedVersion { found: header.format_version, max: MAX_SUPPORTED_VERSION });
        }

        let flags = header.flags();
        let directory_start = header_start + cursor.position();

        let mut raw_entries = Vec::with_capacity(header.entry_count as usize);
        let mut dir_cursor = IoCursor::new(&bytes[directory_start as usize..]);
        for _ in 0..header.entry_count {
            raw_entries.push(RawEntryHeader::read(&mut dir_cursor)?);
        }
        let base = if flags.offsets_relative_to_base() {
            directory_start + dir_cursor.position()
        } else {
            0
        };

        let package_len = bytes.len() as u64;
        let mut entries = Vec::with_capacity(raw_entries.len());
        // Invariant I2: no two entries may resolve to the same path once
        // case is normalized away, since the destination filesystem an
        // extraction targets may itself be case-insensitive.
        let mut seen_paths: std::collections::HashSet<String> = std::collections::HashSet::with_capacity(raw_entries.len());
        for raw in raw_entries {
            let absolute_offset = base + raw.offset;
            let end = absolute_offset
                .checked_add(raw.size)
                .ok_or_else(|| PckError::TruncatedEntry { path: raw.path.clone(), offset: absolute_offset, end: u64::MAX, package_len })?;
            if end > package_len {
                return Err(PckError::TruncatedEntry { path: raw.path.clone(), offset: absolute_offset, end, package_len });
            }
            let entry = EntryInfo {
                path: raw.path,
                absolute_offset,
                size: raw.size,
                md5: raw.md5,
                encrypted: raw.flags().encrypted(),
            };
            let normalized = entry.sanitized_path().to_lowercase();
            if !seen_paths.insert(normalized.clone()) {
                return Err(PckError::DuplicatePath(normalized));
            }
            entries.push(entry);
        }

        let container = Self {
            source,
            header,
            entries,
            encryption_error: std::sync::atomic::AtomicBool::new(false),
        };

        if let Some(key) = key {
            // Probing is left to callers via `read_entry`; we only surface a
            // sticky flag, we don't eagerly decrypt every entry on open.
            let _ = key;
        }

        debug!(entries = container.entries.len(), version = container.header.format_version, "opened package");
        Ok(container)
    }

    pub fn engine_version(&self) -> EngineVersion {
        self.header.engine_version()
    }

    pub fn format_version(&self) -> u32 {
        self.header.format_version
    }

    pub fn entries(&self) -> impl Iterator<Item = &EntryInfo> {
        self.entries.iter()
    }

    pub fn entry(&self, path: &str) -> Option<&EntryInfo> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// `true` once any `read_entry`/`verify_entry` call has hit an
    /// [`PckError::Unauthorized`] on an encrypted entry — consulted by the
    /// orchestrator to avoid spamming every downstream file (spec §4.B).
    pub fn has_encryption_error(&self) -> bool {
        self.encryption_error.load(std::sync::atomic::Ordering::Relaxed)
    }

    fn raw_payload(&self, entry: &EntryInfo) -> &[u8] {
        let start = entry.absolute_offset as usize;
        let end = start + entry.size as usize;
        &self.source.bytes()[start..end]
    }

    /// Decodes an entry's payload: decrypts if flagged, leaves decompression
    /// to the caller (package entries themselves aren't compressed; only
    /// resource/bytecode payloads are, at a higher layer).
    pub fn read_entry(&self, entry: &EntryInfo, key: Option<&Key>) -> Result<Vec<u8>, PckError> {
        let raw = self.raw_payload(entry);
        if entry.encrypted {
            match cipher::decrypt(raw, key) {
                Ok(plain) => Ok(plain),
                Err(e) => {
                    warn!(entry = %entry.path, "failed to decrypt entry");
                    self.encryption_error.store(true, std::sync::atomic::Ordering::Relaxed);
                    Err(PckError::Unauthorized(e))
                }
            }
        } else {
            Ok(raw.to_vec())
        }
    }

    /// `Ok(())` iff `MD5(payload) == entry.md5 ∨ entry.md5 == 0¹⁶` (spec P1).
    /// An all-zero stored MD5 is a valid "skip" sentinel, not a failure.
    pub fn verify_entry(&self, entry: &EntryInfo, key: Option<&Key>) -> Result<VerifyOutcome, PckError> {
        if md5::is_empty(&entry.md5) {
            return Ok(VerifyOutcome::Skipped);
        }
        let payload = self.read_entry(entry, key)?;
        if md5::digest(&payload) == entry.md5 {
            Ok(VerifyOutcome::Ok)
        } else {
            Ok(VerifyOutcome::Broken)
        }
    }

    /// Verifies every entry. Parallelizable by construction (each entry is
    /// independent); this sequential form is the one the single-threaded
    /// orchestrator path uses directly, while the rayon-backed path in
    /// [`crate::orchestrator`] calls [`Self::verify_entry`] per task and
    /// folds into the same [`VerifyReport`] shape.
    pub fn verify_all(&self, key: Option<&Key>) -> VerifyReport {
        let mut report = VerifyReport::default();
        for entry in &self.entries {
            match self.verify_entry(entry, key) {
                Ok(VerifyOutcome::Ok) => report.ok += 1,
                Ok(VerifyOutcome::Skipped) => report.skipped += 1,
                Ok(VerifyOutcome::Broken) | Err(_) => report.broken += 1,
            }
        }
        debug!(ok = report.ok, broken = report.broken, skipped = report.skipped, "verified package");
        report
    }

    /// Extracts a single entry to `output_root`, sanitizing malformed paths
    /// and creating parent directories as needed.
    pub fn extract_entry(&self, entry: &EntryInfo, output_root: &Path, key: Option<&Key>) -> Result<PathBuf, PckError> {
        let payload = self.read_entry(entry, key)?;
        let dest = output_root.join(entry.sanitized_path());
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest, payload)?;
        Ok(dest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Ok,
    Broken,
    Skipped,
}

/// Finds where the `GDPC` header starts: a bare package starts at 0; a
/// self-embedded one carries a 12-byte tail `[sentinel(4) | back_offset(8)]`
/// pointing at the real header (spec §3, §4.C algorithm).
fn locate_header(bytes: &[u8]) -> Result<u64, PckError> {
    if bytes.len() >= 4 && bytes[0..4] == MAGIC {
        return Ok(0);
    }

    if (bytes.len() as u64) >= EMBED_TAIL_LEN {
        let tail_start = bytes.len() - EMBED_TAIL_LEN as usize;
        let mut c = IoCursor::new(&bytes[tail_start..]);
        let mut sentinel = [0u8; 4];
        c.read_exact(&mut sentinel)?;
        if sentinel == EMBED_SENTINEL {
            let mut back_offset_bytes = [0u8; 8];
            c.read_exact(&mut back_offset_bytes)?;
            let back_offset = u64::from_le_bytes(back_offset_bytes);
            let header_start = (bytes.len() as u64)
                .checked_sub(EMBED_TAIL_LEN)
                .and_then(|tail| tail.checked_sub(back_offset))
                .ok_or_else(|| PckError::CorruptHeader("embedded back-offset underflows the file".into()))?;
            if header_start as usize + 4 <= bytes.len() && bytes[header_start as usize..header_start as usize + 4] == MAGIC {
                return Ok(header_start);
            }
        }
    }

    Err(PckError::CorruptHeader("no 'GDPC' magic at offset 0 and no embedded-tail sentinel found".into()))
}

/// Reopens from a `Seek` stream already positioned at the start of a
/// stand-alone (non-embedded) package — convenience for tests constructing
/// packages in memory without a real file.
pub fn peek_magic<R: Read + Seek>(mut r: R) -> std::io::Result<bool> {
    let pos = r.stream_position()?;
    let mut buf = [0u8; 4];
    let ok = r.read_exact(&mut buf).is_ok() && buf == MAGIC;
    r.seek(SeekFrom::Start(pos))?;
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::builder::PckBuilder;
    use crate::package::header::PckFlags;

    #[test]
    fn minimal_package_round_trips_bytes() {
        let mut builder = PckBuilder::new(EngineVersion { major: 4, minor: 3, patch: 0 });
        builder.add_file("res://a.txt", b"hello".to_vec(), false, None);
        builder.add_file("res://b.bin", (0u8..=255).collect(), false, None);
        let bytes = builder.build_in_memory(PckFlags::new()).unwrap();

        let pkg = PckContainer::from_memory(bytes, None).unwrap();
        let report = pkg.verify_all(None);
        assert_eq!(report, VerifyReport { ok: 2, broken: 0, skipped: 0 });

        let a = pkg.entry("res://a.txt").unwrap();
        assert_eq!(pkg.read_entry(a, None).unwrap(), b"hello");
    }

    #[test]
    fn encrypted_entry_requires_correct_key() {
        let key = Key::from_bytes([0x42; 32]);
        let mut builder = PckBuilder::new(EngineVersion { major: 4, minor: 3, patch: 0 });
        builder.add_file("res://secret.gd", b"print(1)".to_vec(), true, Some(&key));
        let bytes = builder.build_in_memory(PckFlags::new().with_encrypted_entries_present(true)).unwrap();

        let pkg = PckContainer::from_memory(bytes, None).unwrap();
        let entry = pkg.entry("res://secret.gd").unwrap();

        assert!(pkg.read_entry(entry, Some(&key)).is_ok());

        let pkg2 = PckContainer::from_memory(
            {
                let mut b2 = PckBuilder::new(EngineVersion { major: 4, minor: 3, patch: 0 });
                b2.add_file("res://secret.gd", b"print(1)".to_vec(), true, Some(&key));
                b2.build_in_memory(PckFlags::new().with_encrypted_entries_present(true)).unwrap()
            },
            None,
        )
        .unwrap();
        let entry2 = pkg2.entry("res://secret.gd").unwrap();
        let wrong_key = Key::from_bytes([0x01; 32]);
        assert!(pkg2.read_entry(entry2, Some(&wrong_key)).is_err());
        assert!(pkg2.has_encryption_error());
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut builder = PckBuilder::new(EngineVersion { major: 99, minor: 0, patch: 0 });
        builder.add_file("res://a.txt", b"x".to_vec(), false, None);
        let mut bytes = builder.build_in_memory(PckFlags::new()).unwrap();
        // Bump the format_version field (right after the 4-byte magic) past the max.
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        let err = PckContainer::from_memory(bytes, None).unwrap_err();
        assert!(matches!(err, PckError::UnsupportedVersion { .. }));
    }

    #[test]
    fn case_variant_duplicate_paths_are_rejected() {
        let mut builder = PckBuilder::new(EngineVersion { major: 4, minor: 0, patch: 0 });
        builder.add_file("res://Icon.png", b"a".to_vec(), false, None);
        builder.add_file("res://icon.PNG", b"b".to_vec(), false, None);
        let bytes = builder.build_in_memory(PckFlags::new()).unwrap();
        let err = PckContainer::from_memory(bytes, None).unwrap_err();
        assert!(matches!(err, PckError::DuplicatePath(_)));
    }

    #[test]
    fn empty_md5_is_a_skip_sentinel() {
        let mut builder = PckBuilder::new(EngineVersion { major: 4, minor: 0, patch: 0 });
        builder.add_file_with_md5("res://a.txt", b"hello".to_vec(), [0u8; 16]);
        let bytes = builder.build_in_memory(PckFlags::new()).unwrap();
        let pkg = PckContainer::from_memory(bytes, None).unwrap();
        assert_eq!(pkg.verify_all(None), VerifyReport { ok: 0, broken: 0, skipped: 1 });
    }
}
