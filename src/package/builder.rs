//! Writes a PCK container: directory-first layout with a backpatched offset
//! table, mirroring the read side in [`super::container`] byte for byte.

use rand::RngCore;
use thiserror::Error;

use crate::cipher::{self, CipherMode, Key};
use crate::primitives::md5;

use super::entry::EntryFlags;
use super::header::{EngineVersion, PckFlags, EMBED_TAIL_LEN, MAGIC};

#[derive(Debug, Error)]
pub enum PckBuilderError {
    #[error("entry '{0}' is marked encrypted but no key was supplied")]
    MissingEncryptionKey(String),

    #[error("package exceeds {0} entries")]
    TooManyEntries(usize),
}

struct PendingEntry {
    path: String,
    payload: Vec<u8>,
    md5: [u8; 16],
    encrypted: bool,
}

/// Accumulates entries in memory and serializes them into a single
/// contiguous `GDPC` package (spec §3, §4.C).
pub struct PckBuilder {
    engine: EngineVersion,
    entries: Vec<PendingEntry>,
}

impl PckBuilder {
    pub fn new(engine: EngineVersion) -> Self {
        Self { engine, entries: Vec::new() }
    }

    /// Adds a file, computing its plaintext MD5 and, if `encrypt` is set,
    /// wrapping the payload with a freshly generated IV (spec §4.B).
    pub fn add_file(&mut self, path: &str, data: Vec<u8>, encrypt: bool, key: Option<&Key>) -> &mut Self {
        let md5 = md5::digest(&data);
        let payload = if encrypt {
            let key = key.expect("add_file(encrypt = true) requires a key");
            let mut iv = [0u8; 16];
            rand::thread_rng().fill_bytes(&mut iv);
            cipher::encrypt(&data, key, iv, CipherMode::Aes256CfbV4)
        } else {
            data
        };
        self.entries.push(PendingEntry { path: path.to_string(), payload, md5, encrypted: encrypt });
        self
    }

    /// Adds a file with an explicit stored MD5, bypassing the usual
    /// plaintext digest — used to construct the all-zero "skip" sentinel
    /// (spec P1) in tests.
    pub fn add_file_with_md5(&mut self, path: &str, data: Vec<u8>, md5: [u8; 16]) -> &mut Self {
        self.entries.push(PendingEntry { path: path.to_string(), payload: data, md5, encrypted: false });
        self
    }

    /// Serializes the package to a byte buffer with absolute or
    /// base-relative offsets per `flags.offsets_relative_to_base()`.
    ///
    /// Entries are written in path order regardless of insertion order, so
    /// two builders given the same file set in different orders produce
    /// byte-identical packages.
    pub fn build_in_memory(&self, flags: PckFlags) -> Result<Vec<u8>, PckBuilderError> {
        if self.entries.len() > u32::MAX as usize {
            return Err(PckBuilderError::TooManyEntries(u32::MAX as usize));
        }

        let mut entries: Vec<&PendingEntry> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&self.engine.major.to_le_bytes());
        out.extend_from_slice(&self.engine.minor.to_le_bytes());
        out.extend_from_slice(&self.engine.patch.to_le_bytes());
        out.extend_from_slice(&flags.into_bits().to_le_bytes());
        out.extend_from_slice(&(entries.len() as u32).to_le_bytes());

        let mut offset_field_positions = Vec::with_capacity(entries.len());
        for entry in &entries {
            let path_bytes = entry.path.as_bytes();
            out.extend_from_slice(&(path_bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(path_bytes);
            let pad = (4 - path_bytes.len() % 4) % 4;
            out.extend(std::iter::repeat(0u8).take(pad));

            offset_field_positions.push(out.len());
            out.extend_from_slice(&0u64.to_le_bytes()); // backpatched below

            out.extend_from_slice(&(entry.payload.len() as u64).to_le_bytes());
            out.extend_from_slice(&entry.md5);
            let entry_flags = EntryFlags::new().with_encrypted(entry.encrypted);
            out.extend_from_slice(&entry_flags.into_bits().to_le_bytes());
        }

        let payload_start = out.len() as u64;
        for (entry, offset_field_pos) in entries.iter().zip(offset_field_positions) {
            let data_offset = out.len() as u64;
            out.extend_from_slice(&entry.payload);
            let stored_offset = if flags.offsets_relative_to_base() {
                data_offset - payload_start
            } else {
                data_offset
            };
            out[offset_field_pos..offset_field_pos + 8].copy_from_slice(&stored_offset.to_le_bytes());
        }

        Ok(out)
    }

    /// Builds the package exactly as [`Self::build_in_memory`] does, then
    /// prepends `executable`'s bytes and appends the trailing
    /// `[sentinel(4) | back_offset(8)]` pair self-embedded packages carry
    /// (spec §3, §4.C) so the result is a single file the engine runtime can
    /// both execute and open as its own data package.
    pub fn build_embedded_in_memory(&self, flags: PckFlags, executable: &[u8]) -> Result<Vec<u8>, PckBuilderError> {
        let package = self.build_in_memory(flags)?;
        let mut out = Vec::with_capacity(executable.len() + package.len() + EMBED_TAIL_LEN as usize);
        out.extend_from_slice(executable);
        out.extend_from_slice(&package);
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&(package.len() as u64).to_le_bytes());
        Ok(out)
    }
}
