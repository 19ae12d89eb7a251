//! The package header: `magic | format_version | engine_major | engine_minor
//! | engine_patch | flags | entry_count` (spec §3).

use binrw::binrw;

/// The highest container format version this crate understands (spec §1
/// Non-goal (d): versions above this are rejected, not guessed at).
pub const MAX_SUPPORTED_VERSION: u32 = 2;

pub const MAGIC: [u8; 4] = *b"GDPC";

/// Trailing-embed detection: a fixed sentinel plus an 8-byte back-offset to
/// the real header, read from the last 12 bytes of a file (spec §3, §4.C).
pub const EMBED_SENTINEL: [u8; 4] = MAGIC;
pub const EMBED_TAIL_LEN: u64 = 12;

#[bitfield_struct::bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PckFlags {
    pub encrypted_entries_present: bool,
    /// When set, entry offsets are relative to the first byte after the
    /// directory index rather than absolute within the file.
    pub offsets_relative_to_base: bool,
    #[bits(30)]
    __: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl EngineVersion {
    /// The `config_version` table from spec §4.G: `{engine_major,
    /// engine_minor} → config_version`.
    pub fn config_version(&self) -> u32 {
        match (self.major, self.minor) {
            (2, _) => 2,
            (3, 0) => 3,
            (3, _) => 4,
            (4, _) => 5,
            _ => 5,
        }
    }
}

#[binrw]
#[brw(little, magic = b"GDPC")]
pub struct PckHeader {
    pub format_version: u32,
    pub engine_major: u32,
    pub engine_minor: u32,
    pub engine_patch: u32,

    #[br(if(format_version >= 2))]
    #[bw(if(*format_version >= 2))]
    flags_raw: Option<u32>,

    pub entry_count: u32,
}

impl PckHeader {
    pub fn flags(&self) -> PckFlags {
        PckFlags::from_bits(self.flags_raw.unwrap_or(0))
    }

    pub fn engine_version(&self) -> EngineVersion {
        EngineVersion { major: self.engine_major, minor: self.engine_minor, patch: self.engine_patch }
    }

    pub fn new(format_version: u32, engine: EngineVersion, flags: PckFlags, entry_count: u32) -> Self {
        Self {
            format_version,
            engine_major: engine.major,
            engine_minor: engine.minor,
            engine_patch: engine.patch,
            flags_raw: if format_version >= 2 { Some(flags.into_bits()) } else { None },
            entry_count,
        }
    }
}
