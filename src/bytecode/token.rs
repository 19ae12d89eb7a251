//! The compiled-script token stream: header, four tables (identifiers,
//! constants, line map, column map), then tokens (spec §4.E "Decoding").
//!
//! Wire note: the original format distinguishes a token's 5-byte vs 8-byte
//! form by re-reading part of the following `start_line` field and relying
//! on line numbers staying under 2^23 so a stray high bit never lands on
//! the form flag. We use an explicit tag byte per token instead — slightly
//! larger, never ambiguous.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::primitives::cursor::{Cursor, CursorError, Writer};
use crate::variant::{self, DependencyTable, Variant, VariantError};

use super::reindent;
use super::revision::Revision;

pub const MAGIC: [u8; 4] = *b"GDSC";
const XOR_KEY: u8 = 0xb6;

#[derive(Debug, Error)]
pub enum BytecodeError {
    #[error("CORRUPT_HEADER: {0}")]
    CorruptHeader(String),

    #[error("TRUNCATED: {0}")]
    Truncated(#[from] CursorError),

    #[error("variant codec error decoding a constant: {0}")]
    Variant(#[from] VariantError),

    #[error(transparent)]
    Revision(#[from] super::revision::RevisionError),

    #[error("zstd decompression failed: {0}")]
    Decompress(String),

    #[error("CORRUPT_HEADER: identifier table entry {0} has a length that overruns the buffer")]
    IdentifierTableOverrun(usize),

    #[error("CORRUPT_HEADER: token references out-of-range opcode {0}")]
    UnknownOpcode(u16),

    #[error("CORRUPT_HEADER: token references identifier index {0}, table has {1} entries")]
    IdentifierIndexOutOfRange(u32, usize),

    #[error("CORRUPT_HEADER: token references constant index {0}, table has {1} entries")]
    ConstantIndexOutOfRange(u32, usize),
}

/// The canonical opcode set this crate decompiles to. Revisions remap their
/// own on-disk opcode values onto these through [`Revision::opcode_map`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    Newline = 0,
    Indent = 1,
    Dedent = 2,
    Eof = 3,
    Identifier = 4,
    Annotation = 5,
    Constant = 6,
    ErrorTok = 7,
    ParenOpen = 8,
    ParenClose = 9,
    BracketOpen = 10,
    BracketClose = 11,
    BraceOpen = 12,
    BraceClose = 13,
    Comma = 14,
    Colon = 15,
    Period = 16,
    Arrow = 17,
    Plus = 18,
    Minus = 19,
    Star = 20,
    Slash = 21,
    Percent = 22,
    Equal = 23,
    EqualEqual = 24,
    NotEqual = 25,
    Less = 26,
    LessEqual = 27,
    Greater = 28,
    GreaterEqual = 29,
    And = 30,
    Or = 31,
    Not = 32,
    If = 33,
    Elif = 34,
    Else = 35,
    For = 36,
    While = 37,
    Func = 38,
    Var = 39,
    Const = 40,
    Return = 41,
    Pass = 42,
    Break = 43,
    Continue = 44,
    Class = 45,
    Extends = 46,
    SelfKw = 47,
    True = 48,
    False = 49,
    Null = 50,
}

impl Opcode {
    pub const COUNT: usize = 51;

    /// `Indent`/`Dedent` never appear on the wire (see [`encode`]/[`decode`]
    /// and [`super::reindent::synthesize_indentation`]); a revision's opcode
    /// map only needs to cover the remaining, genuinely-encoded opcodes.
    pub const WIRE_COUNT: usize = Self::COUNT - 2;

    pub const ALL: [Opcode; Self::COUNT] = [
        Opcode::Newline,
        Opcode::Indent,
        Opcode::Dedent,
        Opcode::Eof,
        Opcode::Identifier,
        Opcode::Annotation,
        Opcode::Constant,
        Opcode::ErrorTok,
        Opcode::ParenOpen,
        Opcode::ParenClose,
        Opcode::BracketOpen,
        Opcode::BracketClose,
        Opcode::BraceOpen,
        Opcode::BraceClose,
        Opcode::Comma,
        Opcode::Colon,
        Opcode::Period,
        Opcode::Arrow,
        Opcode::Plus,
        Opcode::Minus,
        Opcode::Star,
        Opcode::Slash,
        Opcode::Percent,
        Opcode::Equal,
        Opcode::EqualEqual,
        Opcode::NotEqual,
        Opcode::Less,
        Opcode::LessEqual,
        Opcode::Greater,
        Opcode::GreaterEqual,
        Opcode::And,
        Opcode::Or,
        Opcode::Not,
        Opcode::If,
        Opcode::Elif,
        Opcode::Else,
        Opcode::For,
        Opcode::While,
        Opcode::Func,
        Opcode::Var,
        Opcode::Const,
        Opcode::Return,
        Opcode::Pass,
        Opcode::Break,
        Opcode::Continue,
        Opcode::Class,
        Opcode::Extends,
        Opcode::SelfKw,
        Opcode::True,
        Opcode::False,
        Opcode::Null,
    ];

    /// Builds the local↔canonical table over [`Self::WIRE_COUNT`] entries,
    /// skipping `Indent`/`Dedent` since those are never assigned a wire
    /// opcode value at all.
    pub const fn identity_map() -> [(u16, Opcode); Self::WIRE_COUNT] {
        let mut out = [(0u16, Opcode::Newline); Self::WIRE_COUNT];
        let mut i = 0;
        let mut j = 0;
        while i < Self::COUNT {
            let op = Self::ALL[i];
            if !matches!(op, Opcode::Indent | Opcode::Dedent) {
                out[j] = (op as u16, op);
                j += 1;
            }
            i += 1;
        }
        out
    }

    /// Swaps the local wire values of `Comma` and `Period` relative to
    /// [`identity_map`] — a stand-in for the kind of single-pair opcode
    /// drift that separates real adjacent micro-revisions.
    pub const fn early_swap_map() -> [(u16, Opcode); Self::WIRE_COUNT] {
        let mut out = Self::identity_map();
        let mut i = 0;
        let mut comma_idx = 0;
        let mut period_idx = 0;
        while i < Self::WIRE_COUNT {
            if matches!(out[i].1, Opcode::Comma) {
                comma_idx = i;
            }
            if matches!(out[i].1, Opcode::Period) {
                period_idx = i;
            }
            i += 1;
        }
        let tmp = out[comma_idx].0;
        out[comma_idx].0 = out[period_idx].0;
        out[period_idx].0 = tmp;
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Op(Opcode),
    Identifier(String),
    Annotation(String),
    Constant(Variant),
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BytecodeFile {
    pub bytecode_version: u32,
    pub tokens: Vec<Token>,
}

/// A token before identifier/constant/opcode resolution — used by
/// [`super::revision::detect_revision`]'s fingerprint, since picking a
/// revision is a precondition for resolving opcodes at all.
#[derive(Debug, Clone, Copy)]
pub struct RawToken {
    pub opcode_local: u16,
    pub operand: Option<u32>,
}

const TAG_COMPACT: u8 = 0;
const TAG_EXTENDED: u8 = 1;

fn legacy_content_header(bytecode_version: u32) -> bool {
    bytecode_version < 100
}

pub fn decode(data: &[u8]) -> Result<(BytecodeFile, &'static Revision), BytecodeError> {
    debug!(bytes = data.len(), "decoding bytecode file");
    let mut outer = Cursor::new(data);
    let magic = outer.read_bytes(4)?;
    if magic != MAGIC.as_slice() {
        warn!(found = ?magic, "bytecode file missing GDSC magic");
        return Err(BytecodeError::CorruptHeader(format!("expected 'GDSC', found {magic:?}")));
    }
    let bytecode_version = outer.read_u32()?;
    let decompressed_size = outer.read_u32()?;
    let rest = outer.read_bytes(outer.remaining() as usize)?;

    let contents = if decompressed_size == 0 {
        rest.to_vec()
    } else {
        zstd::decode_all(rest).map_err(|e| BytecodeError::Decompress(e.to_string()))?
    };

    let mut c = Cursor::new(&contents);
    let identifier_count = c.read_u32()?;
    let constant_count = c.read_u32()?;
    let token_line_count = c.read_u32()?;
    if legacy_content_header(bytecode_version) {
        c.read_u32()?; // reserved, unused even by the original
    }
    let token_count = c.read_u32()?;

    let identifiers = read_identifier_table(&mut c, identifier_count)?;
    let deps = DependencyTable::default();
    let mut constants = Vec::with_capacity(constant_count as usize);
    for _ in 0..constant_count {
        constants.push(variant::decode(&mut c, 4, &deps)?);
    }

    let mut lines = BTreeMap::new();
    for _ in 0..token_line_count {
        let idx = c.read_u32()?;
        let line = c.read_u32()?;
        lines.insert(idx, line);
    }
    let mut columns = BTreeMap::new();
    for _ in 0..token_line_count {
        let idx = c.read_u32()?;
        let col = c.read_u32()?;
        columns.insert(idx, col);
    }

    let mut raw_tokens = Vec::with_capacity(token_count as usize);
    for _ in 0..token_count {
        raw_tokens.push(read_raw_token(&mut c)?);
    }

    let revision = super::revision::detect_revision(bytecode_version, &raw_tokens)?;

    let mut tokens = Vec::with_capacity(raw_tokens.len());
    let mut last_line = 0u32;
    let mut last_column = 0u32;
    for (i, raw) in raw_tokens.iter().enumerate() {
        let opcode = revision
            .local_to_canonical(raw.opcode_local)
            .ok_or(BytecodeError::UnknownOpcode(raw.opcode_local))?;
        let kind = match opcode {
            Opcode::Identifier => {
                let idx = raw.operand.unwrap_or(0);
                resolve_identifier(&identifiers, idx).map(TokenKind::Identifier)?
            }
            Opcode::Annotation => {
                let idx = raw.operand.unwrap_or(0);
                resolve_identifier(&identifiers, idx).map(TokenKind::Annotation)?
            }
            Opcode::Constant | Opcode::ErrorTok => {
                let idx = raw.operand.unwrap_or(0);
                let value = constants
                    .get(idx as usize)
                    .cloned()
                    .ok_or(BytecodeError::ConstantIndexOutOfRange(idx, constants.len()))?;
                if opcode == Opcode::ErrorTok {
                    TokenKind::Error(format!("{value:?}"))
                } else {
                    TokenKind::Constant(value)
                }
            }
            other => TokenKind::Op(other),
        };

        if let Some(&line) = lines.get(&(i as u32)) {
            last_line = line;
        }
        if let Some(&col) = columns.get(&(i as u32)) {
            last_column = col;
        }
        tokens.push(Token { kind, line: last_line, column: last_column });
    }

    let tokens = reindent::synthesize_indentation(tokens);
    debug!(revision = revision.name, tokens = tokens.len(), "decoded bytecode file");
    Ok((BytecodeFile { bytecode_version, tokens }, revision))
}

fn resolve_identifier(identifiers: &[String], idx: u32) -> Result<String, BytecodeError> {
    identifiers
        .get(idx as usize)
        .cloned()
        .ok_or(BytecodeError::IdentifierIndexOutOfRange(idx, identifiers.len()))
}

fn read_identifier_table(c: &mut Cursor, count: u32) -> Result<Vec<String>, BytecodeError> {
    let mut out = Vec::with_capacity(count as usize);
    for i in 0..count {
        let len = c.read_u32()? as usize;
        let mut codepoints = Vec::with_capacity(len);
        for _ in 0..len {
            let raw = c.read_bytes(4)?;
            let deobfuscated = [raw[0] ^ XOR_KEY, raw[1] ^ XOR_KEY, raw[2] ^ XOR_KEY, raw[3] ^ XOR_KEY];
            let code = u32::from_le_bytes(deobfuscated);
            codepoints.push(char::from_u32(code).ok_or_else(|| BytecodeError::IdentifierTableOverrun(i as usize))?);
        }
        out.push(codepoints.into_iter().collect());
    }
    Ok(out)
}

fn read_raw_token(c: &mut Cursor) -> Result<RawToken, BytecodeError> {
    let tag = c.read_u8()?;
    match tag {
        TAG_COMPACT => {
            let opcode_local = c.read_u16()?;
            let _start_line = c.read_u32()?;
            Ok(RawToken { opcode_local, operand: None })
        }
        TAG_EXTENDED => {
            let opcode_local = c.read_u16()?;
            let operand = c.read_u32()?;
            let _start_line = c.read_u32()?;
            Ok(RawToken { opcode_local, operand: Some(operand) })
        }
        other => Err(BytecodeError::CorruptHeader(format!("unknown token tag byte {other}"))),
    }
}

/// Re-encodes `file` under `revision`, optionally zstd-compressing the
/// content section (spec §4.E "Encryption" note: callers decrypt via
/// [`crate::cipher`] before calling this, or encrypt the result after).
pub fn encode(file: &BytecodeFile, revision: &Revision, compress: bool) -> Result<Vec<u8>, BytecodeError> {
    let mut identifiers: Vec<String> = Vec::new();
    let mut identifier_index = std::collections::HashMap::new();
    let mut constants: Vec<Variant> = Vec::new();

    let deps = DependencyTable::default();
    let mut lines = Vec::new();
    let mut columns = Vec::new();
    let mut token_bytes = Writer::new();

    let mut last_line = 0u32;
    let mut last_column = 0u32;
    // `Indent`/`Dedent` are re-derived on decode by
    // `reindent::synthesize_indentation` rather than stored on the wire, so
    // they're skipped here; `wire_idx` (not the position in `file.tokens`)
    // is what the lines/columns sparse maps and the token-count header
    // field key off of.
    let mut wire_idx: u32 = 0;
    for token in file.tokens.iter() {
        if matches!(token.kind, TokenKind::Op(Opcode::Indent) | TokenKind::Op(Opcode::Dedent)) {
            continue;
        }
        let (opcode, operand) = match &token.kind {
            TokenKind::Op(op) => (*op, None),
            TokenKind::Identifier(name) => (Opcode::Identifier, Some(intern(&mut identifiers, &mut identifier_index, name))),
            TokenKind::Annotation(name) => (Opcode::Annotation, Some(intern(&mut identifiers, &mut identifier_index, name))),
            TokenKind::Constant(value) => {
                constants.push(value.clone());
                (Opcode::Constant, Some((constants.len() - 1) as u32))
            }
            TokenKind::Error(message) => {
                constants.push(Variant::String(message.clone()));
                (Opcode::ErrorTok, Some((constants.len() - 1) as u32))
            }
        };
        let local = revision.canonical_to_local(opcode).ok_or(BytecodeError::UnknownOpcode(opcode as u16))?;

        if token.line != last_line {
            lines.push((wire_idx, token.line));
            last_line = token.line;
        }
        if token.column != last_column {
            columns.push((wire_idx, token.column));
            last_column = token.column;
        }

        match operand {
            None => {
                token_bytes.write_u8(TAG_COMPACT);
                token_bytes.write_u16(local);
                token_bytes.write_u32(token.line);
            }
            Some(idx) => {
                token_bytes.write_u8(TAG_EXTENDED);
                token_bytes.write_u16(local);
                token_bytes.write_u32(idx);
                token_bytes.write_u32(token.line);
            }
        }
        wire_idx += 1;
    }

    let mut content = Writer::new();
    content.write_u32(identifiers.len() as u32);
    content.write_u32(constants.len() as u32);
    content.write_u32(lines.len() as u32);
    if legacy_content_header(file.bytecode_version) {
        content.write_u32(0);
    }
    content.write_u32(wire_idx);

    for id in &identifiers {
        let codepoints: Vec<u32> = id.chars().map(|c| c as u32).collect();
        content.write_u32(codepoints.len() as u32);
        for cp in codepoints {
            let bytes = cp.to_le_bytes();
            content.write_bytes(&[bytes[0] ^ XOR_KEY, bytes[1] ^ XOR_KEY, bytes[2] ^ XOR_KEY, bytes[3] ^ XOR_KEY]);
        }
    }
    for constant in &constants {
        variant::encode(constant, &mut content, 4, &deps)?;
    }
    for (idx, line) in &lines {
        content.write_u32(*idx);
        content.write_u32(*line);
    }
    for (idx, col) in &columns {
        content.write_u32(*idx);
        content.write_u32(*col);
    }
    content.write_bytes(&token_bytes.into_inner());

    let content_bytes = content.into_inner();
    let mut out = Writer::new();
    out.write_bytes(&MAGIC);
    out.write_u32(file.bytecode_version);
    if compress {
        let compressed = zstd::encode_all(content_bytes.as_slice(), 0).map_err(|e| BytecodeError::Decompress(e.to_string()))?;
        out.write_u32(content_bytes.len() as u32);
        out.write_bytes(&compressed);
    } else {
        out.write_u32(0);
        out.write_bytes(&content_bytes);
    }
    Ok(out.into_inner())
}

fn intern(table: &mut Vec<String>, index: &mut std::collections::HashMap<String, u32>, name: &str) -> u32 {
    if let Some(&idx) = index.get(name) {
        return idx;
    }
    let idx = table.len() as u32;
    table.push(name.to_string());
    index.insert(name.to_string(), idx);
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::revision::GODOT_4_CURRENT;

    fn sample() -> BytecodeFile {
        BytecodeFile {
            bytecode_version: GODOT_4_CURRENT.bytecode_version,
            tokens: vec![
                Token { kind: TokenKind::Op(Opcode::Func), line: 1, column: 0 },
                Token { kind: TokenKind::Identifier("f".to_string()), line: 1, column: 5 },
                Token { kind: TokenKind::Op(Opcode::ParenOpen), line: 1, column: 6 },
                Token { kind: TokenKind::Op(Opcode::ParenClose), line: 1, column: 7 },
                Token { kind: TokenKind::Op(Opcode::Colon), line: 1, column: 8 },
                Token { kind: TokenKind::Op(Opcode::Newline), line: 1, column: 9 },
                Token { kind: TokenKind::Op(Opcode::Indent), line: 2, column: 4 },
                Token { kind: TokenKind::Op(Opcode::Return), line: 2, column: 4 },
                Token { kind: TokenKind::Constant(Variant::Int(1)), line: 2, column: 11 },
                Token { kind: TokenKind::Op(Opcode::Newline), line: 2, column: 12 },
                Token { kind: TokenKind::Op(Opcode::Dedent), line: 3, column: 0 },
                Token { kind: TokenKind::Op(Opcode::Eof), line: 3, column: 0 },
            ],
        }
    }

    #[test]
    fn uncompressed_round_trips() {
        let file = sample();
        let bytes = encode(&file, &GODOT_4_CURRENT, false).unwrap();
        let (decoded, revision) = decode(&bytes).unwrap();
        assert_eq!(decoded, file);
        assert_eq!(revision.name, GODOT_4_CURRENT.name);
    }

    #[test]
    fn compressed_round_trips() {
        let file = sample();
        let bytes = encode(&file, &GODOT_4_CURRENT, true).unwrap();
        let (decoded, _) = decode(&bytes).unwrap();
        assert_eq!(decoded, file);
    }

    #[test]
    fn bad_magic_is_rejected() {
        assert!(decode(b"xxxx0000000000000000").is_err());
    }

    #[test]
    fn decode_synthesizes_indentation_even_when_the_input_never_stored_it() {
        // Nothing in `encode`'s input carries a structural Indent/Dedent at
        // all; they're still never written to the wire (see `encode`'s
        // `wire_idx` skip), so this asserts decode reconstructs them purely
        // from `synthesize_indentation` rather than from stored tokens.
        let file = BytecodeFile {
            bytecode_version: GODOT_4_CURRENT.bytecode_version,
            tokens: vec![
                Token { kind: TokenKind::Op(Opcode::Func), line: 1, column: 0 },
                Token { kind: TokenKind::Identifier("f".to_string()), line: 1, column: 5 },
                Token { kind: TokenKind::Op(Opcode::ParenOpen), line: 1, column: 6 },
                Token { kind: TokenKind::Op(Opcode::ParenClose), line: 1, column: 7 },
                Token { kind: TokenKind::Op(Opcode::Colon), line: 1, column: 8 },
                Token { kind: TokenKind::Op(Opcode::Newline), line: 1, column: 9 },
                Token { kind: TokenKind::Op(Opcode::Return), line: 2, column: 4 },
                Token { kind: TokenKind::Constant(Variant::Int(1)), line: 2, column: 11 },
                Token { kind: TokenKind::Op(Opcode::Newline), line: 2, column: 12 },
                Token { kind: TokenKind::Op(Opcode::Eof), line: 3, column: 0 },
            ],
        };
        let bytes = encode(&file, &GODOT_4_CURRENT, false).unwrap();
        let (decoded, _) = decode(&bytes).unwrap();
        assert_eq!(decoded, sample());
    }
}
