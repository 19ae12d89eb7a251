//! Crate-wide error kinds, stable across the wire per spec §7.
//!
//! Individual modules define their own `thiserror` enums and decorate them
//! with context (offset, field name) as they propagate; [`GdreError`] is the
//! shape the orchestrator folds everything into once a failure is no longer
//! local to one task.

use std::fmt;
use thiserror::Error;

/// Stable, wire-friendly identifier for an error kind (spec §7 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Truncated,
    CorruptHeader,
    UnsupportedVersion,
    Unauthorized,
    HashMismatch,
    Unavailable,
    UnimplementedRevision,
    Cancelled,
    Lossy,
    DependencyMissing,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Truncated => "TRUNCATED",
            ErrorKind::CorruptHeader => "CORRUPT_HEADER",
            ErrorKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::HashMismatch => "HASH_MISMATCH",
            ErrorKind::Unavailable => "UNAVAILABLE",
            ErrorKind::UnimplementedRevision => "UNIMPLEMENTED_REVISION",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::Lossy => "LOSSY",
            ErrorKind::DependencyMissing => "DEPENDENCY_MISSING",
        };
        f.write_str(s)
    }
}

/// A decorated error with the kind, a human message, and optional byte offset.
#[derive(Debug, Error)]
#[error("{kind}: {message}{}", offset.map(|o| format!(" (at offset {o})")).unwrap_or_default())]
pub struct GdreError {
    pub kind: ErrorKind,
    pub message: String,
    pub offset: Option<u64>,
}

impl GdreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), offset: None }
    }

    pub fn at(kind: ErrorKind, message: impl Into<String>, offset: u64) -> Self {
        Self { kind, message: message.into(), offset: Some(offset) }
    }

    /// Attaches positional context to an existing error without changing its kind.
    pub fn with_context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }
}

impl From<crate::exporters::ExportError> for GdreError {
    fn from(err: crate::exporters::ExportError) -> Self {
        use crate::exporters::ExportError;
        match err {
            ExportError::Resource(e) => GdreError::new(ErrorKind::CorruptHeader, e.to_string()),
            ExportError::Bytecode(e) => e.into(),
            ExportError::Variant(e) => e.into(),
            ExportError::Io(e) => GdreError::new(ErrorKind::Unavailable, e.to_string()),
            ExportError::Unsupported(s) => GdreError::new(ErrorKind::UnimplementedRevision, s),
            ExportError::Malformed(s) => GdreError::new(ErrorKind::CorruptHeader, s),
        }
    }
}

impl From<crate::package::PckError> for GdreError {
    fn from(err: crate::package::PckError) -> Self {
        use crate::package::PckError;
        let kind = match &err {
            PckError::TruncatedEntry { .. } => ErrorKind::Truncated,
            PckError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            PckError::Unauthorized(_) => ErrorKind::Unauthorized,
            PckError::CorruptHeader(_) | PckError::Parse(_) | PckError::DuplicatePath(_) => ErrorKind::CorruptHeader,
            PckError::EntryNotFound(_) => ErrorKind::Unavailable,
            PckError::Io(_) => ErrorKind::Unavailable,
        };
        GdreError::new(kind, err.to_string())
    }
}

impl From<crate::bytecode::BytecodeError> for GdreError {
    fn from(err: crate::bytecode::BytecodeError) -> Self {
        GdreError::new(ErrorKind::CorruptHeader, err.to_string())
    }
}

impl From<crate::variant::VariantError> for GdreError {
    fn from(err: crate::variant::VariantError) -> Self {
        GdreError::new(ErrorKind::CorruptHeader, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_error_carries_through_as_a_gdre_error() {
        let err: GdreError = crate::exporters::ExportError::Malformed("bad wrapper".to_string()).into();
        assert_eq!(err.kind, ErrorKind::CorruptHeader);
        assert!(err.to_string().contains("bad wrapper"));
    }

    #[test]
    fn with_context_prefixes_the_message_without_changing_the_kind() {
        let err = GdreError::new(ErrorKind::Truncated, "entry ran past package end").with_context("res://icon.png");
        assert_eq!(err.kind, ErrorKind::Truncated);
        assert_eq!(err.message, "res://icon.png: entry ran past package end");
    }
}
