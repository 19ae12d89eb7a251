//! Binary primitives shared by every codec in the crate (spec §4.A).
//!
//! A bounded cursor provides fallible little-endian integer/float reads and
//! writes, length-prefixed string codecs in UTF-8/UTF-16/UTF-32, and 4-byte
//! alignment helpers. Everything here is the foundation [`crate::variant`],
//! [`crate::package`], and [`crate::bytecode`] are built on; none of it
//! understands resource or package semantics.

pub mod cursor;
pub mod md5;
pub mod strings;

pub use cursor::{Cursor, CursorError};
