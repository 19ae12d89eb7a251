//! The engine's self-describing dynamic value type (spec §4.D): the value
//! graph shared by every resource file, with a binary codec versioned by
//! engine major and a canonical text form.

pub mod codec;
pub mod text;
pub mod value;

pub use codec::{decode, encode, DependencyTable, VariantError};
pub use text::{from_text, to_text, TextParseError};
pub use value::{ObjectRef, Variant};
