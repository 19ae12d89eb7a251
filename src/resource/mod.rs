//! Resource files: the binary `RSRC`-magic form and the text `.tres`/`.tscn`
//! form, both wrapping the variant codec in [`crate::variant`] (spec §4.D).

pub mod file;

pub use file::{ExternalDependency, InternalResource, ResourceError, ResourceFile};
