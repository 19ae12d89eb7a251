//! Rebuilding everything that ties a recovered project back together: the
//! `.import` sidecar state machine, the UID/remap cache, orphaned-addon
//! repair, and the `project.godot` configuration codec (spec §4.G).

pub mod addon;
pub mod config;
pub mod import_descriptor;
pub mod uid;

pub use addon::{repair_addon, AddonError};
pub use config::{ProjectConfig, ProjectConfigError};
pub use import_descriptor::{ImportDescriptor, ImportState};
pub use uid::{decode_uid, encode_uid, UidCache};
