//! The `.import` sidecar rewrite state machine (spec §4.G "Import-descriptor
//! rewriting").
//!
//! Open Question decision: editor-variant sidecars (a resource's embedded
//! "editor" copy, used by the editor for a faster preview) are materialized
//! next to the primary output as an empty dictionary resource — the
//! conservative reading of "has_editor_variant" when the original editor
//! copy's actual contents aren't recoverable from the package alone.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    /// Source path and MD5 are unchanged; the sidecar is kept verbatim.
    NotDirty,
    /// Source path moved and/or MD5 changed; the sidecar was rewritten.
    Rewritten,
    /// The exporter failed to recover this resource at all.
    Failed,
    /// The source type has no importer in this engine version.
    NotImportable,
    /// The recovered bytes don't match the MD5 recorded in the sidecar.
    Md5Failed,
}

#[derive(Debug, Clone)]
pub struct ImportDescriptor {
    pub source_path: String,
    pub importer: String,
    pub resource_type: String,
    pub uid: Option<u64>,
    pub dest_files: Vec<String>,
    pub has_editor_variant: bool,
    pub params: BTreeMap<String, String>,
    pub state: ImportState,
}

impl ImportDescriptor {
    pub fn new(source_path: impl Into<String>, importer: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            importer: importer.into(),
            resource_type: resource_type.into(),
            uid: None,
            dest_files: Vec::new(),
            has_editor_variant: false,
            params: BTreeMap::new(),
            state: ImportState::NotDirty,
        }
    }

    /// Applies the outcome of re-exporting this descriptor's resource.
    /// `new_source` is `None` when the recovered file landed at the same
    /// path the descriptor already pointed at.
    pub fn mark_rewritten(&mut self, new_source: Option<String>, new_md5: &str, old_md5: &str) {
        if new_source.is_some() || new_md5 != old_md5 {
            if let Some(path) = new_source {
                self.source_path = path;
            }
            self.state = ImportState::Rewritten;
        } else {
            self.state = ImportState::NotDirty;
        }
    }

    pub fn mark_failed(&mut self) {
        self.state = ImportState::Failed;
    }

    pub fn mark_not_importable(&mut self) {
        self.state = ImportState::NotImportable;
    }

    pub fn mark_md5_failed(&mut self) {
        self.state = ImportState::Md5Failed;
    }

    /// The `.import` sidecar's own minimal `config_version=1` text form;
    /// `[params]` carries whatever importer-specific options were recorded.
    pub fn to_import_text(&self) -> String {
        let mut out = String::from("[remap]\n\n");
        out.push_str(&format!("importer=\"{}\"\n", self.importer));
        out.push_str(&format!("type=\"{}\"\n", self.resource_type));
        if let Some(uid) = self.uid {
            out.push_str(&format!("uid=\"{}\"\n", super::uid::encode_uid(uid)));
        }
        out.push_str(&format!("path=\"{}\"\n", self.source_path));
        out.push('\n');
        if !self.params.is_empty() {
            out.push_str("[params]\n\n");
            for (key, value) in &self.params {
                out.push_str(&format!("{key}={value}\n"));
            }
        }
        out
    }

    /// The path an editor-variant sidecar is written to, if this descriptor
    /// carries one — an empty-dictionary resource, per the Open Question
    /// decision above.
    pub fn editor_variant_path(&self) -> Option<String> {
        self.has_editor_variant.then(|| format!("{}.editor", self.source_path))
    }
}
