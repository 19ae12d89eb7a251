//! Scenes: delegate entirely to the binary↔text resource exporter, but also
//! record a per-image hash so the project reconstructor can skip importing
//! an image that hasn't actually changed (spec §4.F "Scene").

use std::collections::HashMap;
use std::path::Path;

use crate::primitives::md5;
use crate::resource::ResourceFile;
use crate::variant::{ObjectRef, Variant};

use super::binary_text::BinaryTextExporter;
use super::{ExportError, ExportOutcome, Exporter};

pub struct SceneExporter;

impl Exporter for SceneExporter {
    fn handled_types(&self) -> &'static [&'static str] {
        &["PackedScene"]
    }

    fn handled_importers(&self) -> &'static [&'static str] {
        &["scene"]
    }

    fn default_output_extension(&self, _res_path: &str) -> String {
        "tscn".to_string()
    }

    fn export_file(&self, out_path: &Path, data: &[u8]) -> Result<ExportOutcome, ExportError> {
        BinaryTextExporter.export_file(out_path, data)
    }
}

/// Hashes every external dependency path a scene references, so the
/// reconstructor can compare against a previous export and skip a re-import
/// when nothing actually changed.
pub fn external_dependency_hashes(resource: &ResourceFile) -> HashMap<String, [u8; 16]> {
    let mut out = HashMap::new();
    for ext in &resource.externals {
        out.insert(ext.path.clone(), md5::digest(ext.path.as_bytes()));
    }
    for (_, value) in resource.main_properties.iter().chain(
        resource.internal_resources.iter().flat_map(|r| r.properties.iter()),
    ) {
        if let Variant::Object(ObjectRef::External(path)) = value {
            out.entry(path.clone()).or_insert_with(|| md5::digest(path.as_bytes()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::InternalResource;

    #[test]
    fn collects_hashes_for_every_external_reference() {
        let resource = ResourceFile {
            resource_type: "PackedScene".to_string(),
            engine_major: 4,
            externals: vec![crate::resource::ExternalDependency {
                path: "res://icon.png".to_string(),
                type_name: "Texture2D".to_string(),
            }],
            internal_resources: vec![InternalResource {
                id: "1".to_string(),
                type_name: "Sprite2D".to_string(),
                properties: vec![("texture".to_string(), Variant::Object(ObjectRef::External("res://icon.png".to_string())))],
            }],
            main_properties: Vec::new(),
        };
        let hashes = external_dependency_hashes(&resource);
        assert_eq!(hashes.len(), 1);
        assert!(hashes.contains_key("res://icon.png"));
    }
}
