//! Pure variant round-trip between the binary `RSRC` form and the text
//! `.tres`/`.tscn` form (spec §4.F "Binary↔text resource"). Every other
//! exporter that recovers structured data (scenes, in particular) delegates
//! here once it has a [`crate::resource::ResourceFile`] in hand.

use std::path::Path;

use crate::resource::ResourceFile;

use super::{ExportError, ExportOutcome, Exporter, LossKind};

pub struct BinaryTextExporter;

impl Exporter for BinaryTextExporter {
    fn handled_types(&self) -> &'static [&'static str] {
        &["Resource", "PackedScene"]
    }

    fn handled_importers(&self) -> &'static [&'static str] {
        &["resource_importer.binary_text"]
    }

    fn default_output_extension(&self, res_path: &str) -> String {
        if res_path.ends_with(".scn") {
            "tscn".to_string()
        } else {
            "tres".to_string()
        }
    }

    fn export_file(&self, out_path: &Path, data: &[u8]) -> Result<ExportOutcome, ExportError> {
        let resource = ResourceFile::from_binary(data)?;
        let text = resource.to_text();
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(out_path, text)?;
        Ok(ExportOutcome { destination: out_path.to_path_buf(), loss: LossKind::Lossless, messages: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::InternalResource;
    use crate::variant::Variant;
    use tempfile::tempdir;

    #[test]
    fn binary_resource_exports_as_text() {
        let resource = ResourceFile {
            resource_type: "Resource".to_string(),
            engine_major: 4,
            externals: Vec::new(),
            internal_resources: vec![InternalResource {
                id: "1".to_string(),
                type_name: "Resource".to_string(),
                properties: vec![("value".to_string(), Variant::Int(7))],
            }],
            main_properties: Vec::new(),
        };
        let binary = resource.to_binary().unwrap();

        let dir = tempdir().unwrap();
        let out = dir.path().join("thing.tres");
        let exporter = BinaryTextExporter;
        let outcome = exporter.export_file(&out, &binary).unwrap();
        assert_eq!(outcome.loss, LossKind::Lossless);
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("gd_resource"));
    }
}
