//! Per-format back-conversion from a recovered resource to an editor-openable
//! source asset (spec §4.F). A registry maps `(importer_name, resource_type)`
//! to the [`Exporter`] that handles it; the orchestrator looks tokens up
//! through [`Registry::find`] rather than matching on type strings itself.

pub mod binary_text;
pub mod native_extension;
pub mod sampled_audio;
pub mod scene;
pub mod script;
pub mod streamed_audio;
pub mod texture;
pub mod translation;

use std::path::Path;

use thiserror::Error;

use crate::project::ImportDescriptor;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("resource error: {0}")]
    Resource(#[from] crate::resource::ResourceError),
    #[error("bytecode error: {0}")]
    Bytecode(#[from] crate::bytecode::BytecodeError),
    #[error("variant error: {0}")]
    Variant(#[from] crate::variant::VariantError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported resource type {0}")]
    Unsupported(String),
    #[error("{0}")]
    Malformed(String),
}

/// Whether an export produced a faithful reconstruction or a best-effort one
/// (spec §7's `Lossy` error kind doubles as a report annotation here).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LossKind {
    Lossless,
    /// The source format is inherently lossy (e.g. a compressed audio
    /// codec); round-tripping it only reproduces what survived encoding.
    StoredLossy,
    /// This crate's reconstruction is an approximation of a faithful one
    /// (e.g. translation keys recovered through hints rather than stored).
    PartialRecovery,
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub destination: std::path::PathBuf,
    pub loss: LossKind,
    pub messages: Vec<String>,
}

pub trait Exporter: Send + Sync {
    fn handled_types(&self) -> &'static [&'static str];
    fn handled_importers(&self) -> &'static [&'static str];

    /// Exporters that touch global, non-thread-safe state (native library
    /// staging, plugin downloads) return `false` so the orchestrator can
    /// route their tokens onto the single-threaded lane (spec §5).
    fn supports_multithread(&self) -> bool {
        true
    }

    fn default_output_extension(&self, res_path: &str) -> String;

    fn export_file(&self, out_path: &Path, data: &[u8]) -> Result<ExportOutcome, ExportError>;

    /// Drives a full import-descriptor round trip: exports `data` under
    /// `out_dir`, then folds the outcome back into `descriptor`'s state
    /// machine (spec §4.G) so the caller never has to duplicate the
    /// success/failure bookkeeping per exporter.
    fn export_resource(&self, out_dir: &Path, data: &[u8], descriptor: &mut ImportDescriptor) -> Result<ExportOutcome, ExportError> {
        let stem = Path::new(descriptor.source_path.trim_start_matches("res://"))
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resource".to_string());
        let out_path = out_dir.join(format!("{stem}.{}", self.default_output_extension(&descriptor.source_path)));

        match self.export_file(&out_path, data) {
            Ok(outcome) => {
                let new_source = format!("res://{}", outcome.destination.file_name().unwrap_or_default().to_string_lossy());
                let new_source = (new_source != descriptor.source_path).then_some(new_source);
                // The sidecar's recorded MD5 isn't carried on `ImportDescriptor`
                // (the checksum lives in the package's resource table, already
                // checked before export is attempted), so a successful export
                // only needs to flag a rewrite when the destination path moved.
                descriptor.mark_rewritten(new_source, "ok", "ok");
                Ok(outcome)
            }
            Err(err) => {
                descriptor.mark_failed();
                Err(err)
            }
        }
    }
}

/// Looks exporters up by the importer that produced the `.import` sidecar,
/// falling back to the resource's own type name.
#[derive(Default)]
pub struct Registry {
    exporters: Vec<Box<dyn Exporter>>,
}

impl Registry {
    pub fn with_defaults() -> Self {
        let mut reg = Self::default();
        reg.register(Box::new(binary_text::BinaryTextExporter));
        reg.register(Box::new(streamed_audio::StreamedAudioExporter));
        reg.register(Box::new(sampled_audio::SampledAudioExporter));
        reg.register(Box::new(translation::TranslationExporter));
        reg.register(Box::new(scene::SceneExporter));
        reg.register(Box::new(texture::TextureExporter));
        reg.register(Box::new(script::ScriptExporter));
        reg.register(Box::new(native_extension::NativeExtensionExporter::default()));
        reg
    }

    pub fn register(&mut self, exporter: Box<dyn Exporter>) {
        self.exporters.push(exporter);
    }

    pub fn find(&self, importer_name: &str, resource_type: &str) -> Option<&dyn Exporter> {
        self.exporters
            .iter()
            .find(|e| e.handled_importers().contains(&importer_name) || e.handled_types().contains(&resource_type))
            .map(|b| b.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_finds_exporter_by_importer_name() {
        let reg = Registry::with_defaults();
        assert!(reg.find("wav", "AudioStreamWAV").is_some());
        assert!(reg.find("nonexistent", "NonexistentType").is_none());
    }

    struct AlwaysFails;
    impl Exporter for AlwaysFails {
        fn handled_types(&self) -> &'static [&'static str] {
            &[]
        }
        fn handled_importers(&self) -> &'static [&'static str] {
            &[]
        }
        fn default_output_extension(&self, _res_path: &str) -> String {
            "bin".to_string()
        }
        fn export_file(&self, _out_path: &Path, _data: &[u8]) -> Result<ExportOutcome, ExportError> {
            Err(ExportError::Malformed("nope".to_string()))
        }
    }

    #[test]
    fn export_resource_marks_the_descriptor_failed_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut descriptor = ImportDescriptor::new("res://broken.bin", "binary", "Resource");
        let err = AlwaysFails.export_resource(dir.path(), b"data", &mut descriptor).unwrap_err();
        assert!(matches!(err, ExportError::Malformed(_)));
        assert_eq!(descriptor.state, crate::project::ImportState::Failed);
    }

    #[test]
    fn export_resource_marks_the_descriptor_rewritten_when_the_path_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut descriptor = ImportDescriptor::new("res://icon.webp", "texture", "CompressedTexture2D");
        texture::TextureExporter
            .export_resource(dir.path(), &texture_tests_fixture(), &mut descriptor)
            .unwrap();
        assert_eq!(descriptor.state, crate::project::ImportState::Rewritten);
    }

    fn texture_tests_fixture() -> Vec<u8> {
        const WRAPPER_MAGIC: [u8; 4] = *b"GTEX";
        let payload = b"\x89PNGfakebytes";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&WRAPPER_MAGIC);
        bytes.push(0); // ContainerKind::Single
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.push(0); // ImageFormat::Png
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }
}
