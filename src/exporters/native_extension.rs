//! Native-extension manifests (`.gdextension`): copies the matching shared
//! library from a local plugin cache, or fetches it through an injected
//! [`PluginSource`] when it isn't cached (spec §4.F "Native-extension
//! manifest" — explicitly an external collaborator, not something this
//! crate implements a network client for).

use std::path::Path;

use super::{ExportError, ExportOutcome, Exporter, LossKind};

/// Supplies native library bytes for a `.gdextension` manifest's platform
/// entries. Implementations talk to the asset library, GitHub, GitLab, or
/// Codeberg per spec §6's persisted plugin-version cache; this crate only
/// defines the seam.
pub trait PluginSource: Send + Sync {
    fn fetch(&self, library_path: &str) -> Result<Vec<u8>, ExportError>;
}

/// A source that only serves libraries already present verbatim in the
/// package being exported — the default when no network collaborator is
/// configured.
pub struct LocalOnlySource<'a> {
    pub find_in_package: Box<dyn Fn(&str) -> Option<Vec<u8>> + Send + Sync + 'a>,
}

impl<'a> PluginSource for LocalOnlySource<'a> {
    fn fetch(&self, library_path: &str) -> Result<Vec<u8>, ExportError> {
        (self.find_in_package)(library_path)
            .ok_or_else(|| ExportError::Unsupported(format!("no local copy of '{library_path}' and no plugin source configured")))
    }
}

pub struct NativeExtensionExporter<'a> {
    pub source: Box<dyn PluginSource + 'a>,
}

impl<'a> NativeExtensionExporter<'a> {
    pub fn new(source: impl PluginSource + 'a) -> Self {
        Self { source: Box::new(source) }
    }
}

impl<'a> Exporter for NativeExtensionExporter<'a> {
    fn handled_types(&self) -> &'static [&'static str] {
        &["GDExtension"]
    }

    fn handled_importers(&self) -> &'static [&'static str] {
        &["gdextension"]
    }

    fn supports_multithread(&self) -> bool {
        false
    }

    fn default_output_extension(&self, _res_path: &str) -> String {
        "gdextension".to_string()
    }

    fn export_file(&self, out_path: &Path, data: &[u8]) -> Result<ExportOutcome, ExportError> {
        let manifest = std::str::from_utf8(data).map_err(|e| ExportError::Malformed(e.to_string()))?;
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(out_path, manifest)?;

        let mut messages = Vec::new();
        for library_path in manifest.lines().filter_map(|l| l.trim().strip_prefix("library_path=")) {
            match self.source.fetch(library_path) {
                Ok(bytes) => {
                    let lib_dest = out_path.with_file_name(Path::new(library_path).file_name().unwrap_or_default());
                    std::fs::write(lib_dest, bytes)?;
                }
                Err(e) => messages.push(format!("native library '{library_path}' not recovered: {e}")),
            }
        }

        Ok(ExportOutcome { destination: out_path.to_path_buf(), loss: LossKind::Lossless, messages })
    }
}

impl Default for NativeExtensionExporter<'static> {
    fn default() -> Self {
        Self::new(LocalOnlySource { find_in_package: Box::new(|_| None) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn manifest_is_written_and_missing_library_is_reported() {
        let exporter = NativeExtensionExporter::default();
        let manifest = b"[configuration]\nentry_symbol=init\n\n[libraries]\nlibrary_path=libfoo.so\n";
        let dir = tempdir().unwrap();
        let out = dir.path().join("addon.gdextension");
        let outcome = exporter.export_file(&out, manifest).unwrap();
        assert!(std::fs::read(&out).is_ok());
        assert_eq!(outcome.messages.len(), 1);
    }

    #[test]
    fn local_source_serves_a_cached_library() {
        let source = LocalOnlySource { find_in_package: Box::new(|p| (p == "libfoo.so").then(|| b"binary".to_vec())) };
        let exporter = NativeExtensionExporter::new(source);
        let manifest = b"library_path=libfoo.so\n";
        let dir = tempdir().unwrap();
        let out = dir.path().join("addon.gdextension");
        let outcome = exporter.export_file(&out, manifest).unwrap();
        assert!(outcome.messages.is_empty());
        assert!(dir.path().join("libfoo.so").exists());
    }
}
