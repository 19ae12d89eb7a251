//! The single entry point tying the container, exporter registry, and
//! project reconstructor together (spec §4.H).

pub mod fs_cache;
pub mod report;
pub mod workgroup;

pub use report::{ExportReport, ImportExporterReport};
pub use workgroup::Cancellation;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cipher::Key;
use crate::exporters::{ExportOutcome, Exporter, LossKind, Registry};
use crate::package::{EntryInfo, PckContainer};
use crate::project::{self, AddonError, ImportDescriptor, ScriptCandidate, UidCache};
use crate::resource::ResourceFile;

/// Picks an exporter for `entry`, sniffing the resource type out of an
/// `RSRC`-tagged payload when the extension alone isn't decisive, the way
/// [`Registry::find`] expects callers to resolve `(importer_name,
/// resource_type)` before the lookup (spec §4.F).
fn classify<'a>(entry: &EntryInfo, payload: &[u8], registry: &'a Registry) -> Option<&'a dyn Exporter> {
    if payload.starts_with(b"GDSC") {
        return registry.find("gdscript", "GDScript");
    }
    if payload.starts_with(b"RSRC") {
        if let Ok(resource) = ResourceFile::from_binary(payload) {
            return registry.find("", &resource.resource_type);
        }
    }
    let ext = Path::new(&entry.path).extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "ogg" => registry.find("ogg_vorbis", ""),
        "wav" => registry.find("wav", ""),
        "png" | "webp" | "svg" => registry.find("texture", ""),
        "translation" => registry.find("csv_translation", ""),
        "gdextension" | "gdnlib" => registry.find("gdextension", ""),
        "tscn" | "scn" => registry.find("scene", ""),
        _ => None,
    }
}

/// A source/destination-resolved, exporter-bound unit of work. Scenes are
/// ranked after everything else since they reference images, audio and
/// scripts that must already be on disk (spec §4.H "sort scene-like
/// outputs to be processed last").
struct Token<'a> {
    entry: &'a EntryInfo,
    exporter: &'a dyn Exporter,
    rank: u8,
}

fn rank_of(exporter: &dyn Exporter) -> u8 {
    if exporter.handled_types().contains(&"PackedScene") {
        1
    } else {
        0
    }
}

pub struct ExportOptions<'a> {
    pub key: Option<&'a Key>,
    pub filter: Option<Box<dyn Fn(&str) -> bool + Sync + 'a>>,
}

impl<'a> Default for ExportOptions<'a> {
    fn default() -> Self {
        Self { key: None, filter: None }
    }
}

/// Exports every entry in `pkg` that a registered [`Exporter`] handles,
/// writing recovered assets under `out_dir` (spec §4.H).
pub fn export(
    pkg: &PckContainer,
    out_dir: &Path,
    registry: &Registry,
    options: &ExportOptions,
    cancel: &Cancellation,
    on_progress: impl Fn(usize) + Sync,
) -> ImportExporterReport {
    let mut report = ImportExporterReport::new();
    let mut uid_cache = UidCache::new();
    let dependency_hashes: Mutex<HashMap<String, [u8; 16]>> = Mutex::new(HashMap::new());

    let mut tokens: Vec<Token> = Vec::new();
    for entry in pkg.entries() {
        if let Some(filter) = &options.filter {
            if !filter(&entry.path) {
                continue;
            }
        }
        let payload = match pkg.read_entry(entry, options.key) {
            Ok(bytes) => bytes,
            Err(e) => {
                report.push(ExportReport::failed(entry.path.clone(), e.to_string()));
                continue;
            }
        };
        match classify(entry, &payload, registry) {
            Some(exporter) => tokens.push(Token { entry, exporter, rank: rank_of(exporter) }),
            None => report.record_unsupported(Path::new(&entry.path).extension().and_then(|e| e.to_str()).unwrap_or("unknown")),
        }
    }
    tokens.sort_by_key(|t| t.rank);

    let (parallel_tokens, sequential_tokens): (Vec<&Token>, Vec<&Token>) =
        tokens.iter().partition(|t| t.exporter.supports_multithread());

    let run_one = |token: &Token, cancel: &Cancellation| -> ExportReport {
        if cancel.is_cancelled() {
            return ExportReport::cancelled(token.entry.path.clone());
        }
        let payload = match pkg.read_entry(token.entry, options.key) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(entry = %token.entry.path, error = %e, "failed to read package entry");
                return ExportReport::failed(token.entry.path.clone(), e.to_string());
            }
        };

        let sanitized = token.entry.sanitized_path();
        let dest_dir = Path::new(&sanitized).parent().map(|p| out_dir.join(p)).unwrap_or_else(|| out_dir.to_path_buf());
        if let Err(e) = std::fs::create_dir_all(&dest_dir) {
            return ExportReport::failed(token.entry.path.clone(), e.to_string());
        }

        let importer = token.exporter.handled_importers().first().copied().unwrap_or_default().to_string();
        let resource_type = token.exporter.handled_types().first().copied().unwrap_or_default().to_string();

        if resource_type == "PackedScene" {
            if let Ok(resource) = ResourceFile::from_binary(&payload) {
                let hashes = crate::exporters::scene::external_dependency_hashes(&resource);
                dependency_hashes.lock().extend(hashes);
            }
        }

        let mut descriptor = ImportDescriptor::new(token.entry.path.clone(), importer, resource_type);
        match token.exporter.export_resource(&dest_dir, &payload, &mut descriptor) {
            Ok(ExportOutcome { destination, loss, messages }) => {
                debug!(entry = %token.entry.path, destination = %destination.display(), "exported entry");
                ExportReport::ok(token.entry.path.clone(), destination, loss, messages)
            }
            Err(e) => {
                warn!(entry = %token.entry.path, error = %e, "export failed");
                ExportReport::failed(token.entry.path.clone(), e.to_string())
            }
        }
    };

    let parallel_results = workgroup::run_parallel(parallel_tokens, cancel, &on_progress, |token, cancel| run_one(token, cancel));
    let sequential_results = workgroup::run_sequential(sequential_tokens, cancel, &on_progress, |token, cancel| run_one(token, cancel));

    for result in parallel_results.into_iter().chain(sequential_results).flatten() {
        report.push(result);
    }

    report.finalize();
    postprocess(&mut report, &mut uid_cache, out_dir, &dependency_hashes.into_inner());
    report
}

/// The project-reconstructor pass that runs once after every token has
/// finished (spec §4.H "perform G's postprocessing in one pass"): rebuilds
/// the UID cache, synthesizes `plugin.cfg` for orphaned addons, and writes
/// the editor's filesystem cache so the project opens without a full
/// re-scan.
fn postprocess(report: &mut ImportExporterReport, uid_cache: &mut UidCache, out_dir: &Path, dependency_hashes: &HashMap<String, [u8; 16]>) {
    for entry in &report.entries {
        if entry.error.is_none() {
            if let Some(dest) = &entry.destination {
                uid_cache.insert(path_fingerprint(&entry.source), dest.display().to_string());
            }
        }
    }

    debug!(dependency_count = dependency_hashes.len(), "collected scene dependency hashes");

    repair_orphaned_addons(report);
    write_filesystem_cache(report, out_dir);
}

/// Groups successfully-exported `addons/<name>/*.gd` scripts by addon and
/// synthesizes a `plugin.cfg` for any addon that doesn't already carry one
/// (spec §4.G "Addon repair").
fn repair_orphaned_addons(report: &mut ImportExporterReport) {
    let mut by_addon: HashMap<String, Vec<(String, PathBuf)>> = HashMap::new();
    let mut has_plugin_cfg: HashSet<String> = HashSet::new();

    for entry in &report.entries {
        if entry.error.is_some() {
            continue;
        }
        let Some(rest) = entry.source.strip_prefix("res://addons/") else { continue };
        let Some((addon_name, tail)) = rest.split_once('/') else { continue };
        if tail == "plugin.cfg" {
            has_plugin_cfg.insert(addon_name.to_string());
        } else if tail.ends_with(".gd") {
            if let Some(dest) = &entry.destination {
                by_addon.entry(addon_name.to_string()).or_default().push((entry.source.clone(), dest.clone()));
            }
        }
    }

    for (addon_name, scripts) in by_addon {
        if has_plugin_cfg.contains(&addon_name) {
            continue;
        }
        let texts: Vec<(String, String)> = scripts
            .iter()
            .filter_map(|(path, dest)| std::fs::read_to_string(dest).ok().map(|text| (path.clone(), text)))
            .collect();
        let candidates: Vec<ScriptCandidate> = texts.iter().map(|(path, text)| ScriptCandidate { path, extends: extends_clause(text) }).collect();

        match project::repair_addon(&addon_name, &candidates) {
            Ok(cfg) => {
                let Some(dest_dir) = scripts[0].1.parent() else { continue };
                let cfg_path = dest_dir.join("plugin.cfg");
                if let Err(e) = std::fs::write(&cfg_path, &cfg) {
                    warn!(addon = %addon_name, error = %e, "failed to write synthesized plugin.cfg");
                    continue;
                }
                debug!(addon = %addon_name, path = %cfg_path.display(), "synthesized plugin.cfg for orphaned addon");
                report.push(ExportReport::ok(
                    format!("res://addons/{addon_name}/plugin.cfg"),
                    cfg_path,
                    LossKind::PartialRecovery,
                    vec!["plugin.cfg synthesized; original addon metadata could not be recovered".to_string()],
                ));
            }
            Err(AddonError::NoMainScriptFound) => {
                warn!(addon = %addon_name, "no EditorPlugin script found in addon; leaving it without plugin.cfg");
            }
            Err(AddonError::AmbiguousMainScript(candidates)) => {
                warn!(addon = %addon_name, candidates = ?candidates, "multiple EditorPlugin scripts found in addon; leaving it without plugin.cfg");
            }
        }
    }
}

fn extends_clause(text: &str) -> &str {
    text.lines().find_map(|line| line.trim().strip_prefix("extends ")).unwrap_or("").trim()
}

/// Writes a minimal `.godot/editor/filesystem_cache10`, grouping recovered
/// entries by destination directory (spec §6 "Persisted state").
fn write_filesystem_cache(report: &ImportExporterReport, out_dir: &Path) {
    let mut by_dir: HashMap<String, Vec<fs_cache::CacheRecord>> = HashMap::new();
    for entry in &report.entries {
        if entry.error.is_some() {
            continue;
        }
        let Some(dest) = &entry.destination else { continue };
        let rel_dir = dest
            .parent()
            .and_then(|p| pathdiff::diff_paths(p, out_dir))
            .map(|p| format!("res://{}", p.display()))
            .unwrap_or_else(|| "res://".to_string());
        by_dir.entry(rel_dir).or_default().push(fs_cache::CacheRecord {
            path: entry.source.clone(),
            modified_time: 0,
            import_modified_time: 0,
            uid: None,
            script_class_name: String::new(),
            script_class_icon_path: String::new(),
            dest_files: vec![dest.display().to_string()],
        });
    }
    let sections: Vec<(String, i64, Vec<fs_cache::CacheRecord>)> = by_dir.into_iter().map(|(dir, records)| (dir, 0, records)).collect();
    let text = fs_cache::serialize(&sections);

    let cache_dir = out_dir.join(".godot").join("editor");
    if let Err(e) = std::fs::create_dir_all(&cache_dir) {
        warn!(error = %e, "failed to create editor cache directory");
        return;
    }
    if let Err(e) = std::fs::write(cache_dir.join("filesystem_cache10"), text) {
        warn!(error = %e, "failed to write filesystem_cache10");
    }
}

fn path_fingerprint(path: &str) -> u64 {
    let digest = crate::primitives::md5::digest(path.as_bytes());
    u64::from_le_bytes(digest[0..8].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::builder::PckBuilder;
    use crate::package::header::{EngineVersion, PckFlags};
    use crate::resource::ResourceFile;

    #[test]
    fn export_writes_recognized_entries_and_reports_unsupported_ones() {
        // Routes this run's debug!/warn! calls through the test harness instead
        // of the default no-op subscriber; harmless if another test already
        // installed one.
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let resource = ResourceFile {
            resource_type: "PackedScene".to_string(),
            engine_major: 4,
            externals: Vec::new(),
            internal_resources: Vec::new(),
            main_properties: Vec::new(),
        };
        let mut builder = PckBuilder::new(EngineVersion { major: 4, minor: 3, patch: 0 });
        builder.add_file("res://scenes/main.tscn", resource.to_binary().unwrap(), false, None);
        builder.add_file("res://notes.txt", b"hello".to_vec(), false, None);
        let bytes = builder.build_in_memory(PckFlags::new()).unwrap();
        let pkg = PckContainer::from_memory(bytes, None).unwrap();

        let registry = Registry::with_defaults();
        let out = tempfile::tempdir().unwrap();
        let cancel = Cancellation::new();
        let report = export(&pkg, out.path(), &registry, &ExportOptions::default(), &cancel, |_| {});

        assert_eq!(report.success_count(), 1);
        assert_eq!(*report.unsupported_type_counts.get("txt").unwrap(), 1);
    }

    #[test]
    fn filter_excludes_entries_outright() {
        let mut builder = PckBuilder::new(EngineVersion { major: 4, minor: 3, patch: 0 });
        builder.add_file("res://a.txt", b"x".to_vec(), false, None);
        builder.add_file("res://b.txt", b"y".to_vec(), false, None);
        let bytes = builder.build_in_memory(PckFlags::new()).unwrap();
        let pkg = PckContainer::from_memory(bytes, None).unwrap();

        let registry = Registry::with_defaults();
        let out = tempfile::tempdir().unwrap();
        let cancel = Cancellation::new();
        let options = ExportOptions { key: None, filter: Some(Box::new(|p: &str| p == "res://a.txt")) };
        let report = export(&pkg, out.path(), &registry, &options, &cancel, |_| {});

        assert_eq!(report.entries.len() + report.unsupported_type_counts.values().sum::<usize>(), 1);
    }
}
