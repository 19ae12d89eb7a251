//! Per-task and aggregate export reports (spec §4.H, §5).

use std::collections::HashMap;
use std::path::PathBuf;

use crate::exporters::LossKind;

/// The error-collection channel's capacity; past this, later failures are
/// dropped and only counted (spec §5 "buffers up to 1024 messages").
pub const ERROR_CHANNEL_CAP: usize = 1024;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExportReport {
    pub source: String,
    pub destination: Option<PathBuf>,
    pub error: Option<String>,
    pub loss: Option<LossKind>,
    pub messages: Vec<String>,
    pub dependencies: Vec<String>,
    pub cancelled: bool,
}

impl ExportReport {
    pub fn ok(source: impl Into<String>, destination: PathBuf, loss: LossKind, messages: Vec<String>) -> Self {
        Self {
            source: source.into(),
            destination: Some(destination),
            error: None,
            loss: Some(loss),
            messages,
            dependencies: Vec::new(),
            cancelled: false,
        }
    }

    pub fn failed(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: None,
            error: Some(error.into()),
            loss: None,
            messages: Vec::new(),
            dependencies: Vec::new(),
            cancelled: false,
        }
    }

    pub fn cancelled(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: None,
            error: Some("CANCELLED".to_string()),
            loss: None,
            messages: Vec::new(),
            dependencies: Vec::new(),
            cancelled: true,
        }
    }
}

#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ImportExporterReport {
    /// Sorted deterministically by `source` before being handed to a caller
    /// (spec §5 "aggregate results are sorted deterministically").
    pub entries: Vec<ExportReport>,
    /// `new_destination → original_source`, populated whenever two
    /// descriptors would otherwise collide on the same output path.
    pub disambiguated: HashMap<PathBuf, String>,
    pub dropped_error_count: usize,
    pub unsupported_type_counts: HashMap<String, usize>,
}

impl ImportExporterReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `report`, renaming its destination if another entry already
    /// claimed that path, and recording the original mapping (spec §4.H
    /// "Deduplicate destination paths").
    pub fn push(&mut self, mut report: ExportReport) {
        if let Some(error) = &report.error {
            if !report.cancelled && self.entries.iter().filter(|e| e.error.is_some()).count() >= ERROR_CHANNEL_CAP {
                self.dropped_error_count += 1;
                let _ = error;
                return;
            }
        }

        if let Some(dest) = report.destination.clone() {
            let mut candidate = dest.clone();
            let mut suffix = 1u32;
            let used: std::collections::HashSet<&PathBuf> = self.entries.iter().filter_map(|e| e.destination.as_ref()).collect();
            while used.contains(&candidate) {
                candidate = disambiguated_path(&dest, suffix);
                suffix += 1;
            }
            if candidate != dest {
                self.disambiguated.insert(candidate.clone(), report.source.clone());
                report.destination = Some(candidate);
            }
        }

        self.entries.push(report);
    }

    pub fn record_unsupported(&mut self, resource_type: impl Into<String>) {
        *self.unsupported_type_counts.entry(resource_type.into()).or_insert(0) += 1;
    }

    pub fn finalize(&mut self) {
        self.entries.sort_by(|a, b| a.source.cmp(&b.source));
    }

    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|e| e.error.is_none()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|e| e.error.is_some() && !e.cancelled).count()
    }
}

fn disambiguated_path(original: &PathBuf, suffix: u32) -> PathBuf {
    let stem = original.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = original.extension().and_then(|s| s.to_str());
    let new_name = match ext {
        Some(ext) => format!("{stem}_{suffix}.{ext}"),
        None => format!("{stem}_{suffix}"),
    };
    original.with_file_name(new_name)
}
