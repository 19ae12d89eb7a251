//! Translation tables: converts a compiled `Translation` resource back into
//! CSV (spec §4.F). Keys are normally stored as plain strings; when the
//! source project hashed them away, recovery falls back to a caller-supplied
//! hint table and reports a `missing_keys` count for anything neither form
//! resolves.

use std::collections::HashMap;
use std::path::Path;

use crate::resource::ResourceFile;
use crate::variant::Variant;

use super::{ExportError, ExportOutcome, Exporter, LossKind};

pub struct TranslationExporter;

impl Exporter for TranslationExporter {
    fn handled_types(&self) -> &'static [&'static str] {
        &["Translation", "OptimizedTranslation"]
    }

    fn handled_importers(&self) -> &'static [&'static str] {
        &["csv_translation"]
    }

    fn default_output_extension(&self, _res_path: &str) -> String {
        "csv".to_string()
    }

    fn export_file(&self, out_path: &Path, data: &[u8]) -> Result<ExportOutcome, ExportError> {
        let resource = ResourceFile::from_binary(data)?;
        let (csv, missing_keys) = single_locale_csv(&resource, &HashMap::new());

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(out_path, csv)?;

        let loss = if missing_keys > 0 { LossKind::PartialRecovery } else { LossKind::Lossless };
        let messages = if missing_keys > 0 { vec![format!("{missing_keys} key(s) recovered only as their hash")] } else { Vec::new() };
        Ok(ExportOutcome { destination: out_path.to_path_buf(), loss, messages })
    }
}

fn locale_of(resource: &ResourceFile) -> String {
    resource
        .main_properties
        .iter()
        .find(|(k, _)| k == "locale")
        .and_then(|(_, v)| if let Variant::String(s) = v { Some(s.clone()) } else { None })
        .unwrap_or_else(|| "en".to_string())
}

fn messages_of(resource: &ResourceFile) -> &[(Variant, Variant)] {
    resource
        .main_properties
        .iter()
        .find(|(k, _)| k == "messages")
        .and_then(|(_, v)| if let Variant::Dictionary(d) = v { Some(d.as_slice()) } else { None })
        .unwrap_or(&[])
}

fn resolve_key(key: &Variant, hints: &HashMap<u32, String>, missing: &mut usize) -> String {
    match key {
        Variant::String(s) => s.clone(),
        Variant::Int(hash) => {
            let hash = *hash as u32;
            match hints.get(&hash) {
                Some(original) => original.clone(),
                None => {
                    *missing += 1;
                    format!("<{hash:08x}>")
                }
            }
        }
        other => format!("{other:?}"),
    }
}

/// A single locale's `messages` dictionary as two-column CSV
/// (`key,value`). Used directly by [`Exporter::export_file`]; real recovery
/// with a key-hint table goes through [`merge_locales`] instead.
fn single_locale_csv(resource: &ResourceFile, hints: &HashMap<u32, String>) -> (String, usize) {
    let mut missing = 0;
    let mut out = String::from("key,text\n");
    for (key, value) in messages_of(resource) {
        let key = resolve_key(key, hints, &mut missing);
        let text = match value {
            Variant::String(s) => s.clone(),
            other => format!("{other:?}"),
        };
        out.push_str(&csv_escape(&key));
        out.push(',');
        out.push_str(&csv_escape(&text));
        out.push('\n');
    }
    (out, missing)
}

/// Combines one `Translation` resource per locale into a single
/// `key,<locale1>,<locale2>,...` CSV, the form the engine's own CSV
/// translation importer expects on the way back in.
pub fn merge_locales(resources: &[ResourceFile], hints: &HashMap<u32, String>) -> (String, usize) {
    let locales: Vec<String> = resources.iter().map(locale_of).collect();
    let mut missing = 0;
    let mut keys: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut table: HashMap<String, HashMap<usize, String>> = HashMap::new();

    for (i, resource) in resources.iter().enumerate() {
        for (key, value) in messages_of(resource) {
            let key = resolve_key(key, hints, &mut missing);
            if seen.insert(key.clone()) {
                keys.push(key.clone());
            }
            let text = match value {
                Variant::String(s) => s.clone(),
                other => format!("{other:?}"),
            };
            table.entry(key).or_default().insert(i, text);
        }
    }

    let mut out = String::from("key");
    for locale in &locales {
        out.push(',');
        out.push_str(locale);
    }
    out.push('\n');

    for key in &keys {
        out.push_str(&csv_escape(key));
        for i in 0..resources.len() {
            out.push(',');
            if let Some(text) = table.get(key).and_then(|row| row.get(&i)) {
                out.push_str(&csv_escape(text));
            }
        }
        out.push('\n');
    }

    (out, missing)
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation(locale: &str, messages: Vec<(Variant, Variant)>) -> ResourceFile {
        ResourceFile {
            resource_type: "Translation".to_string(),
            engine_major: 4,
            externals: Vec::new(),
            internal_resources: Vec::new(),
            main_properties: vec![
                ("locale".to_string(), Variant::String(locale.to_string())),
                ("messages".to_string(), Variant::Dictionary(messages)),
            ],
        }
    }

    #[test]
    fn plain_string_keys_need_no_hints() {
        let res = translation("en", vec![(Variant::String("HELLO".to_string()), Variant::String("Hello".to_string()))]);
        let (csv, missing) = single_locale_csv(&res, &HashMap::new());
        assert_eq!(missing, 0);
        assert!(csv.contains("HELLO,Hello"));
    }

    #[test]
    fn hashed_keys_without_a_hint_are_counted_missing() {
        let res = translation("en", vec![(Variant::Int(0xdead_beefu32 as i64), Variant::String("Hello".to_string()))]);
        let (csv, missing) = single_locale_csv(&res, &HashMap::new());
        assert_eq!(missing, 1);
        assert!(csv.contains("<deadbeef>"));
    }

    #[test]
    fn merge_locales_aligns_columns_by_key() {
        let en = translation("en", vec![(Variant::String("HELLO".to_string()), Variant::String("Hello".to_string()))]);
        let fr = translation("fr", vec![(Variant::String("HELLO".to_string()), Variant::String("Bonjour".to_string()))]);
        let (csv, missing) = merge_locales(&[en, fr], &HashMap::new());
        assert_eq!(missing, 0);
        assert_eq!(csv, "key,en,fr\nHELLO,Hello,Bonjour\n");
    }
}
