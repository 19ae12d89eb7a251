//! `project.godot`: binary and text encodings of the same `(section, key,
//! variant)` walk (spec §4.G). `config_version` is derived from the engine
//! version via the table in [`crate::package::header::EngineVersion`].

use thiserror::Error;

use crate::package::header::EngineVersion;
use crate::primitives::cursor::{Cursor, CursorError, Writer};
use crate::primitives::strings::StringEncoding;
use crate::variant::{self, text, DependencyTable, Variant, VariantError};

const MAGIC: &[u8; 4] = b"ECFG";

#[derive(Debug, Error)]
pub enum ProjectConfigError {
    #[error("CORRUPT_HEADER: {0}")]
    CorruptHeader(String),
    #[error("TRUNCATED: {0}")]
    Truncated(#[from] CursorError),
    #[error("variant codec error: {0}")]
    Variant(#[from] VariantError),
    #[error("text parse error at line {line}: {message}")]
    TextParse { line: usize, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub config_version: u32,
    /// Sections in declaration order; `""` is the unnamed top-level section
    /// `project.godot` writes before any `[section]` header.
    pub sections: Vec<(String, Vec<(String, Variant)>)>,
}

impl ProjectConfig {
    pub fn new(engine: EngineVersion) -> Self {
        Self { config_version: engine.config_version(), sections: Vec::new() }
    }

    pub fn set(&mut self, section: &str, key: &str, value: Variant) {
        let entry = self.sections.iter_mut().find(|(s, _)| s == section);
        match entry {
            Some((_, kv)) => {
                if let Some(slot) = kv.iter_mut().find(|(k, _)| k == key) {
                    slot.1 = value;
                } else {
                    kv.push((key.to_string(), value));
                }
            }
            None => self.sections.push((section.to_string(), vec![(key.to_string(), value)])),
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&Variant> {
        self.sections
            .iter()
            .find(|(s, _)| s == section)
            .and_then(|(_, kv)| kv.iter().find(|(k, _)| k == key))
            .map(|(_, v)| v)
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, ProjectConfigError> {
        let deps = DependencyTable::default();
        let mut w = Writer::new();
        w.write_bytes(MAGIC);
        w.write_u32(self.config_version);
        w.write_u32(self.sections.len() as u32);
        for (section, kv) in &self.sections {
            w.write_prefixed_string_padded(section, StringEncoding::Utf8);
            w.write_u32(kv.len() as u32);
            for (key, value) in kv {
                w.write_prefixed_string_padded(key, StringEncoding::Utf8);
                variant::encode(value, &mut w, 4, &deps)?;
            }
        }
        Ok(w.into_inner())
    }

    pub fn from_binary(data: &[u8]) -> Result<Self, ProjectConfigError> {
        let mut c = Cursor::new(data);
        let magic = c.read_bytes(4)?;
        if magic != MAGIC {
            return Err(ProjectConfigError::CorruptHeader(format!("expected 'ECFG', found {magic:?}")));
        }
        let config_version = c.read_u32()?;
        let deps = DependencyTable::default();
        let section_count = c.read_u32()?;
        let mut sections = Vec::with_capacity(section_count as usize);
        for _ in 0..section_count {
            let section = c.read_prefixed_string_padded(StringEncoding::Utf8)?;
            let kv_count = c.read_u32()?;
            let mut kv = Vec::with_capacity(kv_count as usize);
            for _ in 0..kv_count {
                let key = c.read_prefixed_string_padded(StringEncoding::Utf8)?;
                let value = variant::decode(&mut c, 4, &deps)?;
                kv.push((key, value));
            }
            sections.push((section, kv));
        }
        Ok(Self { config_version, sections })
    }

    pub fn to_text(&self) -> String {
        let mut out = format!("config_version={}\n\n", self.config_version);
        for (section, kv) in &self.sections {
            if !section.is_empty() {
                out.push_str(&format!("[{section}]\n\n"));
            }
            for (key, value) in kv {
                out.push_str(&format!("{key}={}\n", text::to_text(value)));
            }
            out.push('\n');
        }
        out
    }

    pub fn from_text(input: &str) -> Result<Self, ProjectConfigError> {
        let mut config_version = 0u32;
        let mut sections: Vec<(String, Vec<(String, Variant)>)> = vec![(String::new(), Vec::new())];

        for (lineno, raw_line) in input.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                sections.push((name.to_string(), Vec::new()));
                continue;
            }
            let (key, value_text) = line.split_once('=').ok_or_else(|| ProjectConfigError::TextParse {
                line: lineno + 1,
                message: format!("expected 'key=value', found {line:?}"),
            })?;
            let key = key.trim();
            if key == "config_version" {
                config_version = value_text.trim().parse().map_err(|_| ProjectConfigError::TextParse {
                    line: lineno + 1,
                    message: "config_version must be an integer".to_string(),
                })?;
                continue;
            }
            let value = text::from_text(value_text.trim()).map_err(|e| ProjectConfigError::TextParse {
                line: lineno + 1,
                message: e.to_string(),
            })?;
            sections.last_mut().unwrap().1.push((key.to_string(), value));
        }

        sections.retain(|(name, kv)| !(name.is_empty() && kv.is_empty()));
        Ok(Self { config_version, sections })
    }
}
