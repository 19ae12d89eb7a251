//! A resource file: header, string table, external-dependency table,
//! internal-subresource table, and a main body — either binary (`RSRC`
//! magic) or text (`[gd_resource …]` header) form (spec §4.D).

use thiserror::Error;

use crate::primitives::cursor::{Cursor, CursorError, Writer};
use crate::primitives::strings::StringEncoding;
use crate::variant::{self, text, DependencyTable, Variant, VariantError};

pub const MAGIC: &[u8; 4] = b"RSRC";

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("CORRUPT_HEADER: {0}")]
    CorruptHeader(String),

    #[error("TRUNCATED: {0}")]
    Truncated(#[from] CursorError),

    #[error("variant codec error: {0}")]
    Variant(#[from] VariantError),

    #[error("DEPENDENCY_MISSING: internal reference '{0}' resolves to neither an internal sub-resource nor a declared external dependency")]
    UnresolvedReference(String),

    #[error("text parse error at line {line}: {message}")]
    TextParse { line: usize, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalDependency {
    pub path: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InternalResource {
    pub id: String,
    pub type_name: String,
    pub properties: Vec<(String, Variant)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceFile {
    pub resource_type: String,
    pub engine_major: u32,
    pub externals: Vec<ExternalDependency>,
    pub internal_resources: Vec<InternalResource>,
    pub main_properties: Vec<(String, Variant)>,
}

impl ResourceFile {
    fn dependency_table(&self) -> DependencyTable {
        DependencyTable { externals: self.externals.iter().map(|e| e.path.clone()).collect() }
    }

    /// Every `Object(External(path))` / `Object(Internal(id))` reference
    /// anywhere in the body must resolve (spec §3 resource-file invariant).
    pub fn validate_references(&self) -> Result<(), ResourceError> {
        let internal_ids: std::collections::HashSet<&str> =
            self.internal_resources.iter().map(|r| r.id.as_str()).collect();
        let external_paths: std::collections::HashSet<&str> =
            self.externals.iter().map(|e| e.path.as_str()).collect();

        let mut check = |v: &Variant| -> Result<(), ResourceError> {
            walk_references(v, &mut |r| match r {
                variant::ObjectRef::Internal(id) if !internal_ids.contains(id.as_str()) => {
                    Err(ResourceError::UnresolvedReference(format!("SubResource({id})")))
                }
                variant::ObjectRef::External(path) if !external_paths.contains(path.as_str()) => {
                    Err(ResourceError::UnresolvedReference(format!("ExtResource({path})")))
                }
                _ => Ok(()),
            })
        };

        for (_, v) in &self.main_properties {
            check(v)?;
        }
        for res in &self.internal_resources {
            for (_, v) in &res.properties {
                check(v)?;
            }
        }
        Ok(())
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, ResourceError> {
        let deps = self.dependency_table();
        let mut w = Writer::new();
        w.write_bytes(MAGIC);
        w.write_u32(self.engine_major);
        w.write_prefixed_string_padded(&self.resource_type, StringEncoding::Utf8);

        w.write_u32(self.externals.len() as u32);
        for ext in &self.externals {
            w.write_prefixed_string_padded(&ext.type_name, StringEncoding::Utf8);
            w.write_prefixed_string_padded(&ext.path, StringEncoding::Utf8);
        }

        w.write_u32(self.internal_resources.len() as u32);
        for res in &self.internal_resources {
            w.write_prefixed_string_padded(&res.type_name, StringEncoding::Utf8);
            w.write_prefixed_string_padded(&res.id, StringEncoding::Utf8);
            write_property_list(&mut w, &res.properties, self.engine_major, &deps)?;
        }

        write_property_list(&mut w, &self.main_properties, self.engine_major, &deps)?;
        Ok(w.into_inner())
    }

    pub fn from_binary(data: &[u8]) -> Result<Self, ResourceError> {
        let mut c = Cursor::new(data);
        let magic = c.read_bytes(4)?;
        if magic != MAGIC {
            return Err(ResourceError::CorruptHeader(format!("expected 'RSRC', found {magic:?}")));
        }
        let engine_major = c.read_u32()?;
        let resource_type = c.read_prefixed_string_padded(StringEncoding::Utf8)?;

        let external_count = c.read_u32()?;
        let mut externals = Vec::with_capacity(external_count as usize);
        for _ in 0..external_count {
            let type_name = c.read_prefixed_string_padded(StringEncoding::Utf8)?;
            let path = c.read_prefixed_string_padded(StringEncoding::Utf8)?;
            externals.push(ExternalDependency { path, type_name });
        }
        let deps = DependencyTable { externals: externals.iter().map(|e| e.path.clone()).collect() };

        let internal_count = c.read_u32()?;
        let mut internal_resources = Vec::with_capacity(internal_count as usize);
        for _ in 0..internal_count {
            let type_name = c.read_prefixed_string_padded(StringEncoding::Utf8)?;
            let id = c.read_prefixed_string_padded(StringEncoding::Utf8)?;
            let properties = read_property_list(&mut c, engine_major, &deps)?;
            internal_resources.push(InternalResource { id, type_name, properties });
        }

        let main_properties = read_property_list(&mut c, engine_major, &deps)?;

        let file = ResourceFile { resource_type, engine_major, externals, internal_resources, main_properties };
        file.validate_references()?;
        Ok(file)
    }

    /// Emits the canonical `.tres` text form: sections in declaration order,
    /// `ext_resource`/`sub_resource` headers first, properties as
    /// `key = value` assignments using [`text::to_text`] for the value side.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "[gd_resource type=\"{}\" load_steps={} format=3]\n\n",
            self.resource_type,
            self.internal_resources.len() + 1
        ));
        for (i, ext) in self.externals.iter().enumerate() {
            out.push_str(&format!(
                "[ext_resource type=\"{}\" path=\"{}\" id=\"{}\"]\n",
                ext.type_name,
                ext.path,
                i + 1
            ));
        }
        if !self.externals.is_empty() {
            out.push('\n');
        }
        for res in &self.internal_resources {
            out.push_str(&format!("[sub_resource type=\"{}\" id=\"{}\"]\n", res.type_name, res.id));
            for (key, value) in &res.properties {
                out.push_str(&format!("{key} = {}\n", text::to_text(value)));
            }
            out.push('\n');
        }
        out.push_str("[resource]\n");
        for (key, value) in &self.main_properties {
            out.push_str(&format!("{key} = {}\n", text::to_text(value)));
        }
        out
    }

    /// Parses the text form emitted by [`Self::to_text`]. Tolerant of blank
    /// lines and omitted sections (a resource with no sub-resources has no
    /// `[sub_resource]` headers at all).
    pub fn from_text(input: &str) -> Result<Self, ResourceError> {
        let mut resource_type = String::new();
        let mut externals = Vec::new();
        let mut internal_resources: Vec<InternalResource> = Vec::new();
        let mut main_properties = Vec::new();
        let mut current: Option<usize> = None; // index into internal_resources, or None = [resource]/header

        for (lineno, raw_line) in input.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                if let Some(rest) = header.strip_prefix("gd_resource ") {
                    resource_type = extract_attr(rest, "type").unwrap_or_default();
                } else if let Some(rest) = header.strip_prefix("ext_resource ") {
                    let type_name = extract_attr(rest, "type").unwrap_or_default();
                    let path = extract_attr(rest, "path").unwrap_or_default();
                    externals.push(ExternalDependency { path, type_name });
                    current = None;
                } else if let Some(rest) = header.strip_prefix("sub_resource ") {
                    let type_name = extract_attr(rest, "type").unwrap_or_default();
                    let id = extract_attr(rest, "id").unwrap_or_default();
                    internal_resources.push(InternalResource { id, type_name, properties: Vec::new() });
                    current = Some(internal_resources.len() - 1);
                } else if header == "resource" {
                    current = None;
                }
                continue;
            }

            let (key, value_text) = line.split_once('=').ok_or_else(|| ResourceError::TextParse {
                line: lineno + 1,
                message: format!("expected 'key = value', found {line:?}"),
            })?;
            let key = key.trim().to_string();
            let value = text::from_text(value_text.trim()).map_err(|e| ResourceError::TextParse {
                line: lineno + 1,
                message: e.to_string(),
            })?;

            match current {
                Some(idx) => internal_resources[idx].properties.push((key, value)),
                None => main_properties.push((key, value)),
            }
        }

        let file = ResourceFile { resource_type, engine_major: 4, externals, internal_resources, main_properties };
        file.validate_references()?;
        Ok(file)
    }
}

fn extract_attr(header: &str, key: &str) -> Option<String> {
    let needle = format!("{key}=\"");
    let start = header.find(&needle)? + needle.len();
    let end = header[start..].find('"')? + start;
    Some(header[start..end].to_string())
}

fn write_property_list(
    w: &mut Writer,
    properties: &[(String, Variant)],
    engine_major: u32,
    deps: &DependencyTable,
) -> Result<(), ResourceError> {
    w.write_u32(properties.len() as u32);
    for (name, value) in properties {
        w.write_prefixed_string_padded(name, StringEncoding::Utf8);
        variant::encode(value, w, engine_major, deps)?;
    }
    Ok(())
}

fn read_property_list(c: &mut Cursor, engine_major: u32, deps: &DependencyTable) -> Result<Vec<(String, Variant)>, ResourceError> {
    let count = c.read_u32()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = c.read_prefixed_string_padded(StringEncoding::Utf8)?;
        let value = variant::decode(c, engine_major, deps)?;
        out.push((name, value));
    }
    Ok(out)
}

fn walk_references(value: &Variant, f: &mut impl FnMut(&variant::ObjectRef) -> Result<(), ResourceError>) -> Result<(), ResourceError> {
    match value {
        Variant::Object(r) => f(r),
        Variant::Array(items) => {
            for item in items {
                walk_references(item, f)?;
            }
            Ok(())
        }
        Variant::Dictionary(entries) => {
            for (k, v) in entries {
                walk_references(k, f)?;
                walk_references(v, f)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
