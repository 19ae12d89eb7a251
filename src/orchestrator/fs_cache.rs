//! Synthesizes the editor's own filesystem cache so a reconstructed project
//! opens without a full re-scan on first load (spec §4.H, §6 "Persisted
//! state": `.godot/editor/filesystem_cache{8,10}`).
//!
//! Open Question decision: the format is documented upstream only through
//! field 6 (`modified_time<>import_modified_time<>uid<>script_class_name<>
//! script_class_icon_path<>source_file`). This crate writes those six
//! fields faithfully and serializes any further dest-files as a single
//! `<*>`-joined trailing field rather than inventing an undocumented binary
//! layout past that point; callers should treat a synthesized cache as
//! `experimental`.

const FIELD_SEP: &str = "<>";
const DEST_SEP: &str = "<*>";

#[derive(Debug, Clone)]
pub struct CacheRecord {
    pub path: String,
    pub modified_time: i64,
    pub import_modified_time: i64,
    pub uid: Option<u64>,
    pub script_class_name: String,
    pub script_class_icon_path: String,
    pub dest_files: Vec<String>,
}

impl CacheRecord {
    fn to_line(&self) -> String {
        let uid_text = self.uid.map(crate::project::encode_uid).unwrap_or_else(|| "uid://<invalid>".to_string());
        let mut fields = vec![
            self.modified_time.to_string(),
            self.import_modified_time.to_string(),
            uid_text,
            self.script_class_name.clone(),
            self.script_class_icon_path.clone(),
            self.path.clone(),
        ];
        if !self.dest_files.is_empty() {
            fields.push(self.dest_files.join(DEST_SEP));
        }
        fields.join(FIELD_SEP)
    }
}

/// One `::<path>::<mtime>` section per directory, each followed by its
/// files' [`CacheRecord`] lines, matching the on-disk grouping.
pub fn serialize(sections: &[(String, i64, Vec<CacheRecord>)]) -> String {
    let mut out = String::new();
    for (dir, mtime, records) in sections {
        out.push_str(&format!("::{dir}::{mtime}\n"));
        for record in records {
            out.push_str(&record.to_line());
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_record_with_no_extra_dest_files_has_exactly_six_fields() {
        let record = CacheRecord {
            path: "res://scripts/player.gd".to_string(),
            modified_time: 100,
            import_modified_time: 100,
            uid: Some(42),
            script_class_name: "Player".to_string(),
            script_class_icon_path: String::new(),
            dest_files: Vec::new(),
        };
        assert_eq!(record.to_line().split(FIELD_SEP).count(), 6);
    }

    #[test]
    fn extra_dest_files_are_joined_into_a_single_trailing_field() {
        let record = CacheRecord {
            path: "res://icon.png".to_string(),
            modified_time: 1,
            import_modified_time: 1,
            uid: None,
            script_class_name: String::new(),
            script_class_icon_path: String::new(),
            dest_files: vec!["res://.godot/imported/icon.ctex".to_string(), "res://.godot/imported/icon.ctex.md5".to_string()],
        };
        let line = record.to_line();
        let trailing = line.split(FIELD_SEP).nth(6).unwrap();
        assert_eq!(trailing, "res://.godot/imported/icon.ctex<*>res://.godot/imported/icon.ctex.md5");
    }

    #[test]
    fn serialize_groups_records_under_section_headers() {
        let records = vec![CacheRecord {
            path: "res://a.gd".to_string(),
            modified_time: 0,
            import_modified_time: 0,
            uid: None,
            script_class_name: String::new(),
            script_class_icon_path: String::new(),
            dest_files: Vec::new(),
        }];
        let text = serialize(&[("res://".to_string(), 12345, records)]);
        assert!(text.starts_with("::res://::12345\n"));
    }
}
