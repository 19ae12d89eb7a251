//! Compiled `GDScript` bytecode: invokes [`crate::bytecode`] to recover
//! source text and, for engines new enough to carry sidecar UIDs, recreates
//! the matching `.uid` file next to the recovered script (spec §4.F
//! "Script").

use std::path::Path;

use crate::bytecode;
use crate::project::uid::encode_uid;

use super::{ExportError, ExportOutcome, Exporter, LossKind};

/// The engine major version sidecar `.uid` files were introduced in.
const MIN_ENGINE_WITH_UID_SIDECARS: u32 = 4;

pub struct ScriptExporter;

impl Exporter for ScriptExporter {
    fn handled_types(&self) -> &'static [&'static str] {
        &["GDScript"]
    }

    fn handled_importers(&self) -> &'static [&'static str] {
        &["gdscript"]
    }

    fn default_output_extension(&self, _res_path: &str) -> String {
        "gd".to_string()
    }

    fn export_file(&self, out_path: &Path, data: &[u8]) -> Result<ExportOutcome, ExportError> {
        let (file, revision) = bytecode::decode(data)?;
        let source = bytecode::print_tokens(&file.tokens, revision.features);

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(out_path, &source)?;

        let mut messages = Vec::new();
        if engine_major_of(revision.bytecode_version) >= MIN_ENGINE_WITH_UID_SIDECARS {
            let uid_path = out_path.with_extension("gd.uid");
            let uid = encode_uid(path_hash(out_path));
            std::fs::write(&uid_path, uid)?;
            messages.push(format!("wrote sidecar {}", uid_path.display()));
        }

        Ok(ExportOutcome { destination: out_path.to_path_buf(), loss: LossKind::Lossless, messages })
    }
}

/// Bytecode revision numbers in this registry increase with engine age
/// (104 = current 4.x, 100 = early 4.x, 13 = 3.x); `100` is the floor for a
/// 4.x revision, matching [`MIN_ENGINE_WITH_UID_SIDECARS`].
fn engine_major_of(bytecode_version: u32) -> u32 {
    if bytecode_version >= 100 {
        4
    } else {
        3
    }
}

fn path_hash(path: &Path) -> u64 {
    crate::primitives::md5::digest(path.to_string_lossy().as_bytes())
        .iter()
        .take(8)
        .fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::revision::GODOT_4_CURRENT;
    use crate::bytecode::token::{BytecodeFile, Opcode, Token, TokenKind};
    use tempfile::tempdir;

    #[test]
    fn decompiles_and_writes_a_uid_sidecar() {
        let file = BytecodeFile {
            bytecode_version: GODOT_4_CURRENT.bytecode_version,
            tokens: vec![
                Token { kind: TokenKind::Op(Opcode::Pass), line: 1, column: 0 },
                Token { kind: TokenKind::Op(Opcode::Eof), line: 1, column: 0 },
            ],
        };
        let bytes = bytecode::encode(&file, &GODOT_4_CURRENT, false).unwrap();

        let dir = tempdir().unwrap();
        let out = dir.path().join("thing.gd");
        let outcome = ScriptExporter.export_file(&out, &bytes).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "pass");
        assert!(dir.path().join("thing.gd.uid").exists());
        assert_eq!(outcome.loss, LossKind::Lossless);
    }
}
