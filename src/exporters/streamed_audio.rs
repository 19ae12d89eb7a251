//! Streamed audio (Ogg Vorbis): strips the engine's loop-point wrapper and
//! writes the Ogg bitstream byte-for-byte (spec §4.F — lossless).

use std::path::Path;

use crate::primitives::cursor::Cursor;

use super::{ExportError, ExportOutcome, Exporter, LossKind};

const WRAPPER_MAGIC: [u8; 4] = *b"OGGV";

pub struct StreamedAudioExporter;

impl Exporter for StreamedAudioExporter {
    fn handled_types(&self) -> &'static [&'static str] {
        &["AudioStreamOggVorbis"]
    }

    fn handled_importers(&self) -> &'static [&'static str] {
        &["ogg_vorbis"]
    }

    fn default_output_extension(&self, _res_path: &str) -> String {
        "ogg".to_string()
    }

    fn export_file(&self, out_path: &Path, data: &[u8]) -> Result<ExportOutcome, ExportError> {
        let mut c = Cursor::new(data);
        let magic = c.read_bytes(4).map_err(|e| ExportError::Malformed(e.to_string()))?;
        if magic != WRAPPER_MAGIC {
            return Err(ExportError::Malformed("not a streamed-ogg wrapper".to_string()));
        }
        let _loop_begin = c.read_u32().map_err(|e| ExportError::Malformed(e.to_string()))?;
        let _loop_end = c.read_u32().map_err(|e| ExportError::Malformed(e.to_string()))?;
        let payload = c.read_bytes(c.remaining() as usize).map_err(|e| ExportError::Malformed(e.to_string()))?;

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(out_path, payload)?;
        Ok(ExportOutcome { destination: out_path.to_path_buf(), loss: LossKind::Lossless, messages: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::cursor::Writer;
    use tempfile::tempdir;

    #[test]
    fn strips_the_wrapper_and_writes_raw_ogg() {
        let mut w = Writer::new();
        w.write_bytes(&WRAPPER_MAGIC);
        w.write_u32(0);
        w.write_u32(0);
        w.write_bytes(b"OggS\x00\x02fake-stream");
        let wrapped = w.into_inner();

        let dir = tempdir().unwrap();
        let out = dir.path().join("music.ogg");
        let outcome = StreamedAudioExporter.export_file(&out, &wrapped).unwrap();
        assert_eq!(outcome.loss, LossKind::Lossless);
        assert_eq!(std::fs::read(&out).unwrap(), b"OggS\x00\x02fake-stream");
    }
}
