//! Texture containers: detects the storage kind (single image, texture
//! array/layered, 3D volume, atlas, or bitmap font) and back-converts to
//! PNG, or simply unwraps the original bytes when the engine already stored
//! a lossless format (spec §4.F "Texture").

use std::path::Path;

use crate::primitives::cursor::Cursor;

use super::{ExportError, ExportOutcome, Exporter, LossKind};

const WRAPPER_MAGIC: [u8; 4] = *b"GTEX";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Single,
    Layered,
    Volume3D,
    Atlas,
    Bitmap,
    /// Vector data stored verbatim rather than rasterized — the wrapper's
    /// `format` byte is meaningless for this kind, since an SVG payload was
    /// never a PNG/WebP/Basis blob to begin with.
    Svg,
}

impl ContainerKind {
    fn from_u8(v: u8) -> Result<Self, ExportError> {
        match v {
            0 => Ok(ContainerKind::Single),
            1 => Ok(ContainerKind::Layered),
            2 => Ok(ContainerKind::Volume3D),
            3 => Ok(ContainerKind::Atlas),
            4 => Ok(ContainerKind::Bitmap),
            5 => Ok(ContainerKind::Svg),
            other => Err(ExportError::Malformed(format!("unknown texture container tag {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageFormat {
    Png,
    WebpLossless,
    WebpLossy,
    Basis,
}

impl ImageFormat {
    fn from_u8(v: u8) -> Result<Self, ExportError> {
        match v {
            0 => Ok(ImageFormat::Png),
            1 => Ok(ImageFormat::WebpLossless),
            2 => Ok(ImageFormat::WebpLossy),
            3 => Ok(ImageFormat::Basis),
            other => Err(ExportError::Malformed(format!("unknown image format tag {other}"))),
        }
    }

    fn is_lossy(self) -> bool {
        matches!(self, ImageFormat::WebpLossy | ImageFormat::Basis)
    }

    fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::WebpLossless | ImageFormat::WebpLossy => "webp",
            ImageFormat::Basis => "basis",
        }
    }
}

pub struct TextureExporter;

impl Exporter for TextureExporter {
    fn handled_types(&self) -> &'static [&'static str] {
        &["CompressedTexture2D", "CompressedTexture2DArray", "CompressedTexture3D", "AtlasTexture", "BitMap"]
    }

    fn handled_importers(&self) -> &'static [&'static str] {
        &["texture", "texture_array", "texture_3d", "bitmap"]
    }

    fn default_output_extension(&self, _res_path: &str) -> String {
        "png".to_string()
    }

    fn export_file(&self, out_path: &Path, data: &[u8]) -> Result<ExportOutcome, ExportError> {
        let mut c = Cursor::new(data);
        let magic = c.read_bytes(4).map_err(|e| ExportError::Malformed(e.to_string()))?;
        if magic != WRAPPER_MAGIC {
            return Err(ExportError::Malformed("not a texture wrapper".to_string()));
        }
        let kind = ContainerKind::from_u8(c.read_u8().map_err(|e| ExportError::Malformed(e.to_string()))?)?;
        let layer_count = c.read_u32().map_err(|e| ExportError::Malformed(e.to_string()))?.max(1);
        let format = ImageFormat::from_u8(c.read_u8().map_err(|e| ExportError::Malformed(e.to_string()))?)?;
        let first_layer_len = c.read_u32().map_err(|e| ExportError::Malformed(e.to_string()))? as usize;
        let first_layer = c.read_bytes(first_layer_len).map_err(|e| ExportError::Malformed(e.to_string()))?;

        let mut messages = Vec::new();
        if matches!(kind, ContainerKind::Layered | ContainerKind::Volume3D) && layer_count > 1 {
            messages.push(format!("{} additional layer(s) not exported; only the first was written", layer_count - 1));
        }

        if kind == ContainerKind::Svg {
            let out_path = out_path.with_extension("svg");
            write_out(&out_path, first_layer)?;
            return Ok(ExportOutcome { destination: out_path, loss: LossKind::Lossless, messages });
        }

        let (bytes, extension, loss) = match format {
            ImageFormat::Png => (first_layer.to_vec(), "png", LossKind::Lossless),
            ImageFormat::WebpLossless => (decode_to_png(first_layer, image::ImageFormat::WebP)?, "png", LossKind::Lossless),
            ImageFormat::WebpLossy => (decode_to_png(first_layer, image::ImageFormat::WebP)?, "png", LossKind::StoredLossy),
            ImageFormat::Basis => {
                messages.push("Basis Universal textures are not decoded; the compressed bytes are kept as-is".to_string());
                (first_layer.to_vec(), format.extension(), LossKind::StoredLossy)
            }
        };

        let out_path = out_path.with_extension(extension);
        write_out(&out_path, &bytes)?;
        Ok(ExportOutcome { destination: out_path, loss, messages })
    }
}

fn write_out(out_path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out_path, bytes)?;
    Ok(())
}

/// Decodes a compressed-image payload and re-encodes it as PNG, so the
/// reconstructed project carries a format the editor can always re-import
/// without a platform-specific WebP/Basis codec.
fn decode_to_png(bytes: &[u8], source_format: image::ImageFormat) -> Result<Vec<u8>, ExportError> {
    let decoded = image::load_from_memory_with_format(bytes, source_format)
        .map_err(|e| ExportError::Malformed(format!("failed to decode {source_format:?} texture: {e}")))?;
    let mut out = Vec::new();
    decoded
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| ExportError::Malformed(format!("failed to re-encode texture as png: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::cursor::Writer;
    use tempfile::tempdir;

    fn wrap(kind: u8, layers: u32, format: u8, payload: &[u8]) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_bytes(&WRAPPER_MAGIC);
        w.write_u8(kind);
        w.write_u32(layers);
        w.write_u8(format);
        w.write_u32(payload.len() as u32);
        w.write_bytes(payload);
        w.into_inner()
    }

    #[test]
    fn lossless_png_passthrough_has_no_loss_flag() {
        let wrapped = wrap(0, 1, 0, b"\x89PNGfakebytes");
        let dir = tempdir().unwrap();
        let out = dir.path().join("icon.png");
        let outcome = TextureExporter.export_file(&out, &wrapped).unwrap();
        assert_eq!(outcome.loss, LossKind::Lossless);
        assert!(outcome.messages.is_empty());
    }

    fn encode_test_webp() -> Vec<u8> {
        let image = image::RgbImage::from_pixel(4, 4, image::Rgb([200u8, 10, 10]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::WebP)
            .unwrap();
        bytes
    }

    #[test]
    fn lossy_webp_is_decoded_and_reencoded_as_png() {
        let payload = encode_test_webp();
        let wrapped = wrap(0, 1, 2, &payload);
        let dir = tempdir().unwrap();
        let out = dir.path().join("icon.png");
        let outcome = TextureExporter.export_file(&out, &wrapped).unwrap();
        assert_eq!(outcome.loss, LossKind::StoredLossy);
        assert_eq!(outcome.destination.extension().unwrap(), "png");
        assert!(outcome.destination.exists());
    }

    #[test]
    fn lossless_webp_decodes_without_a_loss_flag() {
        let payload = encode_test_webp();
        let wrapped = wrap(0, 1, 1, &payload);
        let dir = tempdir().unwrap();
        let out = dir.path().join("icon.png");
        let outcome = TextureExporter.export_file(&out, &wrapped).unwrap();
        assert_eq!(outcome.loss, LossKind::Lossless);
        assert_eq!(outcome.destination.extension().unwrap(), "png");
    }

    #[test]
    fn basis_textures_are_kept_as_opaque_lossy_bytes() {
        let wrapped = wrap(0, 1, 3, b"basis-fake-bytes");
        let dir = tempdir().unwrap();
        let out = dir.path().join("icon.png");
        let outcome = TextureExporter.export_file(&out, &wrapped).unwrap();
        assert_eq!(outcome.loss, LossKind::StoredLossy);
        assert_eq!(outcome.destination.extension().unwrap(), "basis");
        assert_eq!(outcome.messages.len(), 1);
    }

    #[test]
    fn svg_containers_are_written_verbatim() {
        let wrapped = wrap(5, 1, 0, b"<svg></svg>");
        let dir = tempdir().unwrap();
        let out = dir.path().join("icon.png");
        let outcome = TextureExporter.export_file(&out, &wrapped).unwrap();
        assert_eq!(outcome.loss, LossKind::Lossless);
        assert_eq!(outcome.destination.extension().unwrap(), "svg");
        assert_eq!(std::fs::read(&outcome.destination).unwrap(), b"<svg></svg>");
    }

    #[test]
    fn layered_textures_report_dropped_layers() {
        let wrapped = wrap(1, 4, 0, b"layer0");
        let dir = tempdir().unwrap();
        let out = dir.path().join("arr.png");
        let outcome = TextureExporter.export_file(&out, &wrapped).unwrap();
        assert_eq!(outcome.messages.len(), 1);
    }
}
