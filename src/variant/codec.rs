//! Binary variant codec (spec §4.D): `type_id:u32 | payload`, versioned by
//! engine major. `decode ∘ encode = identity` for every representable value
//! (spec P3); v2 legacy images are decoded and normalized but cannot be
//! re-encoded losslessly back to the v2 layout.

use thiserror::Error;

use crate::primitives::cursor::{Cursor, CursorError, Writer};
use crate::primitives::strings::StringEncoding;

use super::value::{
    Aabb, Basis, Color, Image, ImagePixelFormat, ObjectRef, Plane, Quaternion, Rect2, Transform2D, Transform3D,
    Variant, Vector2, Vector2i, Vector3, Vector3i, Vector4, Vector4i,
};

#[derive(Debug, Error)]
pub enum VariantError {
    #[error("TRUNCATED: {0}")]
    Truncated(#[from] CursorError),

    #[error("CORRUPT_HEADER: unknown variant type id {0}")]
    UnknownType(u32),

    #[error("CORRUPT_HEADER: object reference kind {0} is not INTERNAL/EXTERNAL/UNKNOWN")]
    UnknownObjectKind(u32),

    #[error("DEPENDENCY_MISSING: external dependency index {0} is not in the table")]
    MissingDependency(u32),

    #[error("LOSSY: {0}")]
    LossyConversion(String),

    #[error("UNIMPLEMENTED_REVISION: {0}")]
    Unsupported(String),

    #[error("CORRUPT_HEADER: unknown image pixel format tag {0}")]
    UnknownImageFormat(u32),
}

/// The external-dependency table a resource file's header carries, indexed
/// by the position each `ExtResource` reference is declared at.
#[derive(Debug, Default, Clone)]
pub struct DependencyTable {
    pub externals: Vec<String>,
}

impl DependencyTable {
    pub fn resolve(&self, index: u32) -> Result<&str, VariantError> {
        self.externals
            .get(index as usize)
            .map(String::as_str)
            .ok_or(VariantError::MissingDependency(index))
    }

    pub fn index_of(&self, path: &str) -> Option<u32> {
        self.externals.iter().position(|p| p == path).map(|i| i as u32)
    }
}

const NIL: u32 = 0;
const BOOL: u32 = 1;
const INT: u32 = 2;
const FLOAT: u32 = 3;
const STRING: u32 = 4;
const VECTOR2: u32 = 5;
const VECTOR2I: u32 = 6;
const RECT2: u32 = 7;
const VECTOR3: u32 = 8;
const VECTOR3I: u32 = 9;
const VECTOR4: u32 = 10;
const VECTOR4I: u32 = 11;
const TRANSFORM2D: u32 = 12;
const PLANE: u32 = 13;
const QUATERNION: u32 = 14;
const AABB: u32 = 15;
const BASIS: u32 = 16;
const TRANSFORM3D: u32 = 17;
const COLOR: u32 = 18;
const NODE_PATH: u32 = 19;
const OBJECT_ID: u32 = 20;
const RID: u32 = 21;
const OBJECT: u32 = 22;
const DICTIONARY: u32 = 23;
const ARRAY: u32 = 24;
const PACKED_BYTE_ARRAY: u32 = 25;
const PACKED_INT32_ARRAY: u32 = 26;
const PACKED_FLOAT32_ARRAY: u32 = 27;
const PACKED_STRING_ARRAY: u32 = 28;
const PACKED_VECTOR2_ARRAY: u32 = 29;
const PACKED_VECTOR3_ARRAY: u32 = 30;
const IMAGE: u32 = 31;

const OBJECT_KIND_INTERNAL: u32 = 0;
const OBJECT_KIND_EXTERNAL: u32 = 1;
const OBJECT_KIND_UNKNOWN: u32 = 2;

/// Encodes `value` into `w`. `engine_major` selects the framing for types
/// whose layout changed across engine eras. [`Variant::Image`] always
/// encodes in the current packed-pixel layout regardless of `engine_major`:
/// a v2 image decoded off an indexed palette has already been normalized to
/// [`ImagePixelFormat::Rgba8`] raw pixels by [`decode`] and has no palette
/// left to re-encode losslessly back into.
pub fn encode(value: &Variant, w: &mut Writer, engine_major: u32, deps: &DependencyTable) -> Result<(), VariantError> {
    match value {
        Variant::Nil => w.write_u32(NIL),
        Variant::Bool(b) => {
            w.write_u32(BOOL);
            w.write_u32(*b as u32);
        }
        Variant::Int(i) => {
            w.write_u32(INT);
            w.write_i64(*i);
        }
        Variant::Float(f) => {
            w.write_u32(FLOAT);
            w.write_f64(*f);
        }
        Variant::String(s) => {
            w.write_u32(STRING);
            write_string(w, s);
        }
        Variant::Vector2(v) => {
            w.write_u32(VECTOR2);
            w.write_f32(v.x);
            w.write_f32(v.y);
        }
        Variant::Vector2i(v) => {
            w.write_u32(VECTOR2I);
            w.write_i32(v.x);
            w.write_i32(v.y);
        }
        Variant::Rect2(r) => {
            w.write_u32(RECT2);
            w.write_f32(r.position.x);
            w.write_f32(r.position.y);
            w.write_f32(r.size.x);
            w.write_f32(r.size.y);
        }
        Variant::Vector3(v) => {
            w.write_u32(VECTOR3);
            w.write_f32(v.x);
            w.write_f32(v.y);
            w.write_f32(v.z);
        }
        Variant::Vector3i(v) => {
            w.write_u32(VECTOR3I);
            w.write_i32(v.x);
            w.write_i32(v.y);
            w.write_i32(v.z);
        }
        Variant::Vector4(v) => {
            w.write_u32(VECTOR4);
            w.write_f32(v.x);
            w.write_f32(v.y);
            w.write_f32(v.z);
            w.write_f32(v.w);
        }
        Variant::Vector4i(v) => {
            w.write_u32(VECTOR4I);
            w.write_i32(v.x);
            w.write_i32(v.y);
            w.write_i32(v.z);
            w.write_i32(v.w);
        }
        Variant::Transform2D(t) => {
            w.write_u32(TRANSFORM2D);
            for axis in [t.x, t.y, t.origin] {
                w.write_f32(axis.x);
                w.write_f32(axis.y);
            }
        }
        Variant::Plane(p) => {
            w.write_u32(PLANE);
            w.write_f32(p.normal.x);
            w.write_f32(p.normal.y);
            w.write_f32(p.normal.z);
            w.write_f32(p.d);
        }
        Variant::Quaternion(q) => {
            w.write_u32(QUATERNION);
            w.write_f32(q.x);
            w.write_f32(q.y);
            w.write_f32(q.z);
            w.write_f32(q.w);
        }
        Variant::Aabb(a) => {
            w.write_u32(AABB);
            w.write_f32(a.position.x);
            w.write_f32(a.position.y);
            w.write_f32(a.position.z);
            w.write_f32(a.size.x);
            w.write_f32(a.size.y);
            w.write_f32(a.size.z);
        }
        Variant::Basis(b) => {
            w.write_u32(BASIS);
            for row in b.rows {
                w.write_f32(row.x);
                w.write_f32(row.y);
                w.write_f32(row.z);
            }
        }
        Variant::Transform3D(t) => {
            w.write_u32(TRANSFORM3D);
            for row in t.basis.rows {
                w.write_f32(row.x);
                w.write_f32(row.y);
                w.write_f32(row.z);
            }
            w.write_f32(t.origin.x);
            w.write_f32(t.origin.y);
            w.write_f32(t.origin.z);
        }
        Variant::Color(c) => {
            w.write_u32(COLOR);
            w.write_f32(c.r);
            w.write_f32(c.g);
            w.write_f32(c.b);
            w.write_f32(c.a);
        }
        Variant::NodePath(s) => {
            w.write_u32(NODE_PATH);
            write_string(w, s);
        }
        Variant::ObjectId(id) => {
            w.write_u32(OBJECT_ID);
            w.write_i64(*id);
        }
        Variant::Rid(id) => {
            w.write_u32(RID);
            w.write_u64(*id);
        }
        Variant::Object(obj) => {
            w.write_u32(OBJECT);
            match obj {
                ObjectRef::Internal(id) => {
                    w.write_u32(OBJECT_KIND_INTERNAL);
                    write_string(w, id);
                }
                ObjectRef::External(path) => {
                    w.write_u32(OBJECT_KIND_EXTERNAL);
                    let index = deps.index_of(path).unwrap_or(u32::MAX);
                    w.write_u32(index);
                }
                ObjectRef::Unknown => {
                    w.write_u32(OBJECT_KIND_UNKNOWN);
                }
            }
        }
        Variant::Dictionary(entries) => {
            w.write_u32(DICTIONARY);
            w.write_u32(entries.len() as u32);
            for (k, v) in entries {
                encode(k, w, engine_major, deps)?;
                encode(v, w, engine_major, deps)?;
            }
        }
        Variant::Array(items) => {
            w.write_u32(ARRAY);
            w.write_u32(items.len() as u32);
            for item in items {
                encode(item, w, engine_major, deps)?;
            }
        }
        Variant::PackedByteArray(bytes) => {
            w.write_u32(PACKED_BYTE_ARRAY);
            w.write_u32(bytes.len() as u32);
            w.write_bytes(bytes);
        }
        Variant::PackedInt32Array(items) => {
            w.write_u32(PACKED_INT32_ARRAY);
            w.write_u32(items.len() as u32);
            for i in items {
                w.write_i32(*i);
            }
        }
        Variant::PackedFloat32Array(items) => {
            w.write_u32(PACKED_FLOAT32_ARRAY);
            w.write_u32(items.len() as u32);
            for f in items {
                w.write_f32(*f);
            }
        }
        Variant::PackedStringArray(items) => {
            w.write_u32(PACKED_STRING_ARRAY);
            w.write_u32(items.len() as u32);
            for s in items {
                write_string(w, s);
            }
        }
        Variant::PackedVector2Array(items) => {
            w.write_u32(PACKED_VECTOR2_ARRAY);
            w.write_u32(items.len() as u32);
            for v in items {
                w.write_f32(v.x);
                w.write_f32(v.y);
            }
        }
        Variant::PackedVector3Array(items) => {
            w.write_u32(PACKED_VECTOR3_ARRAY);
            w.write_u32(items.len() as u32);
            for v in items {
                w.write_f32(v.x);
                w.write_f32(v.y);
                w.write_f32(v.z);
            }
        }
        Variant::Image(image) => {
            w.write_u32(IMAGE);
            w.write_u32(image.width);
            w.write_u32(image.height);
            w.write_u32(image.format.to_u32());
            w.write_u32(image.data.len() as u32);
            w.write_bytes(&image.data);
        }
    }
    Ok(())
}

/// Decodes a single variant value from `c`. `engine_major < 3` enables the
/// legacy v2 framing: an [`Variant::Image`] payload is an index into an
/// inline RGBA palette rather than raw pixels, and is expanded to
/// [`ImagePixelFormat::Rgba8`] here so every consumer downstream of this
/// codec only ever sees normalized pixel data (spec §4.D supplement).
pub fn decode(c: &mut Cursor, engine_major: u32, deps: &DependencyTable) -> Result<Variant, VariantError> {
    let type_id = c.read_u32()?;
    Ok(match type_id {
        NIL => Variant::Nil,
        BOOL => Variant::Bool(c.read_u32()? != 0),
        INT => Variant::Int(c.read_i64()?),
        FLOAT => Variant::Float(c.read_f64()?),
        STRING => Variant::String(read_string(c)?),
        VECTOR2 => Variant::Vector2(Vector2 { x: c.read_f32()?, y: c.read_f32()? }),
        VECTOR2I => Variant::Vector2i(Vector2i { x: c.read_i32()?, y: c.read_i32()? }),
        RECT2 => Variant::Rect2(Rect2 {
            position: Vector2 { x: c.read_f32()?, y: c.read_f32()? },
            size: Vector2 { x: c.read_f32()?, y: c.read_f32()? },
        }),
        VECTOR3 => Variant::Vector3(Vector3 { x: c.read_f32()?, y: c.read_f32()?, z: c.read_f32()? }),
        VECTOR3I => Variant::Vector3i(Vector3i { x: c.read_i32()?, y: c.read_i32()?, z: c.read_i32()? }),
        VECTOR4 => Variant::Vector4(Vector4 {
            x: c.read_f32()?,
            y: c.read_f32()?,
            z: c.read_f32()?,
            w: c.read_f32()?,
        }),
        VECTOR4I => Variant::Vector4i(Vector4i {
            x: c.read_i32()?,
            y: c.read_i32()?,
            z: c.read_i32()?,
            w: c.read_i32()?,
        }),
        TRANSFORM2D => {
            let x = Vector2 { x: c.read_f32()?, y: c.read_f32()? };
            let y = Vector2 { x: c.read_f32()?, y: c.read_f32()? };
            let origin = Vector2 { x: c.read_f32()?, y: c.read_f32()? };
            Variant::Transform2D(Transform2D { x, y, origin })
        }
        PLANE => Variant::Plane(Plane {
            normal: Vector3 { x: c.read_f32()?, y: c.read_f32()?, z: c.read_f32()? },
            d: c.read_f32()?,
        }),
        QUATERNION => Variant::Quaternion(Quaternion {
            x: c.read_f32()?,
            y: c.read_f32()?,
            z: c.read_f32()?,
            w: c.read_f32()?,
        }),
        AABB => Variant::Aabb(Aabb {
            position: Vector3 { x: c.read_f32()?, y: c.read_f32()?, z: c.read_f32()? },
            size: Vector3 { x: c.read_f32()?, y: c.read_f32()?, z: c.read_f32()? },
        }),
        BASIS => {
            let mut rows = [Vector3 { x: 0.0, y: 0.0, z: 0.0 }; 3];
            for row in &mut rows {
                *row = Vector3 { x: c.read_f32()?, y: c.read_f32()?, z: c.read_f32()? };
            }
            Variant::Basis(Basis { rows })
        }
        TRANSFORM3D => {
            let mut rows = [Vector3 { x: 0.0, y: 0.0, z: 0.0 }; 3];
            for row in &mut rows {
                *row = Vector3 { x: c.read_f32()?, y: c.read_f32()?, z: c.read_f32()? };
            }
            let origin = Vector3 { x: c.read_f32()?, y: c.read_f32()?, z: c.read_f32()? };
            Variant::Transform3D(Transform3D { basis: Basis { rows }, origin })
        }
        COLOR => Variant::Color(Color {
            r: c.read_f32()?,
            g: c.read_f32()?,
            b: c.read_f32()?,
            a: c.read_f32()?,
        }),
        NODE_PATH => Variant::NodePath(read_string(c)?),
        OBJECT_ID => Variant::ObjectId(c.read_i64()?),
        RID => Variant::Rid(c.read_u64()?),
        OBJECT => {
            let kind = c.read_u32()?;
            Variant::Object(match kind {
                OBJECT_KIND_INTERNAL => ObjectRef::Internal(read_string(c)?),
                OBJECT_KIND_EXTERNAL => {
                    let index = c.read_u32()?;
                    ObjectRef::External(deps.resolve(index)?.to_string())
                }
                OBJECT_KIND_UNKNOWN => ObjectRef::Unknown,
                other => return Err(VariantError::UnknownObjectKind(other)),
            })
        }
        DICTIONARY => {
            let count = c.read_u32()?;
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let k = decode(c, engine_major, deps)?;
                let v = decode(c, engine_major, deps)?;
                entries.push((k, v));
            }
            Variant::Dictionary(entries)
        }
        ARRAY => {
            let count = c.read_u32()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(decode(c, engine_major, deps)?);
            }
            Variant::Array(items)
        }
        PACKED_BYTE_ARRAY => {
            let count = c.read_u32()?;
            Variant::PackedByteArray(c.read_bytes(count as usize)?.to_vec())
        }
        PACKED_INT32_ARRAY => {
            let count = c.read_u32()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(c.read_i32()?);
            }
            Variant::PackedInt32Array(items)
        }
        PACKED_FLOAT32_ARRAY => {
            let count = c.read_u32()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(c.read_f32()?);
            }
            Variant::PackedFloat32Array(items)
        }
        PACKED_STRING_ARRAY => {
            let count = c.read_u32()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(read_string(c)?);
            }
            Variant::PackedStringArray(items)
        }
        PACKED_VECTOR2_ARRAY => {
            let count = c.read_u32()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(Vector2 { x: c.read_f32()?, y: c.read_f32()? });
            }
            Variant::PackedVector2Array(items)
        }
        PACKED_VECTOR3_ARRAY => {
            let count = c.read_u32()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(Vector3 { x: c.read_f32()?, y: c.read_f32()?, z: c.read_f32()? });
            }
            Variant::PackedVector3Array(items)
        }
        IMAGE => {
            let width = c.read_u32()?;
            let height = c.read_u32()?;
            let format_tag = c.read_u32()?;
            let format = ImagePixelFormat::from_u32(format_tag).ok_or(VariantError::UnknownImageFormat(format_tag))?;
            if engine_major < 3 {
                decode_v2_indexed_image(c, width, height)?
            } else {
                let len = c.read_u32()? as usize;
                let data = c.read_bytes(len)?.to_vec();
                Variant::Image(Image { width, height, format, data })
            }
        }
        other => return Err(VariantError::UnknownType(other)),
    })
}

/// v2's on-disk image layout: an `[u32 palette_len][palette: Rgba8 *
/// palette_len][indices: u8 * width * height]` indexed-palette encoding,
/// expanded to plain [`ImagePixelFormat::Rgba8`] pixels.
fn decode_v2_indexed_image(c: &mut Cursor, width: u32, height: u32) -> Result<Variant, VariantError> {
    let palette_len = c.read_u32()?;
    let mut palette = Vec::with_capacity(palette_len as usize);
    for _ in 0..palette_len {
        palette.push([c.read_u8()?, c.read_u8()?, c.read_u8()?, c.read_u8()?]);
    }
    let pixel_count = width as usize * height as usize;
    let indices = c.read_bytes(pixel_count)?;
    let mut data = Vec::with_capacity(pixel_count * 4);
    for &index in indices {
        let rgba = palette.get(index as usize).copied().unwrap_or([0, 0, 0, 0]);
        data.extend_from_slice(&rgba);
    }
    Ok(Variant::Image(Image { width, height, format: ImagePixelFormat::Rgba8, data }))
}

fn write_string(w: &mut Writer, s: &str) {
    w.write_prefixed_string_padded(s, StringEncoding::Utf8);
}

fn read_string(c: &mut Cursor) -> Result<String, VariantError> {
    Ok(c.read_prefixed_string_padded(StringEncoding::Utf8)?)
}
