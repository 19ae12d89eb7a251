//! Canonical text rendering for a [`Variant`] (spec §4.D, Scenario 4): the
//! same textual grammar used by `.tres`/`.tscn` property bodies. Emission is
//! deterministic; parsing is tolerant of the handful of spellings the editor
//! itself emits across versions.

use std::fmt::Write as _;

use super::value::{ImagePixelFormat, ObjectRef, Variant};

/// Renders `value` the way the editor's text resource writer would: floats
/// always carry a decimal point, strings are double-quoted, constructors use
/// `Type(a, b, c)` call syntax.
pub fn to_text(value: &Variant) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Variant) {
    match value {
        Variant::Nil => out.push_str("null"),
        Variant::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Variant::Int(i) => {
            let _ = write!(out, "{i}");
        }
        Variant::Float(f) => write_float(out, *f),
        Variant::String(s) => write_quoted(out, s),
        Variant::NodePath(s) => {
            let _ = write!(out, "NodePath(");
            write_quoted(out, s);
            out.push(')');
        }
        Variant::Vector2(v) => {
            let _ = write!(out, "Vector2({}, {})", trim_float(v.x as f64), trim_float(v.y as f64));
        }
        Variant::Vector2i(v) => {
            let _ = write!(out, "Vector2i({}, {})", v.x, v.y);
        }
        Variant::Vector3(v) => {
            let _ = write!(
                out,
                "Vector3({}, {}, {})",
                trim_float(v.x as f64),
                trim_float(v.y as f64),
                trim_float(v.z as f64)
            );
        }
        Variant::Vector3i(v) => {
            let _ = write!(out, "Vector3i({}, {}, {})", v.x, v.y, v.z);
        }
        Variant::Vector4(v) => {
            let _ = write!(
                out,
                "Vector4({}, {}, {}, {})",
                trim_float(v.x as f64),
                trim_float(v.y as f64),
                trim_float(v.z as f64),
                trim_float(v.w as f64)
            );
        }
        Variant::Vector4i(v) => {
            let _ = write!(out, "Vector4i({}, {}, {}, {})", v.x, v.y, v.z, v.w);
        }
        Variant::Rect2(r) => {
            let _ = write!(
                out,
                "Rect2({}, {}, {}, {})",
                trim_float(r.position.x as f64),
                trim_float(r.position.y as f64),
                trim_float(r.size.x as f64),
                trim_float(r.size.y as f64)
            );
        }
        Variant::Transform2D(t) => {
            let _ = write!(
                out,
                "Transform2D({}, {}, {}, {}, {}, {})",
                trim_float(t.x.x as f64),
                trim_float(t.x.y as f64),
                trim_float(t.y.x as f64),
                trim_float(t.y.y as f64),
                trim_float(t.origin.x as f64),
                trim_float(t.origin.y as f64)
            );
        }
        Variant::Plane(p) => {
            let _ = write!(
                out,
                "Plane({}, {}, {}, {})",
                trim_float(p.normal.x as f64),
                trim_float(p.normal.y as f64),
                trim_float(p.normal.z as f64),
                trim_float(p.d as f64)
            );
        }
        Variant::Quaternion(q) => {
            let _ = write!(
                out,
                "Quaternion({}, {}, {}, {})",
                trim_float(q.x as f64),
                trim_float(q.y as f64),
                trim_float(q.z as f64),
                trim_float(q.w as f64)
            );
        }
        Variant::Aabb(a) => {
            let _ = write!(
                out,
                "AABB({}, {}, {}, {}, {}, {})",
                trim_float(a.position.x as f64),
                trim_float(a.position.y as f64),
                trim_float(a.position.z as f64),
                trim_float(a.size.x as f64),
                trim_float(a.size.y as f64),
                trim_float(a.size.z as f64)
            );
        }
        Variant::Basis(b) => {
            let _ = write!(out, "Basis(");
            for (i, row) in b.rows.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}, {}, {}", trim_float(row.x as f64), trim_float(row.y as f64), trim_float(row.z as f64));
            }
            out.push(')');
        }
        Variant::Transform3D(t) => {
            let _ = write!(out, "Transform3D(");
            for row in &t.basis.rows {
                let _ = write!(out, "{}, {}, {}, ", trim_float(row.x as f64), trim_float(row.y as f64), trim_float(row.z as f64));
            }
            let _ = write!(
                out,
                "{}, {}, {})",
                trim_float(t.origin.x as f64),
                trim_float(t.origin.y as f64),
                trim_float(t.origin.z as f64)
            );
        }
        Variant::Color(c) => {
            let _ = write!(
                out,
                "Color({}, {}, {}, {})",
                trim_float(c.r as f64),
                trim_float(c.g as f64),
                trim_float(c.b as f64),
                trim_float(c.a as f64)
            );
        }
        Variant::ObjectId(id) => {
            let _ = write!(out, "ObjectID({id})");
        }
        Variant::Rid(id) => {
            let _ = write!(out, "RID({id})");
        }
        Variant::Object(ObjectRef::Internal(id)) => {
            let _ = write!(out, "SubResource(\"{id}\")");
        }
        Variant::Object(ObjectRef::External(path)) => {
            let _ = write!(out, "ExtResource(\"{path}\")");
        }
        Variant::Object(ObjectRef::Unknown) => out.push_str("null"),
        Variant::Dictionary(entries) => {
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, k);
                out.push_str(": ");
                write_value(out, v);
            }
            out.push('}');
        }
        Variant::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Variant::PackedByteArray(bytes) => write_packed(out, "PackedByteArray", bytes.iter().map(|b| b.to_string())),
        Variant::PackedInt32Array(items) => write_packed(out, "PackedInt32Array", items.iter().map(|i| i.to_string())),
        Variant::PackedFloat32Array(items) => {
            write_packed(out, "PackedFloat32Array", items.iter().map(|f| trim_float(*f as f64)))
        }
        Variant::PackedStringArray(items) => {
            write_packed(out, "PackedStringArray", items.iter().map(|s| format!("\"{}\"", escape(s))))
        }
        Variant::PackedVector2Array(items) => write_packed(
            out,
            "PackedVector2Array",
            items.iter().map(|v| format!("{}, {}", trim_float(v.x as f64), trim_float(v.y as f64))),
        ),
        Variant::PackedVector3Array(items) => write_packed(
            out,
            "PackedVector3Array",
            items
                .iter()
                .map(|v| format!("{}, {}, {}", trim_float(v.x as f64), trim_float(v.y as f64), trim_float(v.z as f64))),
        ),
        Variant::Image(image) => {
            let _ = write!(out, "Image({}, {}, \"{}\", ", image.width, image.height, image.format.name());
            write_packed(out, "PackedByteArray", image.data.iter().map(|b| b.to_string()));
            out.push(')');
        }
    }
}

fn write_packed(out: &mut String, ctor: &str, items: impl Iterator<Item = String>) {
    let _ = write!(out, "{ctor}(");
    out.push_str(&items.collect::<Vec<_>>().join(", "));
    out.push(')');
}

fn write_quoted(out: &mut String, s: &str) {
    out.push('"');
    out.push_str(&escape(s));
    out.push('"');
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A bare `float` property always carries a decimal point, matching the
/// editor (`1.0`, not `1`) even for whole numbers.
fn write_float(out: &mut String, f: f64) {
    if f.fract() == 0.0 && f.is_finite() {
        let _ = write!(out, "{f:.1}");
    } else {
        let _ = write!(out, "{f}");
    }
}

/// Geometry-constructor components (`Vector3(1, 2, 3)`) print without a
/// forced decimal point — only the top-level `float` scalar does that.
fn trim_float(f: f64) -> String {
    format!("{f}")
}

/// A tolerant parser for the grammar [`to_text`] emits. Tolerant in the
/// sense the editor's own reader is: whitespace is insignificant, integers
/// are accepted where floats are expected, and a handful of constructor
/// names the editor has used across versions (e.g. `Matrix3` as an alias
/// for `Basis`) are recognized.
pub fn from_text(input: &str) -> Result<Variant, TextParseError> {
    let mut p = Parser { bytes: input.as_bytes(), pos: 0 };
    p.skip_ws();
    let value = p.parse_value()?;
    p.skip_ws();
    if p.pos != p.bytes.len() {
        return Err(TextParseError::TrailingInput(p.pos));
    }
    Ok(value)
}

#[derive(Debug, thiserror::Error)]
pub enum TextParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected character {0:?} at byte offset {1}")]
    UnexpectedChar(char, usize),
    #[error("unknown constructor '{0}'")]
    UnknownConstructor(String),
    #[error("constructor '{0}' expected {1} numeric arguments, got {2}")]
    ArityMismatch(String, usize, usize),
    #[error("trailing input at byte offset {0}")]
    TrailingInput(usize),
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: u8) -> Result<(), TextParseError> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            match self.peek() {
                Some(got) => Err(TextParseError::UnexpectedChar(got as char, self.pos)),
                None => Err(TextParseError::UnexpectedEof),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Variant, TextParseError> {
        self.skip_ws();
        match self.peek().ok_or(TextParseError::UnexpectedEof)? {
            b'"' => Ok(Variant::String(self.parse_string()?)),
            b'[' => self.parse_array(),
            b'{' => self.parse_dictionary(),
            b'-' | b'0'..=b'9' | b'.' => self.parse_number(),
            _ => self.parse_keyword_or_constructor(),
        }
    }

    fn parse_string(&mut self) -> Result<String, TextParseError> {
        self.expect(b'"')?;
        let mut s = String::new();
        loop {
            match self.peek().ok_or(TextParseError::UnexpectedEof)? {
                b'"' => {
                    self.pos += 1;
                    break;
                }
                b'\\' => {
                    self.pos += 1;
                    match self.peek().ok_or(TextParseError::UnexpectedEof)? {
                        b'"' => s.push('"'),
                        b'\\' => s.push('\\'),
                        b'n' => s.push('\n'),
                        other => s.push(other as char),
                    }
                    self.pos += 1;
                }
                c => {
                    s.push(c as char);
                    self.pos += 1;
                }
            }
        }
        Ok(s)
    }

    fn parse_array(&mut self) -> Result<Variant, TextParseError> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Variant::Array(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(c) => return Err(TextParseError::UnexpectedChar(c as char, self.pos)),
                None => return Err(TextParseError::UnexpectedEof),
            }
        }
        Ok(Variant::Array(items))
    }

    fn parse_dictionary(&mut self) -> Result<Variant, TextParseError> {
        self.expect(b'{')?;
        let mut entries = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Variant::Dictionary(entries));
        }
        loop {
            let key = self.parse_value()?;
            self.expect(b':')?;
            let value = self.parse_value()?;
            entries.push((key, value));
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                Some(c) => return Err(TextParseError::UnexpectedChar(c as char, self.pos)),
                None => return Err(TextParseError::UnexpectedEof),
            }
        }
        Ok(Variant::Dictionary(entries))
    }

    fn parse_number(&mut self) -> Result<Variant, TextParseError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                b'0'..=b'9' => self.pos += 1,
                b'.' | b'e' | b'E' => {
                    is_float = true;
                    self.pos += 1;
                }
                b'+' | b'-' if is_float => self.pos += 1,
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        if is_float {
            text.parse::<f64>().map(Variant::Float).map_err(|_| TextParseError::InvalidNumber(text.to_string()))
        } else {
            text.parse::<i64>().map(Variant::Int).map_err(|_| TextParseError::InvalidNumber(text.to_string()))
        }
    }

    fn parse_ident(&mut self) -> Result<String, TextParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(match self.peek() {
                Some(c) => TextParseError::UnexpectedChar(c as char, self.pos),
                None => TextParseError::UnexpectedEof,
            });
        }
        Ok(std::str::from_utf8(&self.bytes[start..self.pos]).unwrap().to_string())
    }

    fn parse_keyword_or_constructor(&mut self) -> Result<Variant, TextParseError> {
        let ident = self.parse_ident()?;
        match ident.as_str() {
            "null" => return Ok(Variant::Nil),
            "true" => return Ok(Variant::Bool(true)),
            "false" => return Ok(Variant::Bool(false)),
            _ => {}
        }
        self.skip_ws();
        self.expect(b'(')?;
        self.skip_ws();

        if ident == "SubResource" {
            let id = self.parse_string()?;
            self.expect(b')')?;
            return Ok(Variant::Object(ObjectRef::Internal(id)));
        }
        if ident == "ExtResource" {
            let path = self.parse_string()?;
            self.expect(b')')?;
            return Ok(Variant::Object(ObjectRef::External(path)));
        }
        if ident == "NodePath" {
            let path = self.parse_string()?;
            self.expect(b')')?;
            return Ok(Variant::NodePath(path));
        }
        if ident == "RID" {
            let n = self.parse_number()?;
            self.expect(b')')?;
            return match n {
                Variant::Int(i) => Ok(Variant::Rid(i as u64)),
                _ => Err(TextParseError::InvalidNumber("RID".into())),
            };
        }
        if ident == "ObjectID" {
            let n = self.parse_number()?;
            self.expect(b')')?;
            return match n {
                Variant::Int(i) => Ok(Variant::ObjectId(i)),
                _ => Err(TextParseError::InvalidNumber("ObjectID".into())),
            };
        }
        if ident == "Image" {
            let width = self.parse_number()?;
            self.skip_ws();
            self.expect(b',')?;
            self.skip_ws();
            let height = self.parse_number()?;
            self.skip_ws();
            self.expect(b',')?;
            self.skip_ws();
            let format_name = self.parse_string()?;
            self.skip_ws();
            self.expect(b',')?;
            self.skip_ws();
            let data = self.parse_value()?;
            self.skip_ws();
            self.expect(b')')?;
            let (Variant::Int(width), Variant::Int(height)) = (width, height) else {
                return Err(TextParseError::InvalidNumber("Image".into()));
            };
            let format = ImagePixelFormat::from_name(&format_name)
                .ok_or_else(|| TextParseError::UnknownConstructor(format!("Image format {format_name}")))?;
            let Variant::PackedByteArray(data) = data else {
                return Err(TextParseError::ArityMismatch("Image".to_string(), 4, 3));
            };
            return Ok(Variant::Image(super::value::Image { width: width as u32, height: height as u32, format, data }));
        }
        if ident == "PackedStringArray" {
            let mut items = Vec::new();
            self.skip_ws();
            if self.peek() != Some(b')') {
                loop {
                    items.push(self.parse_string()?);
                    self.skip_ws();
                    match self.peek() {
                        Some(b',') => {
                            self.pos += 1;
                            self.skip_ws();
                        }
                        Some(b')') => break,
                        Some(c) => return Err(TextParseError::UnexpectedChar(c as char, self.pos)),
                        None => return Err(TextParseError::UnexpectedEof),
                    }
                }
            }
            self.expect(b')')?;
            return Ok(Variant::PackedStringArray(items));
        }

        let args = self.parse_numeric_args()?;
        self.build_constructor(&ident, args)
    }

    fn parse_numeric_args(&mut self) -> Result<Vec<f64>, TextParseError> {
        let mut out = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b')') {
            self.pos += 1;
            return Ok(out);
        }
        loop {
            match self.parse_number()? {
                Variant::Int(i) => out.push(i as f64),
                Variant::Float(f) => out.push(f),
                _ => unreachable!(),
            }
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                Some(c) => return Err(TextParseError::UnexpectedChar(c as char, self.pos)),
                None => return Err(TextParseError::UnexpectedEof),
            }
        }
        Ok(out)
    }

    fn build_constructor(&self, name: &str, a: Vec<f64>) -> Result<Variant, TextParseError> {
        use super::value::*;
        let f32s = |v: &[f64]| v.iter().map(|x| *x as f32).collect::<Vec<_>>();
        let expect = |n: usize| -> Result<(), TextParseError> {
            if a.len() != n {
                Err(TextParseError::ArityMismatch(name.to_string(), n, a.len()))
            } else {
                Ok(())
            }
        };
        Ok(match name {
            "Vector2" => {
                expect(2)?;
                let v = f32s(&a);
                Variant::Vector2(Vector2 { x: v[0], y: v[1] })
            }
            "Vector2i" => {
                expect(2)?;
                Variant::Vector2i(Vector2i { x: a[0] as i32, y: a[1] as i32 })
            }
            "Vector3" => {
                expect(3)?;
                let v = f32s(&a);
                Variant::Vector3(Vector3 { x: v[0], y: v[1], z: v[2] })
            }
            "Vector3i" => {
                expect(3)?;
                Variant::Vector3i(Vector3i { x: a[0] as i32, y: a[1] as i32, z: a[2] as i32 })
            }
            "Vector4" => {
                expect(4)?;
                let v = f32s(&a);
                Variant::Vector4(Vector4 { x: v[0], y: v[1], z: v[2], w: v[3] })
            }
            "Vector4i" => {
                expect(4)?;
                Variant::Vector4i(Vector4i { x: a[0] as i32, y: a[1] as i32, z: a[2] as i32, w: a[3] as i32 })
            }
            "Rect2" => {
                expect(4)?;
                let v = f32s(&a);
                Variant::Rect2(Rect2 { position: Vector2 { x: v[0], y: v[1] }, size: Vector2 { x: v[2], y: v[3] } })
            }
            "Transform2D" => {
                expect(6)?;
                let v = f32s(&a);
                Variant::Transform2D(Transform2D {
                    x: Vector2 { x: v[0], y: v[1] },
                    y: Vector2 { x: v[2], y: v[3] },
                    origin: Vector2 { x: v[4], y: v[5] },
                })
            }
            "Plane" => {
                expect(4)?;
                let v = f32s(&a);
                Variant::Plane(Plane { normal: Vector3 { x: v[0], y: v[1], z: v[2] }, d: v[3] })
            }
            "Quaternion" => {
                expect(4)?;
                let v = f32s(&a);
                Variant::Quaternion(Quaternion { x: v[0], y: v[1], z: v[2], w: v[3] })
            }
            "AABB" => {
                expect(6)?;
                let v = f32s(&a);
                Variant::Aabb(Aabb {
                    position: Vector3 { x: v[0], y: v[1], z: v[2] },
                    size: Vector3 { x: v[3], y: v[4], z: v[5] },
                })
            }
            "Basis" | "Matrix3" => {
                expect(9)?;
                let v = f32s(&a);
                Variant::Basis(Basis {
                    rows: [
                        Vector3 { x: v[0], y: v[1], z: v[2] },
                        Vector3 { x: v[3], y: v[4], z: v[5] },
                        Vector3 { x: v[6], y: v[7], z: v[8] },
                    ],
                })
            }
            "Transform3D" | "Transform" => {
                expect(12)?;
                let v = f32s(&a);
                Variant::Transform3D(Transform3D {
                    basis: Basis {
                        rows: [
                            Vector3 { x: v[0], y: v[1], z: v[2] },
                            Vector3 { x: v[3], y: v[4], z: v[5] },
                            Vector3 { x: v[6], y: v[7], z: v[8] },
                        ],
                    },
                    origin: Vector3 { x: v[9], y: v[10], z: v[11] },
                })
            }
            "Color" => {
                expect(4)?;
                let v = f32s(&a);
                Variant::Color(Color { r: v[0], g: v[1], b: v[2], a: v[3] })
            }
            "PackedByteArray" => Variant::PackedByteArray(a.iter().map(|x| *x as u8).collect()),
            "PackedInt32Array" => Variant::PackedInt32Array(a.iter().map(|x| *x as i32).collect()),
            "PackedFloat32Array" => Variant::PackedFloat32Array(f32s(&a)),
            "PackedVector2Array" => {
                if a.len() % 2 != 0 {
                    return Err(TextParseError::ArityMismatch(name.to_string(), a.len() + 1, a.len()));
                }
                Variant::PackedVector2Array(a.chunks(2).map(|c| Vector2 { x: c[0] as f32, y: c[1] as f32 }).collect())
            }
            "PackedVector3Array" => {
                if a.len() % 3 != 0 {
                    return Err(TextParseError::ArityMismatch(name.to_string(), a.len() + 1, a.len()));
                }
                Variant::PackedVector3Array(
                    a.chunks(3).map(|c| Vector3 { x: c[0] as f32, y: c[1] as f32, z: c[2] as f32 }).collect(),
                )
            }
            other => return Err(TextParseError::UnknownConstructor(other.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::value::Vector3;

    #[test]
    fn dictionary_with_mixed_array_matches_spec_scenario() {
        let value = Variant::Dictionary(vec![
            (
                Variant::String("k".into()),
                Variant::Array(vec![Variant::Int(1), Variant::Float(2.5), Variant::String("s".into())]),
            ),
            (Variant::String("v".into()), Variant::Vector3(Vector3 { x: 1.0, y: 2.0, z: 3.0 })),
        ]);
        assert_eq!(to_text(&value), r#"{"k": [1, 2.5, "s"], "v": Vector3(1, 2, 3)}"#);
    }

    #[test]
    fn integral_floats_keep_a_decimal_point() {
        assert_eq!(to_text(&Variant::Float(1.0)), "1.0");
        assert_eq!(to_text(&Variant::Float(2.5)), "2.5");
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(to_text(&Variant::String("a\"b".into())), "\"a\\\"b\"");
    }

    #[test]
    fn image_round_trips_through_text() {
        use super::super::value::{Image, ImagePixelFormat};
        let value = Variant::Image(Image { width: 2, height: 1, format: ImagePixelFormat::Rgba8, data: vec![1, 2, 3, 4, 5, 6, 7, 8] });
        let rendered = to_text(&value);
        assert_eq!(rendered, "Image(2, 1, \"Rgba8\", PackedByteArray(1, 2, 3, 4, 5, 6, 7, 8))");
        assert_eq!(from_text(&rendered).unwrap(), value);
    }

    #[test]
    fn parses_the_spec_scenario_text_back_into_the_same_structure() {
        let value = Variant::Dictionary(vec![
            (
                Variant::String("k".into()),
                Variant::Array(vec![Variant::Int(1), Variant::Float(2.5), Variant::String("s".into())]),
            ),
            (Variant::String("v".into()), Variant::Vector3(Vector3 { x: 1.0, y: 2.0, z: 3.0 })),
        ]);
        let text = to_text(&value);
        assert_eq!(from_text(&text).unwrap(), value);
    }

    #[test]
    fn parser_is_tolerant_of_whitespace_and_recognizes_aliases() {
        let parsed = from_text("  Matrix3( 1,0,0, 0,1,0, 0,0,1 )  ").unwrap();
        assert!(matches!(parsed, Variant::Basis(_)));
    }

    #[test]
    fn sub_resource_and_ext_resource_round_trip() {
        assert_eq!(
            from_text(r#"SubResource("3")"#).unwrap(),
            Variant::Object(ObjectRef::Internal("3".to_string()))
        );
        assert_eq!(
            from_text(r#"ExtResource("res://a.tres")"#).unwrap(),
            Variant::Object(ObjectRef::External("res://a.tres".to_string()))
        );
    }

    #[test]
    fn unknown_constructor_is_a_parse_error() {
        assert!(matches!(from_text("Foo(1, 2)"), Err(TextParseError::UnknownConstructor(_))));
    }
}
