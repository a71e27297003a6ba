//! CPU-side mirror of a shader uniform block.
//!
//! A `PropertyLayout` turns an ordered field list into byte offsets following
//! the WGSL uniform (std140-compatible) rules for the supported types, and a
//! `PropertyBlock` holds the raw bytes plus a dirty flag. The renderer uploads
//! the bytes verbatim, so layout offsets must match the WGSL struct.

use std::fmt;

/// Type of a uniform-block field.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PropertyType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl PropertyType {
    /// Alignment in bytes under WGSL uniform / std140 rules.
    pub const fn align(self) -> usize {
        match self {
            PropertyType::Float => 4,
            PropertyType::Vec2 => 8,
            PropertyType::Vec3 | PropertyType::Vec4 | PropertyType::Mat4 => 16,
        }
    }

    /// Size in bytes. Note `Vec3` occupies 12 bytes; a following `Float` may
    /// pack into the trailing pad.
    pub const fn size(self) -> usize {
        match self {
            PropertyType::Float => 4,
            PropertyType::Vec2 => 8,
            PropertyType::Vec3 => 12,
            PropertyType::Vec4 => 16,
            PropertyType::Mat4 => 64,
        }
    }
}

/// Error produced by property lookups and typed setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    UnknownProperty(String),
    TypeMismatch {
        name: String,
        expected: PropertyType,
        found: PropertyType,
    },
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyError::UnknownProperty(name) => {
                write!(f, "unknown material property `{name}`")
            }
            PropertyError::TypeMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "material property `{name}` is {expected:?}, not {found:?}"
            ),
        }
    }
}

impl std::error::Error for PropertyError {}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    name: String,
    ty: PropertyType,
    offset: usize,
}

/// Named-offset bookkeeping for a uniform block.
///
/// Offsets are assigned in declaration order: each field is aligned to its
/// type's alignment, and the total size is rounded up to 16 bytes so the
/// buffer can back a WGSL uniform struct directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyLayout {
    fields: Vec<Field>,
    size: usize,
}

impl PropertyLayout {
    /// Builds a layout from `(name, type)` pairs in declaration order.
    ///
    /// Duplicate names are a caller bug and panic in debug builds; the last
    /// declaration wins otherwise.
    pub fn build<'a>(fields: impl IntoIterator<Item = (&'a str, PropertyType)>) -> Self {
        let mut out = Vec::new();
        let mut offset = 0usize;

        for (name, ty) in fields {
            debug_assert!(
                !out.iter().any(|f: &Field| f.name == name),
                "duplicate property `{name}`"
            );

            offset = align_up(offset, ty.align());
            out.push(Field {
                name: name.to_string(),
                ty,
                offset,
            });
            offset += ty.size();
        }

        Self {
            fields: out,
            size: align_up(offset, 16),
        }
    }

    /// Total buffer size in bytes (multiple of 16, may be zero).
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Byte offset of `name`, if declared.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.field(name).map(|f| f.offset)
    }

    /// Declared type of `name`, if declared.
    pub fn type_of(&self, name: &str) -> Option<PropertyType> {
        self.field(name).map(|f| f.ty)
    }

    fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn resolve(&self, name: &str, ty: PropertyType) -> Result<usize, PropertyError> {
        let field = self
            .field(name)
            .ok_or_else(|| PropertyError::UnknownProperty(name.to_string()))?;
        if field.ty != ty {
            return Err(PropertyError::TypeMismatch {
                name: name.to_string(),
                expected: field.ty,
                found: ty,
            });
        }
        Ok(field.offset)
    }
}

/// CPU mirror of a GPU uniform buffer.
///
/// Bytes start zeroed. Setters go through the layout's named offsets and mark
/// the block dirty; the renderer clears the flag after uploading.
#[derive(Debug, Clone)]
pub struct PropertyBlock {
    layout: PropertyLayout,
    data: Vec<u8>,
    dirty: bool,
}

impl PropertyBlock {
    pub fn new(layout: PropertyLayout) -> Self {
        let data = vec![0u8; layout.size()];
        Self {
            layout,
            data,
            // Freshly created blocks must reach the GPU at least once.
            dirty: true,
        }
    }

    #[inline]
    pub fn layout(&self) -> &PropertyLayout {
        &self.layout
    }

    /// Raw bytes, uploaded verbatim by the renderer.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Called by the renderer once the current bytes are on the GPU.
    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    // ── setters ───────────────────────────────────────────────────────────

    pub fn set_float(&mut self, name: &str, v: f32) -> Result<(), PropertyError> {
        self.write(name, PropertyType::Float, &v.to_le_bytes())
    }

    pub fn set_vec2(&mut self, name: &str, v: [f32; 2]) -> Result<(), PropertyError> {
        self.write(name, PropertyType::Vec2, bytemuck::cast_slice(&v))
    }

    pub fn set_vec3(&mut self, name: &str, v: [f32; 3]) -> Result<(), PropertyError> {
        self.write(name, PropertyType::Vec3, bytemuck::cast_slice(&v))
    }

    pub fn set_vec4(&mut self, name: &str, v: [f32; 4]) -> Result<(), PropertyError> {
        self.write(name, PropertyType::Vec4, bytemuck::cast_slice(&v))
    }

    /// Sets a `Vec4` field from a color.
    pub fn set_color(&mut self, name: &str, c: crate::color::Color) -> Result<(), PropertyError> {
        self.set_vec4(name, c.to_array())
    }

    pub fn set_mat4(&mut self, name: &str, m: glam::Mat4) -> Result<(), PropertyError> {
        self.write(
            name,
            PropertyType::Mat4,
            bytemuck::cast_slice(&m.to_cols_array()),
        )
    }

    // ── getters (tools and tests) ─────────────────────────────────────────

    pub fn get_float(&self, name: &str) -> Result<f32, PropertyError> {
        let off = self.layout.resolve(name, PropertyType::Float)?;
        Ok(f32::from_le_bytes(
            self.data[off..off + 4].try_into().unwrap(),
        ))
    }

    pub fn get_vec4(&self, name: &str) -> Result<[f32; 4], PropertyError> {
        let off = self.layout.resolve(name, PropertyType::Vec4)?;
        let mut out = [0.0f32; 4];
        bytemuck::cast_slice_mut(&mut out).copy_from_slice(&self.data[off..off + 16]);
        Ok(out)
    }

    fn write(&mut self, name: &str, ty: PropertyType, bytes: &[u8]) -> Result<(), PropertyError> {
        let off = self.layout.resolve(name, ty)?;
        self.data[off..off + bytes.len()].copy_from_slice(bytes);
        self.dirty = true;
        Ok(())
    }
}

#[inline]
const fn align_up(v: usize, align: usize) -> usize {
    (v + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── layout offsets ────────────────────────────────────────────────────

    #[test]
    fn scalar_fields_pack_tightly() {
        let layout = PropertyLayout::build([
            ("a", PropertyType::Float),
            ("b", PropertyType::Float),
        ]);
        assert_eq!(layout.offset_of("a"), Some(0));
        assert_eq!(layout.offset_of("b"), Some(4));
        assert_eq!(layout.size(), 16);
    }

    #[test]
    fn vec4_after_float_skips_to_next_16() {
        let layout = PropertyLayout::build([
            ("a", PropertyType::Float),
            ("b", PropertyType::Vec4),
        ]);
        assert_eq!(layout.offset_of("b"), Some(16));
        assert_eq!(layout.size(), 32);
    }

    #[test]
    fn float_packs_into_vec3_tail_pad() {
        // std140: vec3 aligns to 16 but occupies 12; a float may follow at 12.
        let layout = PropertyLayout::build([
            ("v", PropertyType::Vec3),
            ("f", PropertyType::Float),
        ]);
        assert_eq!(layout.offset_of("v"), Some(0));
        assert_eq!(layout.offset_of("f"), Some(12));
        assert_eq!(layout.size(), 16);
    }

    #[test]
    fn vec2_alignment() {
        let layout = PropertyLayout::build([
            ("f", PropertyType::Float),
            ("v", PropertyType::Vec2),
        ]);
        assert_eq!(layout.offset_of("v"), Some(8));
    }

    #[test]
    fn mat4_occupies_64_bytes() {
        let layout = PropertyLayout::build([
            ("m", PropertyType::Mat4),
            ("f", PropertyType::Float),
        ]);
        assert_eq!(layout.offset_of("f"), Some(64));
        assert_eq!(layout.size(), 80);
    }

    #[test]
    fn empty_layout_is_zero_sized() {
        let layout = PropertyLayout::build([]);
        assert_eq!(layout.size(), 0);
    }

    // ── block round-trips ─────────────────────────────────────────────────

    fn block() -> PropertyBlock {
        PropertyBlock::new(PropertyLayout::build([
            ("tint", PropertyType::Vec4),
            ("strength", PropertyType::Float),
        ]))
    }

    #[test]
    fn set_get_round_trip() {
        let mut b = block();
        b.set_vec4("tint", [0.1, 0.2, 0.3, 0.4]).unwrap();
        b.set_float("strength", 2.5).unwrap();

        assert_eq!(b.get_vec4("tint").unwrap(), [0.1, 0.2, 0.3, 0.4]);
        assert_eq!(b.get_float("strength").unwrap(), 2.5);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let mut b = block();
        assert_eq!(
            b.set_float("nope", 1.0),
            Err(PropertyError::UnknownProperty("nope".into()))
        );
    }

    #[test]
    fn wrong_type_is_an_error() {
        let mut b = block();
        let err = b.set_float("tint", 1.0).unwrap_err();
        assert!(matches!(err, PropertyError::TypeMismatch { .. }));
    }

    #[test]
    fn setters_mark_dirty_and_renderer_clears() {
        let mut b = block();
        assert!(b.is_dirty(), "new blocks start dirty");

        b.clear_dirty();
        assert!(!b.is_dirty());

        b.set_float("strength", 1.0).unwrap();
        assert!(b.is_dirty());
    }

    #[test]
    fn failed_sets_do_not_mark_dirty() {
        let mut b = block();
        b.clear_dirty();
        let _ = b.set_float("nope", 1.0);
        assert!(!b.is_dirty());
    }

    #[test]
    fn bytes_len_matches_layout_size() {
        let b = block();
        assert_eq!(b.bytes().len(), b.layout().size());
        assert_eq!(b.bytes().len(), 32);
    }
}
