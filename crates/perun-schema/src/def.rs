//! Structure definitions.
//!
//! A [`StructDef`] is the declarative description of one wire structure: an
//! ordered field table built once at registration time. Field order is wire
//! order; it determines where alignment padding is inserted. The typed side
//! of the same structure is a plain Rust struct implementing [`Record`],
//! whose `read`/`write` walk the field table through the field cursors.

use std::sync::OnceLock;

use glam::Vec3;

use crate::codec::{Codec, ALIGNMENT_CAP, DEFAULT_LIST_TAG};
use crate::read::FieldReader;
use crate::write::FieldWriter;
use crate::Result;

/// One field of a structure definition.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    /// Field name, as hashed into diagnostics (never written to the wire).
    pub name: &'static str,
    /// Wire codec of the field.
    pub codec: Codec,
    /// Fixed repeat count for fixed arrays and fixed-length text.
    pub len: Option<usize>,
    /// Format tag emitted when this field is a pointer list.
    pub tag: u32,
}

impl Field {
    /// A single-element field.
    pub const fn plain(name: &'static str, codec: Codec) -> Self {
        Self {
            name,
            codec,
            len: None,
            tag: DEFAULT_LIST_TAG,
        }
    }

    /// A fixed-repeat field (fixed array or fixed-length text buffer).
    pub const fn array(name: &'static str, codec: Codec, len: usize) -> Self {
        Self {
            name,
            codec,
            len: Some(len),
            tag: DEFAULT_LIST_TAG,
        }
    }

    /// A pointer-list field with a non-default format tag.
    pub const fn tagged(name: &'static str, codec: Codec, tag: u32) -> Self {
        Self {
            name,
            codec,
            len: None,
            tag,
        }
    }
}

/// A structure definition: ordered fields plus a cached alignment.
pub struct StructDef {
    /// Structure name; its CRC32C hash identifies the type in container
    /// headers and the record catalog.
    pub name: &'static str,
    /// Fields in wire order.
    pub fields: &'static [Field],
    align: OnceLock<u32>,
}

impl StructDef {
    /// Create a definition. Meant for statics:
    ///
    /// ```
    /// use perun_schema::{Codec, Field, StructDef};
    ///
    /// static FIELDS: &[Field] = &[
    ///     Field::plain("id", Codec::UInt32),
    ///     Field::plain("weight", Codec::Float32),
    /// ];
    /// static DEF: StructDef = StructDef::new("Sample", FIELDS);
    ///
    /// assert_eq!(DEF.alignment(), 4);
    /// assert_eq!(DEF.fixed_size(), 8);
    /// ```
    pub const fn new(name: &'static str, fields: &'static [Field]) -> Self {
        Self {
            name,
            fields,
            align: OnceLock::new(),
        }
    }

    /// Required alignment: the maximum over all member alignments, computed
    /// lazily and cached. Nested structures recurse; the walk stops early
    /// once the cap is reached.
    pub fn alignment(&self) -> u32 {
        *self.align.get_or_init(|| {
            let mut max = 1;
            for field in self.fields {
                max = max.max(field.codec.alignment());
                if max >= ALIGNMENT_CAP {
                    return ALIGNMENT_CAP;
                }
            }
            max
        })
    }

    /// Inline byte size: the field walk with per-field padding. Pointer-list
    /// fields count as their 16-byte records.
    pub fn fixed_size(&self) -> usize {
        let mut pos = 0;
        for field in self.fields {
            pos = align_up(pos, field.codec.alignment());
            pos += field.codec.inline_size() * field.len.unwrap_or(1);
        }
        pos
    }

    /// CRC32C hash of the structure name, as written in container headers.
    pub fn name_hash(&self) -> u32 {
        perun_common::crc::hash_str(self.name)
    }
}

impl std::fmt::Debug for StructDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructDef")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .finish()
    }
}

/// Round `pos` up to the next multiple of `align`.
#[inline]
pub(crate) fn align_up(pos: usize, align: u32) -> usize {
    let align = align as usize;
    pos.div_ceil(align) * align
}

/// A typed wire structure.
///
/// Implementors are plain Rust structs with named, typed fields in declared
/// order. `read` and `write` must touch every declared field, in order,
/// through the field cursor; the cursor enforces codec and arity agreement
/// and fails fatally on any disagreement.
pub trait Record: Clone + 'static {
    /// The structure definition this type serializes as.
    fn def() -> &'static StructDef;

    /// Populate an instance from the field cursor.
    fn read(r: &mut FieldReader<'_, '_>) -> Result<Self>;

    /// Emit this instance through the field cursor.
    fn write(&self, w: &mut FieldWriter<'_>) -> Result<()>;
}

static VEC3_FIELDS: &[Field] = &[
    Field::plain("x", Codec::Float32),
    Field::plain("y", Codec::Float32),
    Field::plain("z", Codec::Float32),
];
static VEC3_DEF: StructDef = StructDef::new("Vec3", VEC3_FIELDS);

impl Record for Vec3 {
    fn def() -> &'static StructDef {
        &VEC3_DEF
    }

    fn read(r: &mut FieldReader<'_, '_>) -> Result<Self> {
        Ok(Vec3::new(r.f32()?, r.f32()?, r.f32()?))
    }

    fn write(&self, w: &mut FieldWriter<'_>) -> Result<()> {
        w.f32(self.x)?;
        w.f32(self.y)?;
        w.f32(self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static MIXED_FIELDS: &[Field] = &[
        Field::plain("kind", Codec::UInt8),
        Field::plain("payload", Codec::List(&Codec::UInt8)),
        Field::plain("weight", Codec::Float32),
    ];
    static MIXED_DEF: StructDef = StructDef::new("Mixed", MIXED_FIELDS);

    #[test]
    fn test_alignment_is_max_of_members() {
        // The pointer-list field forces 8-byte alignment.
        assert_eq!(MIXED_DEF.alignment(), 8);
        assert_eq!(VEC3_DEF.alignment(), 4);
    }

    #[test]
    fn test_fixed_size_includes_padding() {
        // kind at 0, 7 bytes of padding, 16-byte record at 8, weight at 24.
        assert_eq!(MIXED_DEF.fixed_size(), 28);
        assert_eq!(VEC3_DEF.fixed_size(), 12);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 4), 12);
    }

    #[test]
    fn test_name_hash_matches_crc() {
        assert_eq!(MIXED_DEF.name_hash(), perun_common::crc::hash_str("Mixed"));
    }
}
