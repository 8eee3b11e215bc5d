//! The closed set of wire codecs.
//!
//! Every field of a structure definition is tagged with one [`Codec`]. The
//! engine dispatches on the variant; there is no runtime capability probing.
//! Variable-length content (strings, arrays, tree children) always goes
//! through [`Codec::List`], which stores a 16-byte pointer record in place
//! and defers the payload (see the `write` module).

use std::fmt;

use glam::{Quat, Vec3};
use perun_common::BinaryReader;

use crate::compact;
use crate::def::{Record, StructDef};
use crate::read::read_struct;
use crate::write::{write_struct, WriteCursor};
use crate::Result;

/// Size of a pointer-list record on the wire: i64 offset + u32 count + u32 tag.
pub const LIST_RECORD_SIZE: usize = 16;

/// Alignment of pointer-list records (driven by the 8-byte relative offset).
pub const LIST_ALIGNMENT: u32 = 8;

/// Alignment never needs checking past this bound.
pub const ALIGNMENT_CAP: u32 = 16;

/// Default format tag emitted in pointer-list records.
///
/// The engine treats tags as opaque: they are written as declared and never
/// interpreted on read.
pub const DEFAULT_LIST_TAG: u32 = 0x01FEFEFE;

/// A wire codec: how one field (or list element) is laid out in bytes.
#[derive(Clone, Copy)]
pub enum Codec {
    /// One byte, non-zero = true.
    Bool,
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Signed 16-bit integer, little-endian.
    Int16,
    /// Unsigned 16-bit integer, little-endian.
    UInt16,
    /// Signed 32-bit integer, little-endian.
    Int32,
    /// Unsigned 32-bit integer, little-endian.
    UInt32,
    /// Signed 64-bit integer, little-endian.
    Int64,
    /// Unsigned 64-bit integer, little-endian.
    UInt64,
    /// 32-bit IEEE float, little-endian.
    Float32,
    /// 64-bit IEEE float, little-endian.
    Float64,
    /// IEEE binary16 half-precision float.
    Half,
    /// Packed normal vector: three signed 10-bit fields plus a 2-bit tag.
    Normal,
    /// 6-byte drop-largest-component compressed quaternion.
    Quat48,
    /// One text byte. Fixed-length text is a `Char` field with a repeat
    /// length; variable text is `List(&Codec::Char)`.
    Char,
    /// A nested structure, inlined at the field position. The function
    /// indirection lets self-referential definitions live in statics.
    Struct(fn() -> &'static StructDef),
    /// A pointer-list of the given element codec. Only the 16-byte record
    /// appears inline; the payload is deferred.
    List(&'static Codec),
}

impl Codec {
    /// Required alignment of this codec, in bytes.
    pub fn alignment(&self) -> u32 {
        match self {
            Codec::Bool | Codec::Int8 | Codec::UInt8 | Codec::Char => 1,
            Codec::Int16 | Codec::UInt16 | Codec::Half | Codec::Quat48 => 2,
            Codec::Int32 | Codec::UInt32 | Codec::Float32 | Codec::Normal => 4,
            Codec::Int64 | Codec::UInt64 | Codec::Float64 => 8,
            Codec::List(_) => LIST_ALIGNMENT,
            Codec::Struct(def) => def().alignment(),
        }
    }

    /// Size in bytes of one element of this codec at its field position.
    ///
    /// For `List` this is the 16-byte pointer record, not the payload.
    pub fn inline_size(&self) -> usize {
        match self {
            Codec::Bool | Codec::Int8 | Codec::UInt8 | Codec::Char => 1,
            Codec::Int16 | Codec::UInt16 | Codec::Half => 2,
            Codec::Int32 | Codec::UInt32 | Codec::Float32 | Codec::Normal => 4,
            Codec::Int64 | Codec::UInt64 | Codec::Float64 => 8,
            Codec::Quat48 => 6,
            Codec::List(_) => LIST_RECORD_SIZE,
            Codec::Struct(def) => def().fixed_size(),
        }
    }

    /// Structural equality. `Struct` codecs compare by definition name,
    /// `List` codecs recurse into the element.
    pub fn matches(&self, other: &Codec) -> bool {
        match (self, other) {
            (Codec::Struct(a), Codec::Struct(b)) => a().name == b().name,
            (Codec::List(a), Codec::List(b)) => a.matches(b),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Bool => f.write_str("Bool"),
            Codec::Int8 => f.write_str("Int8"),
            Codec::UInt8 => f.write_str("UInt8"),
            Codec::Int16 => f.write_str("Int16"),
            Codec::UInt16 => f.write_str("UInt16"),
            Codec::Int32 => f.write_str("Int32"),
            Codec::UInt32 => f.write_str("UInt32"),
            Codec::Int64 => f.write_str("Int64"),
            Codec::UInt64 => f.write_str("UInt64"),
            Codec::Float32 => f.write_str("Float32"),
            Codec::Float64 => f.write_str("Float64"),
            Codec::Half => f.write_str("Half"),
            Codec::Normal => f.write_str("Normal"),
            Codec::Quat48 => f.write_str("Quat48"),
            Codec::Char => f.write_str("Char"),
            Codec::Struct(def) => write!(f, "Struct({})", def().name),
            Codec::List(elem) => write!(f, "List({:?})", elem),
        }
    }
}

/// A type that can appear as a pointer-list element or fixed-array element.
///
/// The set is closed: primitives, compact-codec value types, and every
/// [`Record`] implementor. Alignment is handled by the caller (the list and
/// array machinery pads before each element).
pub trait Element: Clone + 'static {
    /// The wire codec of one element.
    fn codec() -> Codec;

    /// Decode one element at the current cursor position.
    fn decode(r: &mut BinaryReader<'_>) -> Result<Self>;

    /// Encode one element at the current end of the buffer.
    fn encode(&self, w: &mut WriteCursor) -> Result<()>;
}

macro_rules! primitive_element {
    ($($ty:ty => $variant:ident, $read:ident, $put:ident);* $(;)?) => {$(
        impl Element for $ty {
            fn codec() -> Codec {
                Codec::$variant
            }

            fn decode(r: &mut BinaryReader<'_>) -> Result<Self> {
                Ok(r.$read()?)
            }

            fn encode(&self, w: &mut WriteCursor) -> Result<()> {
                w.buf.$put(*self);
                Ok(())
            }
        }
    )*};
}

primitive_element! {
    bool => Bool, read_bool, put_bool;
    i8 => Int8, read_i8, put_i8;
    u8 => UInt8, read_u8, put_u8;
    i16 => Int16, read_i16, put_i16;
    u16 => UInt16, read_u16, put_u16;
    i32 => Int32, read_i32, put_i32;
    u32 => UInt32, read_u32, put_u32;
    i64 => Int64, read_i64, put_i64;
    u64 => UInt64, read_u64, put_u64;
    f32 => Float32, read_f32, put_f32;
    f64 => Float64, read_f64, put_f64;
}

impl Element for Quat {
    fn codec() -> Codec {
        Codec::Quat48
    }

    fn decode(r: &mut BinaryReader<'_>) -> Result<Self> {
        let words = [r.read_u16()?, r.read_u16()?, r.read_u16()?];
        Ok(compact::unpack_quat(words))
    }

    fn encode(&self, w: &mut WriteCursor) -> Result<()> {
        for word in compact::pack_quat(*self) {
            w.buf.put_u16(word);
        }
        Ok(())
    }
}

impl Element for Vec3 {
    fn codec() -> Codec {
        Codec::Struct(<Vec3 as Record>::def)
    }

    fn decode(r: &mut BinaryReader<'_>) -> Result<Self> {
        read_struct(r)
    }

    fn encode(&self, w: &mut WriteCursor) -> Result<()> {
        write_struct(w, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_alignments() {
        assert_eq!(Codec::UInt8.alignment(), 1);
        assert_eq!(Codec::Half.alignment(), 2);
        assert_eq!(Codec::Float32.alignment(), 4);
        assert_eq!(Codec::UInt64.alignment(), 8);
        assert_eq!(Codec::Quat48.alignment(), 2);
        assert_eq!(Codec::List(&Codec::UInt8).alignment(), 8);
    }

    #[test]
    fn test_inline_sizes() {
        assert_eq!(Codec::Quat48.inline_size(), 6);
        assert_eq!(Codec::Normal.inline_size(), 4);
        assert_eq!(Codec::List(&Codec::Float64).inline_size(), LIST_RECORD_SIZE);
    }

    #[test]
    fn test_matches_recurses_into_lists() {
        assert!(Codec::List(&Codec::UInt16).matches(&Codec::List(&Codec::UInt16)));
        assert!(!Codec::List(&Codec::UInt16).matches(&Codec::List(&Codec::UInt32)));
        assert!(!Codec::UInt16.matches(&Codec::Int16));
    }
}
