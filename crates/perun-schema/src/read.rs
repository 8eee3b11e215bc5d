//! Structure decoding.
//!
//! Decoding walks the declared field table in order: pad to the field's
//! alignment, then decode with the field's codec. Pointer-list fields read
//! their 16-byte record, jump to `record start + relative offset`, decode
//! `count` elements, and restore the cursor - so sibling fields keep reading
//! as if the list were a fixed 16-byte value. All positions are relative to
//! the start of the container body, which is the start of the cursor's slice.

use glam::{Quat, Vec4};
use perun_common::{memchr, BinaryReader};

use crate::codec::{Codec, Element, LIST_ALIGNMENT};
use crate::compact;
use crate::def::{align_up, Field, Record, StructDef};
use crate::{Error, Result};

/// Skip forward to the next multiple of `align` (body-relative).
#[inline]
pub(crate) fn align_reader(r: &mut BinaryReader<'_>, align: u32) {
    let aligned = align_up(r.position(), align);
    r.seek(aligned);
}

/// Decode a structure at the cursor, padding to its alignment first.
pub fn read_struct<T: Record>(r: &mut BinaryReader<'_>) -> Result<T> {
    align_reader(r, T::def().alignment());
    let mut fields = FieldReader::new(r, T::def());
    let value = T::read(&mut fields)?;
    fields.finish()?;
    Ok(value)
}

/// Decode a top-level structure from a container body slice.
pub fn read_root<T: Record>(body: &[u8]) -> Result<T> {
    let mut r = BinaryReader::new(body);
    read_struct(&mut r)
}

/// Decode a pointer-list record at the cursor and its payload elsewhere.
///
/// A zero count means an empty sequence; position 0 is never dereferenced.
pub(crate) fn read_list<T: Element>(r: &mut BinaryReader<'_>) -> Result<Vec<T>> {
    align_reader(r, LIST_ALIGNMENT);
    let (target, count) = read_list_record(r)?;
    let Some(target) = target else {
        return Ok(Vec::new());
    };

    let resume = r.position();
    r.seek(target);
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        align_reader(r, T::codec().alignment());
        items.push(T::decode(r)?);
    }
    r.seek(resume);
    Ok(items)
}

/// Read the 16-byte record and resolve its payload position.
///
/// Returns `None` for an empty list. The format tag is read and discarded -
/// it is opaque by contract.
fn read_list_record(r: &mut BinaryReader<'_>) -> Result<(Option<usize>, usize)> {
    let record_pos = r.position();
    let offset = r.read_i64()?;
    let count = r.read_u32()? as usize;
    let _tag = r.read_u32()?;

    if count == 0 {
        return Ok((None, 0));
    }

    let target = (record_pos as i64).checked_add(offset);
    let Some(target) = target.filter(|&t| t >= 0 && (t as usize) < r.len()) else {
        return Err(Error::OffsetOutOfRange {
            position: record_pos,
            offset,
            len: r.len(),
        });
    };
    let target = target as usize;
    // Every element occupies at least one byte; reject counts that cannot fit.
    if count > r.len() - target {
        return Err(Error::TruncatedPayload {
            count: count as u32,
            available: r.len() - target,
        });
    }
    Ok((Some(target), count))
}

/// Field cursor for decoding one structure.
///
/// Consumes the definition's field table in declared order; every accessor
/// verifies the declared codec before reading.
pub struct FieldReader<'a, 'd> {
    r: &'a mut BinaryReader<'d>,
    def: &'static StructDef,
    index: usize,
}

macro_rules! read_field_primitive {
    ($($name:ident: $ty:ty => $variant:ident, $read:ident);* $(;)?) => {$(
        #[doc = concat!("Read a `", stringify!($variant), "` field.")]
        pub fn $name(&mut self) -> Result<$ty> {
            let field = self.next_field()?;
            match field.codec {
                Codec::$variant => Ok(self.r.$read()?),
                _ => Err(self.mismatch(field, stringify!($ty))),
            }
        }
    )*};
}

impl<'a, 'd> FieldReader<'a, 'd> {
    fn new(r: &'a mut BinaryReader<'d>, def: &'static StructDef) -> Self {
        Self { r, def, index: 0 }
    }

    /// Fetch the next declared field and pad to its alignment.
    fn next_field(&mut self) -> Result<&'static Field> {
        let field = self
            .def
            .fields
            .get(self.index)
            .ok_or(Error::FieldOverrun {
                structure: self.def.name,
            })?;
        self.index += 1;
        align_reader(self.r, field.codec.alignment());
        Ok(field)
    }

    fn mismatch(&self, field: &'static Field, accessed: &'static str) -> Error {
        Error::CodecMismatch {
            structure: self.def.name,
            field: field.name,
            declared: format!("{:?}", field.codec),
            accessed,
        }
    }

    read_field_primitive! {
        bool: bool => Bool, read_bool;
        i8: i8 => Int8, read_i8;
        u8: u8 => UInt8, read_u8;
        i16: i16 => Int16, read_i16;
        u16: u16 => UInt16, read_u16;
        i32: i32 => Int32, read_i32;
        u32: u32 => UInt32, read_u32;
        i64: i64 => Int64, read_i64;
        u64: u64 => UInt64, read_u64;
        f32: f32 => Float32, read_f32;
        f64: f64 => Float64, read_f64;
    }

    /// Read a half-precision float field as `f32`.
    pub fn half(&mut self) -> Result<f32> {
        let field = self.next_field()?;
        match field.codec {
            Codec::Half => Ok(compact::unpack_half(self.r.read_u16()?)),
            _ => Err(self.mismatch(field, "half")),
        }
    }

    /// Read a packed-normal field.
    pub fn normal(&mut self) -> Result<Vec4> {
        let field = self.next_field()?;
        match field.codec {
            Codec::Normal => Ok(compact::unpack_normal(self.r.read_u32()?)),
            _ => Err(self.mismatch(field, "normal")),
        }
    }

    /// Read a compressed-quaternion field.
    pub fn quat48(&mut self) -> Result<Quat> {
        let field = self.next_field()?;
        match field.codec {
            Codec::Quat48 => {
                let words = [self.r.read_u16()?, self.r.read_u16()?, self.r.read_u16()?];
                Ok(compact::unpack_quat(words))
            }
            _ => Err(self.mismatch(field, "quat48")),
        }
    }

    /// Read a fixed-length text field, trimming at the first null.
    pub fn chars(&mut self) -> Result<String> {
        let field = self.next_field()?;
        let len = match (field.codec, field.len) {
            (Codec::Char, Some(len)) => len,
            _ => return Err(self.mismatch(field, "chars")),
        };
        let bytes = self.r.read_bytes(len)?;
        let end = memchr::memchr(0, bytes).unwrap_or(len);
        let text = std::str::from_utf8(&bytes[..end]).map_err(perun_common::Error::Utf8)?;
        Ok(text.to_string())
    }

    /// Read a fixed array of `N` elements.
    pub fn array<T: Element, const N: usize>(&mut self) -> Result<[T; N]> {
        let field = self.next_field()?;
        if !field.codec.matches(&T::codec()) || field.len != Some(N) {
            return Err(self.mismatch(field, "fixed array"));
        }
        let mut items = Vec::with_capacity(N);
        for _ in 0..N {
            align_reader(self.r, T::codec().alignment());
            items.push(T::decode(self.r)?);
        }
        items.try_into().map_err(|_| Error::LengthMismatch {
            structure: self.def.name,
            field: field.name,
            declared: N,
            actual: N,
        })
    }

    /// Read a nested structure field, inlined at this position.
    pub fn nested<T: Record>(&mut self) -> Result<T> {
        let field = self.next_field()?;
        match field.codec {
            Codec::Struct(def) if def().name == T::def().name => read_struct(self.r),
            _ => Err(self.mismatch(field, T::def().name)),
        }
    }

    /// Read a pointer-list field into a vector.
    pub fn list<T: Element>(&mut self) -> Result<Vec<T>> {
        let field = self.next_field()?;
        match field.codec {
            Codec::List(elem) if elem.matches(&T::codec()) => read_list(self.r),
            _ => Err(self.mismatch(field, "list")),
        }
    }

    /// Read a variable-length string field (pointer-list of text bytes).
    pub fn string(&mut self) -> Result<String> {
        let field = self.next_field()?;
        match field.codec {
            Codec::List(Codec::Char) => {}
            _ => return Err(self.mismatch(field, "string")),
        }

        let (target, count) = read_list_record(self.r)?;
        let Some(target) = target else {
            return Ok(String::new());
        };
        let resume = self.r.position();
        self.r.seek(target);
        let bytes = self.r.read_bytes(count)?;
        let text = std::str::from_utf8(bytes).map_err(perun_common::Error::Utf8)?;
        let text = text.to_string();
        self.r.seek(resume);
        Ok(text)
    }

    /// Verify every declared field was consumed.
    fn finish(self) -> Result<()> {
        if self.index < self.def.fields.len() {
            return Err(Error::FieldUnderrun {
                structure: self.def.name,
                declared: self.def.fields.len(),
                used: self.index,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_never_dereferences() {
        // offset 0, count 0, arbitrary tag: empty, no jump to position 0.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0i64.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0xAAAA_AA01u32.to_le_bytes());

        let mut r = BinaryReader::new(&bytes);
        let items: Vec<u32> = read_list(&mut r).unwrap();
        assert!(items.is_empty());
        assert_eq!(r.position(), 16);
    }

    #[test]
    fn test_list_payload_after_record() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&16i64.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&0x01FE_FEFEu32.to_le_bytes());
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&9u32.to_le_bytes());

        let mut r = BinaryReader::new(&bytes);
        let items: Vec<u32> = read_list(&mut r).unwrap();
        assert_eq!(items, vec![7, 9]);
        // Cursor restored to just past the 16-byte record.
        assert_eq!(r.position(), 16);
    }

    #[test]
    fn test_list_offset_out_of_range() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1024i64.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let mut r = BinaryReader::new(&bytes);
        assert!(matches!(
            read_list::<u32>(&mut r),
            Err(Error::OffsetOutOfRange { .. })
        ));
    }

    #[test]
    fn test_list_count_too_large_for_buffer() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&16i64.to_le_bytes());
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);

        let mut r = BinaryReader::new(&bytes);
        assert!(matches!(
            read_list::<u8>(&mut r),
            Err(Error::TruncatedPayload { .. })
        ));
    }
}
