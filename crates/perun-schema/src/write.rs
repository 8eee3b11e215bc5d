//! Structure encoding and the deferred-write scheduler.
//!
//! Writing is a two-pass discipline. The first pass walks the structure
//! graph once, emitting every fixed-size field inline; each non-empty
//! pointer-list field leaves a 16-byte placeholder behind and registers a
//! deferred job holding the captured values. The second pass drains the job
//! queue in strict FIFO registration order, each job appending its payload
//! at the then-current end of the buffer and back-patching the placeholder's
//! offset and count. Jobs registered while draining (lists nested inside
//! payload elements) append to the same queue, so headers always precede
//! bulk data.

use std::collections::VecDeque;

use glam::{Quat, Vec4};
use perun_common::ByteWriter;

use crate::codec::{Codec, Element, LIST_ALIGNMENT};
use crate::compact;
use crate::def::{align_up, Field, Record, StructDef};
use crate::{Error, Result};

type Job = Box<dyn FnOnce(&mut WriteCursor) -> Result<()>>;

/// The encode cursor: a growing body buffer plus the deferred-job queue.
///
/// One cursor is owned exclusively by one top-level write. Positions are
/// relative to the start of the buffer, which is the start of the container
/// body.
pub struct WriteCursor {
    pub(crate) buf: ByteWriter,
    pending: VecDeque<Job>,
}

impl WriteCursor {
    fn new() -> Self {
        Self {
            buf: ByteWriter::new(),
            pending: VecDeque::new(),
        }
    }

    /// Current end-of-buffer position.
    pub fn position(&self) -> usize {
        self.buf.position()
    }

    /// Pad with zeros to the next multiple of `align` (body-relative).
    pub(crate) fn align(&mut self, align: u32) {
        let padded = align_up(self.buf.position(), align);
        self.buf.put_zeros(padded - self.buf.position());
    }

    /// Emit a pointer-list placeholder and register the payload job.
    ///
    /// An empty collection keeps its `offset 0 / count 0` placeholder
    /// permanently; nothing is registered.
    fn defer_list<T: Element>(&mut self, tag: u32, items: &[T]) -> Result<()> {
        self.align(LIST_ALIGNMENT);
        let record_pos = self.put_placeholder(tag);
        if items.is_empty() {
            return Ok(());
        }

        let items = items.to_vec();
        self.pending.push_back(Box::new(move |w: &mut WriteCursor| {
            w.align(T::codec().alignment());
            let start = w.position();
            for item in &items {
                w.align(T::codec().alignment());
                item.encode(w)?;
            }
            w.patch_record(record_pos, start, items.len())
        }));
        Ok(())
    }

    /// Emit a string placeholder and register its byte payload.
    fn defer_string(&mut self, tag: u32, value: &str) -> Result<()> {
        self.align(LIST_ALIGNMENT);
        let record_pos = self.put_placeholder(tag);
        if value.is_empty() {
            return Ok(());
        }

        let bytes = value.as_bytes().to_vec();
        self.pending.push_back(Box::new(move |w: &mut WriteCursor| {
            let start = w.position();
            w.buf.put_bytes(&bytes);
            w.patch_record(record_pos, start, bytes.len())
        }));
        Ok(())
    }

    /// Write the 16-byte placeholder record, returning its position.
    fn put_placeholder(&mut self, tag: u32) -> usize {
        let record_pos = self.buf.position();
        self.buf.put_i64(0);
        self.buf.put_u32(0);
        self.buf.put_u32(tag);
        record_pos
    }

    /// Back-patch a placeholder with the resolved offset and count.
    fn patch_record(&mut self, record_pos: usize, start: usize, count: usize) -> Result<()> {
        self.buf.patch_i64(record_pos, (start - record_pos) as i64)?;
        self.buf.patch_u32(record_pos + 8, count as u32)?;
        Ok(())
    }

    /// Drain the job queue in registration order.
    fn flush(&mut self) -> Result<()> {
        while let Some(job) = self.pending.pop_front() {
            job(self)?;
        }
        Ok(())
    }
}

/// Encode a structure at the current end of the cursor.
pub fn write_struct<T: Record>(w: &mut WriteCursor, value: &T) -> Result<()> {
    w.align(T::def().alignment());
    let mut fields = FieldWriter::new(w, T::def());
    value.write(&mut fields)?;
    fields.finish()
}

/// Encode a top-level structure into a container body buffer.
///
/// Walks the structure graph once, then flushes every deferred payload.
pub fn write_root<T: Record>(value: &T) -> Result<Vec<u8>> {
    let mut w = WriteCursor::new();
    write_struct(&mut w, value)?;
    w.flush()?;
    Ok(w.buf.into_inner())
}

/// Field cursor for encoding one structure.
///
/// Mirror of `FieldReader`: consumes the field table in declared order and
/// verifies the declared codec before every write.
pub struct FieldWriter<'a> {
    w: &'a mut WriteCursor,
    def: &'static StructDef,
    index: usize,
}

macro_rules! write_field_primitive {
    ($($name:ident: $ty:ty => $variant:ident, $put:ident);* $(;)?) => {$(
        #[doc = concat!("Write a `", stringify!($variant), "` field.")]
        pub fn $name(&mut self, value: $ty) -> Result<()> {
            let field = self.next_field()?;
            match field.codec {
                Codec::$variant => {
                    self.w.buf.$put(value);
                    Ok(())
                }
                _ => Err(self.mismatch(field, stringify!($ty))),
            }
        }
    )*};
}

impl<'a> FieldWriter<'a> {
    fn new(w: &'a mut WriteCursor, def: &'static StructDef) -> Self {
        Self { w, def, index: 0 }
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
        self.w.align(field.codec.alignment());
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

    write_field_primitive! {
        bool: bool => Bool, put_bool;
        i8: i8 => Int8, put_i8;
        u8: u8 => UInt8, put_u8;
        i16: i16 => Int16, put_i16;
        u16: u16 => UInt16, put_u16;
        i32: i32 => Int32, put_i32;
        u32: u32 => UInt32, put_u32;
        i64: i64 => Int64, put_i64;
        u64: u64 => UInt64, put_u64;
        f32: f32 => Float32, put_f32;
        f64: f64 => Float64, put_f64;
    }

    /// Write a half-precision float field.
    pub fn half(&mut self, value: f32) -> Result<()> {
        let field = self.next_field()?;
        match field.codec {
            Codec::Half => {
                self.w.buf.put_u16(compact::pack_half(value));
                Ok(())
            }
            _ => Err(self.mismatch(field, "half")),
        }
    }

    /// Write a packed-normal field.
    pub fn normal(&mut self, value: Vec4) -> Result<()> {
        let field = self.next_field()?;
        match field.codec {
            Codec::Normal => {
                self.w.buf.put_u32(compact::pack_normal(value));
                Ok(())
            }
            _ => Err(self.mismatch(field, "normal")),
        }
    }

    /// Write a compressed-quaternion field.
    pub fn quat48(&mut self, value: Quat) -> Result<()> {
        let field = self.next_field()?;
        match field.codec {
            Codec::Quat48 => {
                for word in compact::pack_quat(value) {
                    self.w.buf.put_u16(word);
                }
                Ok(())
            }
            _ => Err(self.mismatch(field, "quat48")),
        }
    }

    /// Write a fixed-length text field, padding with zeros.
    pub fn chars(&mut self, value: &str) -> Result<()> {
        let field = self.next_field()?;
        let len = match (field.codec, field.len) {
            (Codec::Char, Some(len)) => len,
            _ => return Err(self.mismatch(field, "chars")),
        };
        let bytes = value.as_bytes();
        if bytes.len() > len {
            return Err(Error::StringTooLong {
                field: field.name,
                len: bytes.len(),
                max: len,
            });
        }
        self.w.buf.put_bytes(bytes);
        self.w.buf.put_zeros(len - bytes.len());
        Ok(())
    }

    /// Write a fixed array field; `values` must match the declared length.
    pub fn array<T: Element>(&mut self, values: &[T]) -> Result<()> {
        let field = self.next_field()?;
        if !field.codec.matches(&T::codec()) {
            return Err(self.mismatch(field, "fixed array"));
        }
        if field.len != Some(values.len()) {
            return Err(Error::LengthMismatch {
                structure: self.def.name,
                field: field.name,
                declared: field.len.unwrap_or(0),
                actual: values.len(),
            });
        }
        for value in values {
            self.w.align(T::codec().alignment());
            value.encode(self.w)?;
        }
        Ok(())
    }

    /// Write a nested structure field, inlined at this position.
    pub fn nested<T: Record>(&mut self, value: &T) -> Result<()> {
        let field = self.next_field()?;
        match field.codec {
            Codec::Struct(def) if def().name == T::def().name => write_struct(self.w, value),
            _ => Err(self.mismatch(field, T::def().name)),
        }
    }

    /// Write a pointer-list field, deferring its payload.
    pub fn list<T: Element>(&mut self, items: &[T]) -> Result<()> {
        let field = self.next_field()?;
        match field.codec {
            Codec::List(elem) if elem.matches(&T::codec()) => {
                self.w.defer_list(field.tag, items)
            }
            _ => Err(self.mismatch(field, "list")),
        }
    }

    /// Write a variable-length string field, deferring its bytes.
    pub fn string(&mut self, value: &str) -> Result<()> {
        let field = self.next_field()?;
        match field.codec {
            Codec::List(Codec::Char) => self.w.defer_string(field.tag, value),
            _ => Err(self.mismatch(field, "string")),
        }
    }

    /// Verify every declared field was written.
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
    use crate::def::Field;
    use crate::read::read_root;
    use crate::{FieldReader, StructDef};

    #[derive(Debug, Clone, PartialEq)]
    struct Sibling {
        kind: u8,
        first: Vec<u32>,
        second: Vec<u16>,
    }

    static SIBLING_FIELDS: &[Field] = &[
        Field::plain("kind", Codec::UInt8),
        Field::plain("first", Codec::List(&Codec::UInt32)),
        Field::tagged("second", Codec::List(&Codec::UInt16), 0xAAAA_AA01),
    ];
    static SIBLING_DEF: StructDef = StructDef::new("Sibling", SIBLING_FIELDS);

    impl Record for Sibling {
        fn def() -> &'static StructDef {
            &SIBLING_DEF
        }

        fn read(r: &mut FieldReader<'_, '_>) -> Result<Self> {
            Ok(Self {
                kind: r.u8()?,
                first: r.list()?,
                second: r.list()?,
            })
        }

        fn write(&self, w: &mut FieldWriter<'_>) -> Result<()> {
            w.u8(self.kind)?;
            w.list(&self.first)?;
            w.list(&self.second)
        }
    }

    #[test]
    fn test_padding_before_aligned_field() {
        let value = Sibling {
            kind: 3,
            first: vec![],
            second: vec![],
        };
        let bytes = write_root(&value).unwrap();

        // kind at 0, then 7 bytes of padding, then two 16-byte records.
        assert_eq!(bytes.len(), 40);
        assert_eq!(bytes[0], 3);
        assert_eq!(&bytes[1..8], &[0u8; 7]);
    }

    #[test]
    fn test_empty_list_placeholder_stays_zero() {
        let value = Sibling {
            kind: 0,
            first: vec![],
            second: vec![],
        };
        let bytes = write_root(&value).unwrap();

        assert_eq!(&bytes[8..16], &0i64.to_le_bytes());
        assert_eq!(&bytes[16..20], &0u32.to_le_bytes());
        // The declared tag is still written for empty lists.
        assert_eq!(&bytes[20..24], &0x01FE_FEFEu32.to_le_bytes());
        assert_eq!(&bytes[36..40], &0xAAAA_AA01u32.to_le_bytes());
    }

    #[test]
    fn test_deferred_payloads_flush_in_declaration_order() {
        let value = Sibling {
            kind: 1,
            first: vec![10, 20],
            second: vec![7],
        };
        let bytes = write_root(&value).unwrap();

        // Records at 8 and 24; payloads follow all header bytes.
        let first_offset = i64::from_le_bytes(bytes[8..16].try_into().unwrap());
        let second_offset = i64::from_le_bytes(bytes[24..32].try_into().unwrap());
        let first_payload = 8 + first_offset as usize;
        let second_payload = 24 + second_offset as usize;

        assert_eq!(first_payload, 40);
        assert!(second_payload > first_payload);
        assert_eq!(&bytes[40..44], &10u32.to_le_bytes());
        assert_eq!(&bytes[44..48], &20u32.to_le_bytes());
        assert_eq!(
            u32::from_le_bytes(bytes[16..20].try_into().unwrap()),
            2
        );
    }

    #[test]
    fn test_roundtrip() {
        let value = Sibling {
            kind: 9,
            first: vec![1, 2, 3],
            second: vec![100, 200],
        };
        let bytes = write_root(&value).unwrap();
        let back: Sibling = read_root(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_field_underrun_is_fatal() {
        #[derive(Debug, Clone)]
        struct Lazy;

        static LAZY_FIELDS: &[Field] = &[Field::plain("kind", Codec::UInt8)];
        static LAZY_DEF: StructDef = StructDef::new("Lazy", LAZY_FIELDS);

        impl Record for Lazy {
            fn def() -> &'static StructDef {
                &LAZY_DEF
            }

            fn read(_r: &mut FieldReader<'_, '_>) -> Result<Self> {
                Ok(Self)
            }

            fn write(&self, _w: &mut FieldWriter<'_>) -> Result<()> {
                Ok(())
            }
        }

        assert!(matches!(
            write_root(&Lazy),
            Err(Error::FieldUnderrun { .. })
        ));
    }

    #[test]
    fn test_codec_mismatch_is_fatal() {
        #[derive(Debug, Clone)]
        struct Wrong(u16);

        static WRONG_FIELDS: &[Field] = &[Field::plain("value", Codec::UInt32)];
        static WRONG_DEF: StructDef = StructDef::new("Wrong", WRONG_FIELDS);

        impl Record for Wrong {
            fn def() -> &'static StructDef {
                &WRONG_DEF
            }

            fn read(r: &mut FieldReader<'_, '_>) -> Result<Self> {
                Ok(Self(r.u16()?))
            }

            fn write(&self, w: &mut FieldWriter<'_>) -> Result<()> {
                w.u16(self.0)
            }
        }

        assert!(matches!(
            write_root(&Wrong(5)),
            Err(Error::CodecMismatch { .. })
        ));
    }
}
