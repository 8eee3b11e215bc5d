//! The container envelope.
//!
//! Every structure instance written directly to a file is preceded by a
//! fixed header: magic, version numbers, the structure-name hash, and (for
//! asset records) a content identifier. The header is 0x20 bytes for inline
//! records and 0x60 bytes for asset records. The structure body follows
//! immediately; all body-internal offsets are record-relative, so the body
//! is built first and concatenated after the header.

use perun_common::{AssetId, BinaryReader, ByteWriter};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::catalog::Catalog;
use crate::def::Record;
use crate::read::read_root;
use crate::write::write_root;
use crate::{Error, Result};

/// Container signature. The PNG-style mix of high-bit, text, and line-ending
/// bytes catches transfer corruption early.
pub const MAGIC: [u8; 8] = [0x89, b'P', b'M', b'D', 0x0D, 0x0A, 0x1A, 0x0A];

/// Newest container format version this implementation understands.
pub const FORMAT_VERSION: u16 = 3;

/// Header size of an [`RecordKind::Inline`] record.
pub const INLINE_HEADER_SIZE: usize = 0x20;

/// Header size of an [`RecordKind::Asset`] record.
pub const ASSET_HEADER_SIZE: usize = 0x60;

/// The two container record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum RecordKind {
    /// Auxiliary record: 0x20-byte header, no content identifier.
    Inline = 1,
    /// Asset record: 0x60-byte header carrying an [`AssetId`].
    Asset = 2,
}

impl RecordKind {
    fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Inline),
            2 => Some(Self::Asset),
            _ => None,
        }
    }

    /// Header size of this record kind in bytes.
    pub fn header_size(self) -> usize {
        match self {
            Self::Inline => INLINE_HEADER_SIZE,
            Self::Asset => ASSET_HEADER_SIZE,
        }
    }
}

/// Raw fixed header, first 0x20 bytes of every container.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
struct RawHeader {
    magic: [u8; 8],
    format_version: u16,
    content_version: u16,
    kind: u32,
    struct_hash: u32,
    body_len: u32,
    _reserved: [u8; 8],
}

/// Raw asset tail, bytes 0x20..0x60 of an asset record.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
struct RawAssetTail {
    asset_id: AssetId,
    _reserved: [u8; 56],
}

/// Decoded container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    pub kind: RecordKind,
    pub format_version: u16,
    pub content_version: u16,
    pub struct_hash: u32,
    pub body_len: u32,
    pub asset_id: AssetId,
}

impl Envelope {
    /// Header size in bytes, per record kind.
    pub fn header_size(&self) -> usize {
        self.kind.header_size()
    }

    /// Parse an envelope at the cursor.
    pub fn parse(r: &mut BinaryReader<'_>) -> Result<Self> {
        let raw: RawHeader = r.read_struct()?;
        if raw.magic != MAGIC {
            return Err(perun_common::Error::InvalidMagic {
                expected: MAGIC.to_vec(),
                actual: raw.magic.to_vec(),
            }
            .into());
        }
        if raw.format_version > FORMAT_VERSION {
            return Err(Error::UnsupportedVersion(raw.format_version));
        }
        let kind =
            RecordKind::from_u32(raw.kind).ok_or(Error::InvalidRecordKind(raw.kind))?;
        let asset_id = match kind {
            RecordKind::Asset => r.read_struct::<RawAssetTail>()?.asset_id,
            RecordKind::Inline => AssetId::NIL,
        };

        Ok(Self {
            kind,
            format_version: raw.format_version,
            content_version: raw.content_version,
            struct_hash: raw.struct_hash,
            body_len: raw.body_len,
            asset_id,
        })
    }

    fn emit(&self, w: &mut ByteWriter) {
        w.put_bytes(&MAGIC);
        w.put_u16(self.format_version);
        w.put_u16(self.content_version);
        w.put_u32(self.kind as u32);
        w.put_u32(self.struct_hash);
        w.put_u32(self.body_len);
        w.put_zeros(8);
        if self.kind == RecordKind::Asset {
            w.put_u64(self.asset_id.raw());
            w.put_zeros(56);
        }
    }
}

/// Parse just the envelope of a container, without decoding the body.
pub fn peek_envelope(data: &[u8]) -> Result<Envelope> {
    Envelope::parse(&mut BinaryReader::new(data))
}

/// Serialize a structure with its container envelope.
pub fn write_record<T: Record>(
    value: &T,
    kind: RecordKind,
    content_version: u16,
    asset_id: AssetId,
) -> Result<Vec<u8>> {
    let body = write_root(value)?;
    let envelope = Envelope {
        kind,
        format_version: FORMAT_VERSION,
        content_version,
        struct_hash: T::def().name_hash(),
        body_len: body.len() as u32,
        asset_id,
    };

    let mut w = ByteWriter::with_capacity(kind.header_size() + body.len());
    envelope.emit(&mut w);
    w.put_bytes(&body);
    Ok(w.into_inner())
}

/// Deserialize a container into the requested structure type.
///
/// The header's structure hash must resolve in the catalog and name the same
/// definition as `T`; anything else is a fatal decode error.
pub fn read_record<T: Record>(data: &[u8], catalog: &Catalog) -> Result<(Envelope, T)> {
    let mut r = BinaryReader::new(data);
    let envelope = Envelope::parse(&mut r)?;

    let def = catalog.resolve(envelope.struct_hash)?;
    if def.name != T::def().name {
        return Err(Error::WrongStruct {
            expected: T::def().name,
            actual: def.name.to_string(),
        });
    }

    let body_start = envelope.header_size();
    let body_end = body_start + envelope.body_len as usize;
    if body_end > data.len() {
        return Err(perun_common::Error::UnexpectedEof {
            needed: body_end - body_start,
            available: data.len().saturating_sub(body_start),
        }
        .into());
    }

    let value = read_root::<T>(&data[body_start..body_end])?;
    Ok((envelope, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{Field, StructDef};
    use crate::{Codec, FieldReader, FieldWriter};

    #[derive(Debug, Clone, PartialEq)]
    struct Marker {
        value: u32,
    }

    static MARKER_FIELDS: &[Field] = &[Field::plain("value", Codec::UInt32)];
    static MARKER_DEF: StructDef = StructDef::new("Marker", MARKER_FIELDS);

    impl Record for Marker {
        fn def() -> &'static StructDef {
            &MARKER_DEF
        }

        fn read(r: &mut FieldReader<'_, '_>) -> Result<Self> {
            Ok(Self { value: r.u32()? })
        }

        fn write(&self, w: &mut FieldWriter<'_>) -> Result<()> {
            w.u32(self.value)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Other {
        value: u32,
    }

    static OTHER_FIELDS: &[Field] = &[Field::plain("value", Codec::UInt32)];
    static OTHER_DEF: StructDef = StructDef::new("Other", OTHER_FIELDS);

    impl Record for Other {
        fn def() -> &'static StructDef {
            &OTHER_DEF
        }

        fn read(r: &mut FieldReader<'_, '_>) -> Result<Self> {
            Ok(Self { value: r.u32()? })
        }

        fn write(&self, w: &mut FieldWriter<'_>) -> Result<()> {
            w.u32(self.value)
        }
    }

    #[test]
    fn test_inline_record_roundtrip() {
        let catalog = Catalog::new(&[&MARKER_DEF]);
        let bytes = write_record(&Marker { value: 7 }, RecordKind::Inline, 1, AssetId::NIL)
            .unwrap();
        assert_eq!(bytes.len(), INLINE_HEADER_SIZE + 4);

        let (envelope, back): (Envelope, Marker) = read_record(&bytes, &catalog).unwrap();
        assert_eq!(envelope.kind, RecordKind::Inline);
        assert_eq!(envelope.struct_hash, MARKER_DEF.name_hash());
        assert_eq!(back.value, 7);
    }

    #[test]
    fn test_asset_record_carries_id() {
        let catalog = Catalog::new(&[&MARKER_DEF]);
        let id = AssetId::from_raw(0xABCD_EF01_2345_6789);
        let bytes =
            write_record(&Marker { value: 1 }, RecordKind::Asset, 2, id).unwrap();
        assert_eq!(bytes.len(), ASSET_HEADER_SIZE + 4);

        let (envelope, _): (Envelope, Marker) = read_record(&bytes, &catalog).unwrap();
        assert_eq!(envelope.asset_id, id);
        assert_eq!(envelope.content_version, 2);
    }

    #[test]
    fn test_unknown_hash_is_fatal() {
        // Marker is not registered; decoding must fail, not zero-fill.
        let catalog = Catalog::new(&[&OTHER_DEF]);
        let bytes = write_record(&Marker { value: 7 }, RecordKind::Inline, 1, AssetId::NIL)
            .unwrap();
        assert!(matches!(
            read_record::<Marker>(&bytes, &catalog),
            Err(Error::UnknownStructHash { .. })
        ));
    }

    #[test]
    fn test_wrong_struct_is_fatal() {
        let catalog = Catalog::new(&[&MARKER_DEF, &OTHER_DEF]);
        let bytes = write_record(&Marker { value: 7 }, RecordKind::Inline, 1, AssetId::NIL)
            .unwrap();
        assert!(matches!(
            read_record::<Other>(&bytes, &catalog),
            Err(Error::WrongStruct { .. })
        ));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let catalog = Catalog::new(&[&MARKER_DEF]);
        let mut bytes = write_record(&Marker { value: 7 }, RecordKind::Inline, 1, AssetId::NIL)
            .unwrap();
        bytes[0] = b'X';
        assert!(read_record::<Marker>(&bytes, &catalog).is_err());
    }
}
