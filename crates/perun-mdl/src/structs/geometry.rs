//! Geometry stream structures.
//!
//! Two historical layout generations exist on disk. [`GeometryStream`] is the
//! current split position/attribute shape produced by the packer;
//! [`GeometryStreamV1`] is the older fixed small-vertex layout, kept as its
//! own registered definition so old files stay readable. The two are distinct
//! types on purpose - guessing one canonical shape loses files.

use glam::Vec3;
use perun_common::BinaryReader;
use perun_schema::{
    read_struct, write_struct, Codec, Element, Field, FieldReader, FieldWriter, Record, Result,
    StructDef, WriteCursor,
};

/// One attribute slot of the interleaved vertex layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutEntry {
    /// Attribute semantic code (see `pack::VertexAttribute`).
    pub semantic: u32,
    /// Wire format code of the attribute's bytes.
    pub format: u32,
    /// Byte offset within one vertex.
    pub offset: u32,
}

static LAYOUT_ENTRY_FIELDS: &[Field] = &[
    Field::plain("semantic", Codec::UInt32),
    Field::plain("format", Codec::UInt32),
    Field::plain("offset", Codec::UInt32),
];
static LAYOUT_ENTRY_DEF: StructDef = StructDef::new("LayoutEntry", LAYOUT_ENTRY_FIELDS);

impl Record for LayoutEntry {
    fn def() -> &'static StructDef {
        &LAYOUT_ENTRY_DEF
    }

    fn read(r: &mut FieldReader<'_, '_>) -> Result<Self> {
        Ok(Self {
            semantic: r.u32()?,
            format: r.u32()?,
            offset: r.u32()?,
        })
    }

    fn write(&self, w: &mut FieldWriter<'_>) -> Result<()> {
        w.u32(self.semantic)?;
        w.u32(self.format)?;
        w.u32(self.offset)
    }
}

impl Element for LayoutEntry {
    fn codec() -> Codec {
        Codec::Struct(Self::def)
    }

    fn decode(r: &mut BinaryReader<'_>) -> Result<Self> {
        read_struct(r)
    }

    fn encode(&self, w: &mut WriteCursor) -> Result<()> {
        write_struct(w, self)
    }
}

/// One mesh of a packed geometry batch.
///
/// Built once by the packer and never mutated afterwards: the hull and index
/// ranges address shared arrays owned by the enclosing [`GeometryStream`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshChunk {
    pub id: String,
    /// Interleaved vertex block, laid out per the stream's layout entries.
    pub vertex_data: Vec<u8>,
    /// Position-only block (3 x f32 per vertex), for depth-only passes.
    pub position_data: Vec<u8>,
    /// CRC32C over the vertex block, continued over this mesh's index bytes.
    pub content_hash: u32,
    pub vertex_count: u32,
    pub index_count: u32,
    /// Byte offset of this mesh's first index in the shared index buffer.
    pub index_offset: u32,
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
    /// Range of this mesh's vertices in the shared hull-vertex array.
    pub hull_start: u32,
    pub hull_end: u32,
}

static MESH_CHUNK_FIELDS: &[Field] = &[
    Field::plain("id", Codec::List(&Codec::Char)),
    Field::plain("vertex_data", Codec::List(&Codec::UInt8)),
    Field::plain("position_data", Codec::List(&Codec::UInt8)),
    Field::plain("content_hash", Codec::UInt32),
    Field::plain("vertex_count", Codec::UInt32),
    Field::plain("index_count", Codec::UInt32),
    Field::plain("index_offset", Codec::UInt32),
    Field::plain("bounds_min", Codec::Struct(<Vec3 as Record>::def)),
    Field::plain("bounds_max", Codec::Struct(<Vec3 as Record>::def)),
    Field::plain("hull_start", Codec::UInt32),
    Field::plain("hull_end", Codec::UInt32),
];
static MESH_CHUNK_DEF: StructDef = StructDef::new("MeshChunk", MESH_CHUNK_FIELDS);

impl Record for MeshChunk {
    fn def() -> &'static StructDef {
        &MESH_CHUNK_DEF
    }

    fn read(r: &mut FieldReader<'_, '_>) -> Result<Self> {
        Ok(Self {
            id: r.string()?,
            vertex_data: r.list()?,
            position_data: r.list()?,
            content_hash: r.u32()?,
            vertex_count: r.u32()?,
            index_count: r.u32()?,
            index_offset: r.u32()?,
            bounds_min: r.nested()?,
            bounds_max: r.nested()?,
            hull_start: r.u32()?,
            hull_end: r.u32()?,
        })
    }

    fn write(&self, w: &mut FieldWriter<'_>) -> Result<()> {
        w.string(&self.id)?;
        w.list(&self.vertex_data)?;
        w.list(&self.position_data)?;
        w.u32(self.content_hash)?;
        w.u32(self.vertex_count)?;
        w.u32(self.index_count)?;
        w.u32(self.index_offset)?;
        w.nested(&self.bounds_min)?;
        w.nested(&self.bounds_max)?;
        w.u32(self.hull_start)?;
        w.u32(self.hull_end)
    }
}

impl Element for MeshChunk {
    fn codec() -> Codec {
        Codec::Struct(Self::def)
    }

    fn decode(r: &mut BinaryReader<'_>) -> Result<Self> {
        read_struct(r)
    }

    fn encode(&self, w: &mut WriteCursor) -> Result<()> {
        write_struct(w, self)
    }
}

/// A packed geometry batch: one shared vertex layout, one shared index
/// buffer, one shared hull-vertex array.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeometryStream {
    /// Bytes per interleaved vertex.
    pub stride: u32,
    /// Bytes per index: 2 or 4, decided once for the whole batch.
    pub index_width: u32,
    pub layout: Vec<LayoutEntry>,
    pub meshes: Vec<MeshChunk>,
    pub hull_vertices: Vec<Vec3>,
    pub index_data: Vec<u8>,
}

static GEOMETRY_STREAM_FIELDS: &[Field] = &[
    Field::plain("stride", Codec::UInt32),
    Field::plain("index_width", Codec::UInt32),
    Field::plain("layout", Codec::List(&Codec::Struct(LayoutEntry::def))),
    Field::plain("meshes", Codec::List(&Codec::Struct(MeshChunk::def))),
    Field::plain("hull_vertices", Codec::List(&Codec::Struct(<Vec3 as Record>::def))),
    Field::plain("index_data", Codec::List(&Codec::UInt8)),
];
static GEOMETRY_STREAM_DEF: StructDef = StructDef::new("GeometryStream", GEOMETRY_STREAM_FIELDS);

impl Record for GeometryStream {
    fn def() -> &'static StructDef {
        &GEOMETRY_STREAM_DEF
    }

    fn read(r: &mut FieldReader<'_, '_>) -> Result<Self> {
        Ok(Self {
            stride: r.u32()?,
            index_width: r.u32()?,
            layout: r.list()?,
            meshes: r.list()?,
            hull_vertices: r.list()?,
            index_data: r.list()?,
        })
    }

    fn write(&self, w: &mut FieldWriter<'_>) -> Result<()> {
        w.u32(self.stride)?;
        w.u32(self.index_width)?;
        w.list(&self.layout)?;
        w.list(&self.meshes)?;
        w.list(&self.hull_vertices)?;
        w.list(&self.index_data)
    }
}

/// Legacy geometry stream: one fixed position/normal/texcoord vertex layout.
///
/// Written by older exporters only. Readable through its own registered
/// definition; the packer never emits it.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeometryStreamV1 {
    pub stride: u32,
    /// Bit mask of the attributes present, in the fixed legacy order.
    pub attribute_mask: u32,
    pub vertex_count: u32,
    pub index_count: u32,
    pub vertex_data: Vec<u8>,
    /// Always 16-bit indices in the legacy layout.
    pub index_data: Vec<u8>,
}

static GEOMETRY_STREAM_V1_FIELDS: &[Field] = &[
    Field::plain("stride", Codec::UInt32),
    Field::plain("attribute_mask", Codec::UInt32),
    Field::plain("vertex_count", Codec::UInt32),
    Field::plain("index_count", Codec::UInt32),
    Field::plain("vertex_data", Codec::List(&Codec::UInt8)),
    Field::plain("index_data", Codec::List(&Codec::UInt8)),
];
static GEOMETRY_STREAM_V1_DEF: StructDef =
    StructDef::new("GeometryStreamV1", GEOMETRY_STREAM_V1_FIELDS);

impl Record for GeometryStreamV1 {
    fn def() -> &'static StructDef {
        &GEOMETRY_STREAM_V1_DEF
    }

    fn read(r: &mut FieldReader<'_, '_>) -> Result<Self> {
        Ok(Self {
            stride: r.u32()?,
            attribute_mask: r.u32()?,
            vertex_count: r.u32()?,
            index_count: r.u32()?,
            vertex_data: r.list()?,
            index_data: r.list()?,
        })
    }

    fn write(&self, w: &mut FieldWriter<'_>) -> Result<()> {
        w.u32(self.stride)?;
        w.u32(self.attribute_mask)?;
        w.u32(self.vertex_count)?;
        w.u32(self.index_count)?;
        w.list(&self.vertex_data)?;
        w.list(&self.index_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perun_schema::{read_root, write_root};

    #[test]
    fn test_geometry_stream_roundtrip() {
        let stream = GeometryStream {
            stride: 16,
            index_width: 2,
            layout: vec![
                LayoutEntry { semantic: 0, format: 0, offset: 0 },
                LayoutEntry { semantic: 1, format: 1, offset: 12 },
            ],
            meshes: vec![MeshChunk {
                id: "chassis".into(),
                vertex_data: vec![1, 2, 3, 4],
                position_data: vec![5, 6, 7, 8],
                content_hash: 0xCAFE,
                vertex_count: 1,
                index_count: 3,
                index_offset: 0,
                bounds_min: Vec3::splat(-1.0),
                bounds_max: Vec3::splat(1.0),
                hull_start: 0,
                hull_end: 1,
            }],
            hull_vertices: vec![Vec3::ZERO],
            index_data: vec![0, 0, 1, 0, 2, 0],
        };

        let bytes = write_root(&stream).unwrap();
        let back: GeometryStream = read_root(&bytes).unwrap();
        assert_eq!(back, stream);
    }

    #[test]
    fn test_v1_def_is_distinct() {
        assert_ne!(
            GeometryStream::def().name_hash(),
            GeometryStreamV1::def().name_hash()
        );
    }
}
