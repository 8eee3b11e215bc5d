//! The geometry stream packer.
//!
//! Packs a batch of meshes into one shared vertex layout, one shared index
//! buffer, and one shared hull-vertex array. Every global decision - the
//! attribute union, the layout offsets, the index width, per-mesh base
//! offsets and bounds - is made in a planning pass over the whole batch
//! before a single payload byte is emitted.

use glam::{Vec2, Vec3, Vec4};
use perun_common::crc;
use perun_schema::compact;
use tracing::warn;

use crate::hull::hull_subset;
use crate::structs::{GeometryStream, LayoutEntry, MeshChunk};
use crate::{Error, Result};

/// Wire format codes used in [`LayoutEntry::format`].
pub mod vertex_format {
    /// Three little-endian f32.
    pub const F32X3: u32 = 0;
    /// Packed 10/10/10/2 normal.
    pub const PACKED_NORMAL: u32 = 1;
    /// Two IEEE binary16 halves.
    pub const HALF2: u32 = 2;
    /// Four bytes, normalized to 0..=1.
    pub const UNORM8X4: u32 = 3;
    /// Four bytes, raw integer values.
    pub const UINT8X4: u32 = 4;
}

/// Vertex attributes, in canonical interleave order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VertexAttribute {
    Position,
    Normal,
    Tangent,
    TexCoord,
    Color,
    SkinIndices,
    SkinWeights,
}

impl VertexAttribute {
    /// Every attribute, in canonical order. Layout offsets are assigned by
    /// walking this order and keeping the attributes the batch supplies.
    pub const ALL: [VertexAttribute; 7] = [
        VertexAttribute::Position,
        VertexAttribute::Normal,
        VertexAttribute::Tangent,
        VertexAttribute::TexCoord,
        VertexAttribute::Color,
        VertexAttribute::SkinIndices,
        VertexAttribute::SkinWeights,
    ];

    /// Interleaved byte size of this attribute.
    pub const fn size(self) -> usize {
        match self {
            VertexAttribute::Position => 12,
            _ => 4,
        }
    }

    /// Semantic code written to [`LayoutEntry::semantic`].
    pub const fn semantic(self) -> u32 {
        self as u32
    }

    /// Wire format code written to [`LayoutEntry::format`].
    pub const fn format(self) -> u32 {
        match self {
            VertexAttribute::Position => vertex_format::F32X3,
            VertexAttribute::Normal | VertexAttribute::Tangent => vertex_format::PACKED_NORMAL,
            VertexAttribute::TexCoord => vertex_format::HALF2,
            VertexAttribute::Color | VertexAttribute::SkinWeights => vertex_format::UNORM8X4,
            VertexAttribute::SkinIndices => vertex_format::UINT8X4,
        }
    }

    /// Attribute name for diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            VertexAttribute::Position => "position",
            VertexAttribute::Normal => "normal",
            VertexAttribute::Tangent => "tangent",
            VertexAttribute::TexCoord => "texcoord",
            VertexAttribute::Color => "color",
            VertexAttribute::SkinIndices => "skin_indices",
            VertexAttribute::SkinWeights => "skin_weights",
        }
    }
}

impl std::fmt::Display for VertexAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Attribute streams for one mesh, as handed over by the editor layer.
///
/// `positions` and `indices` are mandatory; everything else is optional and
/// padded with bound defaults when other meshes in the batch supply it.
#[derive(Debug, Clone, Default)]
pub struct MeshSource {
    pub id: String,
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    /// xyz tangent plus handedness sign in w.
    pub tangents: Option<Vec<Vec4>>,
    pub tex_coords: Option<Vec<Vec2>>,
    pub colors: Option<Vec<[u8; 4]>>,
    pub skin_indices: Option<Vec<[u8; 4]>>,
    /// Per-bone weights, quantized to unorm8 on pack.
    pub skin_weights: Option<Vec<Vec4>>,
    pub indices: Vec<u32>,
}

impl MeshSource {
    /// Check whether this mesh supplies an attribute stream.
    pub fn has(&self, attribute: VertexAttribute) -> bool {
        self.stream_len(attribute).is_some()
    }

    fn stream_len(&self, attribute: VertexAttribute) -> Option<usize> {
        match attribute {
            VertexAttribute::Position => Some(self.positions.len()),
            VertexAttribute::Normal => self.normals.as_ref().map(Vec::len),
            VertexAttribute::Tangent => self.tangents.as_ref().map(Vec::len),
            VertexAttribute::TexCoord => self.tex_coords.as_ref().map(Vec::len),
            VertexAttribute::Color => self.colors.as_ref().map(Vec::len),
            VertexAttribute::SkinIndices => self.skin_indices.as_ref().map(Vec::len),
            VertexAttribute::SkinWeights => self.skin_weights.as_ref().map(Vec::len),
        }
    }

    fn validate(&self) -> std::result::Result<(), SkipReason> {
        if self.positions.is_empty() {
            return Err(SkipReason::NoPositions);
        }
        if self.indices.is_empty() {
            return Err(SkipReason::NoIndices);
        }
        if let Some(&index) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.positions.len())
        {
            return Err(SkipReason::IndexOutOfRange {
                index,
                vertex_count: self.positions.len(),
            });
        }
        Ok(())
    }
}

/// Why a mesh was dropped from the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No position stream; nothing to pack.
    NoPositions,
    /// No index stream; nothing to draw.
    NoIndices,
    /// An index addresses past the position stream.
    IndexOutOfRange { index: u32, vertex_count: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoPositions => f.write_str("no position data"),
            SkipReason::NoIndices => f.write_str("no index data"),
            SkipReason::IndexOutOfRange {
                index,
                vertex_count,
            } => write!(f, "index {index} out of range for {vertex_count} vertices"),
        }
    }
}

/// Recoverable diagnostics produced while packing.
#[derive(Debug, Clone, PartialEq)]
pub enum PackWarning {
    /// Another mesh in the batch supplies this attribute; this one was
    /// packed with a bound default.
    MissingAttribute {
        mesh: String,
        attribute: VertexAttribute,
    },
    /// A supplied stream is shorter or longer than the position stream.
    StreamLengthMismatch {
        mesh: String,
        attribute: VertexAttribute,
        expected: usize,
        actual: usize,
    },
    /// The mesh could not be packed at all.
    MeshSkipped { mesh: String, reason: SkipReason },
}

/// A packed batch plus its recoverable diagnostics.
#[derive(Debug, Clone)]
pub struct PackedGeometry {
    pub stream: GeometryStream,
    pub warnings: Vec<PackWarning>,
}

/// Per-mesh decisions made before any byte is emitted.
struct MeshPlan {
    base_vertex: usize,
    index_offset: usize,
    bounds_min: Vec3,
    bounds_max: Vec3,
    hull: Vec<Vec3>,
}

/// Pack a batch of meshes into one geometry stream.
///
/// Returns [`Error::EmptyBatch`] when validation leaves no packable mesh.
pub fn pack_meshes(meshes: &[MeshSource]) -> Result<PackedGeometry> {
    let mut warnings = Vec::new();

    // Meshes without geometry cannot be packed at all.
    let mut batch = Vec::new();
    for mesh in meshes {
        match mesh.validate() {
            Ok(()) => batch.push(mesh),
            Err(reason) => {
                warn!(mesh = %mesh.id, %reason, "skipping unpackable mesh");
                warnings.push(PackWarning::MeshSkipped {
                    mesh: mesh.id.clone(),
                    reason,
                });
            }
        }
    }
    if batch.is_empty() {
        return Err(Error::EmptyBatch);
    }

    // The layout is shared, so it must cover the union of supplied
    // attributes across the batch.
    let attributes: Vec<VertexAttribute> = VertexAttribute::ALL
        .into_iter()
        .filter(|&attr| batch.iter().any(|mesh| mesh.has(attr)))
        .collect();

    for mesh in &batch {
        for &attribute in &attributes {
            match mesh.stream_len(attribute) {
                None => {
                    warn!(
                        mesh = %mesh.id,
                        attribute = attribute.name(),
                        "mesh missing attribute, packing bound default"
                    );
                    warnings.push(PackWarning::MissingAttribute {
                        mesh: mesh.id.clone(),
                        attribute,
                    });
                }
                Some(actual) if actual != mesh.positions.len() => {
                    warn!(
                        mesh = %mesh.id,
                        attribute = attribute.name(),
                        expected = mesh.positions.len(),
                        actual,
                        "attribute stream length differs from position stream"
                    );
                    warnings.push(PackWarning::StreamLengthMismatch {
                        mesh: mesh.id.clone(),
                        attribute,
                        expected: mesh.positions.len(),
                        actual,
                    });
                }
                Some(_) => {}
            }
        }
    }

    let mut layout = Vec::with_capacity(attributes.len());
    let mut stride = 0u32;
    for &attribute in &attributes {
        layout.push(LayoutEntry {
            semantic: attribute.semantic(),
            format: attribute.format(),
            offset: stride,
        });
        stride += attribute.size() as u32;
    }

    // One index-width decision for the whole batch: after rebasing, every
    // mesh addresses the same concatenated vertex space.
    let total_vertices: usize = batch.iter().map(|mesh| mesh.positions.len()).sum();
    let index_width: u32 = if total_vertices > u16::MAX as usize { 4 } else { 2 };

    // Planning pass: bounds, hulls, and offsets for the entire batch.
    let mut plans = Vec::with_capacity(batch.len());
    let mut base_vertex = 0;
    let mut index_bytes = 0;
    for mesh in &batch {
        let (bounds_min, bounds_max) = bounds(&mesh.positions);
        plans.push(MeshPlan {
            base_vertex,
            index_offset: index_bytes,
            bounds_min,
            bounds_max,
            hull: hull_subset(&mesh.positions),
        });
        base_vertex += mesh.positions.len();
        index_bytes += mesh.indices.len() * index_width as usize;
    }

    // Emission pass.
    let mut chunks = Vec::with_capacity(batch.len());
    let mut hull_vertices = Vec::new();
    let mut index_data = Vec::with_capacity(index_bytes);
    for (mesh, plan) in batch.iter().zip(plans) {
        let vertex_data = interleave(mesh, &attributes);
        let position_data = position_block(&mesh.positions);

        for &index in &mesh.indices {
            let rebased = index as usize + plan.base_vertex;
            if index_width == 2 {
                index_data.extend_from_slice(&(rebased as u16).to_le_bytes());
            } else {
                index_data.extend_from_slice(&(rebased as u32).to_le_bytes());
            }
        }

        let hull_start = hull_vertices.len() as u32;
        hull_vertices.extend_from_slice(&plan.hull);

        let content_hash =
            crc::hash_bytes_with_seed(&index_data[plan.index_offset..], crc::hash_bytes(&vertex_data));

        chunks.push(MeshChunk {
            id: mesh.id.clone(),
            vertex_data,
            position_data,
            content_hash,
            vertex_count: mesh.positions.len() as u32,
            index_count: mesh.indices.len() as u32,
            index_offset: plan.index_offset as u32,
            bounds_min: plan.bounds_min,
            bounds_max: plan.bounds_max,
            hull_start,
            hull_end: hull_vertices.len() as u32,
        });
    }

    Ok(PackedGeometry {
        stream: GeometryStream {
            stride,
            index_width,
            layout,
            meshes: chunks,
            hull_vertices,
            index_data,
        },
        warnings,
    })
}

fn bounds(points: &[Vec3]) -> (Vec3, Vec3) {
    let mut min = points[0];
    let mut max = points[0];
    for point in &points[1..] {
        min = min.min(*point);
        max = max.max(*point);
    }
    (min, max)
}

fn position_block(points: &[Vec3]) -> Vec<u8> {
    let mut out = Vec::with_capacity(points.len() * 12);
    for point in points {
        for component in point.to_array() {
            out.extend_from_slice(&component.to_le_bytes());
        }
    }
    out
}

fn interleave(mesh: &MeshSource, attributes: &[VertexAttribute]) -> Vec<u8> {
    let stride: usize = attributes.iter().map(|a| a.size()).sum();
    let mut out = Vec::with_capacity(mesh.positions.len() * stride);
    for i in 0..mesh.positions.len() {
        for &attribute in attributes {
            write_attribute(&mut out, mesh, attribute, i);
        }
    }
    out
}

fn write_attribute(out: &mut Vec<u8>, mesh: &MeshSource, attribute: VertexAttribute, i: usize) {
    fn stream_get<T: Copy>(stream: &Option<Vec<T>>, i: usize) -> Option<T> {
        stream.as_ref().and_then(|values| values.get(i)).copied()
    }

    match attribute {
        VertexAttribute::Position => {
            for component in mesh.positions[i].to_array() {
                out.extend_from_slice(&component.to_le_bytes());
            }
        }
        VertexAttribute::Normal => {
            let normal = stream_get(&mesh.normals, i).unwrap_or(Vec3::Z);
            out.extend_from_slice(&compact::pack_normal(normal.extend(0.0)).to_le_bytes());
        }
        VertexAttribute::Tangent => {
            let tangent = stream_get(&mesh.tangents, i).unwrap_or(Vec4::new(1.0, 0.0, 0.0, 1.0));
            // Handedness sign rides the 2-bit tag: 1 = right-handed, 0 = flipped.
            let tag = if tangent.w < 0.0 { 0.0 } else { 1.0 };
            let packed = compact::pack_normal(Vec4::new(tangent.x, tangent.y, tangent.z, tag));
            out.extend_from_slice(&packed.to_le_bytes());
        }
        VertexAttribute::TexCoord => {
            let uv = stream_get(&mesh.tex_coords, i).unwrap_or(Vec2::ZERO);
            out.extend_from_slice(&compact::pack_half(uv.x).to_le_bytes());
            out.extend_from_slice(&compact::pack_half(uv.y).to_le_bytes());
        }
        VertexAttribute::Color => {
            out.extend_from_slice(&stream_get(&mesh.colors, i).unwrap_or([255; 4]));
        }
        VertexAttribute::SkinIndices => {
            out.extend_from_slice(&stream_get(&mesh.skin_indices, i).unwrap_or([0; 4]));
        }
        VertexAttribute::SkinWeights => {
            let weights = stream_get(&mesh.skin_weights, i).unwrap_or(Vec4::X);
            for component in weights.to_array() {
                out.push((component.clamp(0.0, 1.0) * 255.0).round() as u8);
            }
        }
    }
}
