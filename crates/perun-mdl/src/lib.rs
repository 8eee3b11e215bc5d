//! Perun model container.
//!
//! This crate binds the schema engine to the model format proper: the
//! registered wire structures (scene nodes, geometry streams, animation
//! clips), the static record catalog their name hashes resolve against, the
//! geometry stream packer, and the file-level open/parse/write entry points.
//!
//! # Quick start
//!
//! ```no_run
//! use perun_mdl::{ModelFile, ModelRoot, SceneNode, GeometryStream};
//! use perun_common::AssetId;
//!
//! // Read a model container.
//! let file = ModelFile::open("crate_props.pmd")?;
//! println!("{}: {} nodes", file.model.name, file.model.root.subtree_len());
//!
//! // Write one back.
//! let model = ModelRoot {
//!     name: "crate_props".into(),
//!     root: SceneNode::new("root"),
//!     geometry: GeometryStream::default(),
//!     clips: vec![],
//! };
//! ModelFile::write_to("out.pmd", &model, AssetId::generate())?;
//! # Ok::<(), perun_mdl::Error>(())
//! ```
//!
//! # Packing geometry
//!
//! ```
//! use glam::Vec3;
//! use perun_mdl::pack::{pack_meshes, MeshSource};
//!
//! let mesh = MeshSource {
//!     id: "tri".into(),
//!     positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
//!     indices: vec![0, 1, 2],
//!     ..MeshSource::default()
//! };
//! let packed = pack_meshes(&[mesh])?;
//! assert_eq!(packed.stream.index_width, 2);
//! # Ok::<(), perun_mdl::Error>(())
//! ```

mod error;
mod hull;
mod structs;

pub mod pack;

use std::path::Path;
use std::sync::LazyLock;

use memmap2::Mmap;
use perun_common::AssetId;
use perun_schema::{peek_envelope, read_record, write_record, Catalog, Envelope, Record, RecordKind};

pub use error::{Error, Result};
pub use hull::hull_subset;
pub use structs::{
    AnimClip, AnimTrack, GeometryStream, GeometryStreamV1, LayoutEntry, MeshChunk, ModelRoot,
    SceneNode, CHILD_LIST_TAG,
};

/// Content version stamped into headers written by this crate.
pub const CONTENT_VERSION: u16 = 1;

/// The model format's record catalog.
///
/// Registers every structure that may appear behind a container header.
static MODEL_CATALOG: LazyLock<Catalog> = LazyLock::new(|| {
    Catalog::new(&[
        ModelRoot::def(),
        SceneNode::def(),
        GeometryStream::def(),
        GeometryStreamV1::def(),
        MeshChunk::def(),
        LayoutEntry::def(),
        AnimClip::def(),
        AnimTrack::def(),
    ])
});

/// Access the static model catalog.
pub fn model_catalog() -> &'static Catalog {
    &MODEL_CATALOG
}

/// A parsed model container file.
#[derive(Debug, Clone)]
pub struct ModelFile {
    pub envelope: Envelope,
    pub model: ModelRoot,
}

impl ModelFile {
    /// Open and parse a model file (memory-mapped while parsing).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::parse(&mmap)
    }

    /// Parse a model container from bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (envelope, model) = read_record::<ModelRoot>(data, model_catalog())?;
        Ok(Self { envelope, model })
    }

    /// Serialize a model into container bytes (asset-kind header).
    pub fn to_bytes(model: &ModelRoot, asset_id: AssetId) -> Result<Vec<u8>> {
        Ok(write_record(
            model,
            RecordKind::Asset,
            CONTENT_VERSION,
            asset_id,
        )?)
    }

    /// Serialize a model and write it to a file.
    ///
    /// Callers wanting atomicity should pass a scratch path and rename on
    /// success.
    pub fn write_to<P: AsRef<Path>>(path: P, model: &ModelRoot, asset_id: AssetId) -> Result<()> {
        let bytes = Self::to_bytes(model, asset_id)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Parse just the container envelope of a model file's bytes.
pub fn peek(data: &[u8]) -> Result<Envelope> {
    Ok(peek_envelope(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::{pack_meshes, MeshSource};
    use glam::{Quat, Vec3};
    use perun_schema::{Error as SchemaError, ASSET_HEADER_SIZE};

    fn sample_model() -> ModelRoot {
        let mesh = MeshSource {
            id: "hull".into(),
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            normals: Some(vec![Vec3::Z; 4]),
            indices: vec![0, 1, 2, 0, 2, 3],
            ..MeshSource::default()
        };
        let packed = pack_meshes(&[mesh]).unwrap();

        let mut root = SceneNode::new("root");
        let mut body = SceneNode::new("body");
        body.rotation = Quat::from_rotation_x(0.25);
        root.children.push(body);

        ModelRoot {
            name: "skiff".into(),
            root,
            geometry: packed.stream,
            clips: vec![AnimClip {
                name: "idle".into(),
                duration: 2.0,
                tracks: vec![],
            }],
        }
    }

    #[test]
    fn test_model_file_roundtrip() {
        let model = sample_model();
        let id = AssetId::from_raw(42);
        let bytes = ModelFile::to_bytes(&model, id).unwrap();

        let file = ModelFile::parse(&bytes).unwrap();
        assert_eq!(file.envelope.asset_id, id);
        assert_eq!(file.envelope.struct_hash, ModelRoot::def().name_hash());
        assert_eq!(file.model, model);
    }

    #[test]
    fn test_peek_reads_envelope_only() {
        let bytes = ModelFile::to_bytes(&sample_model(), AssetId::NIL).unwrap();
        let envelope = peek(&bytes).unwrap();
        assert_eq!(envelope.header_size(), ASSET_HEADER_SIZE);
        assert_eq!(
            envelope.body_len as usize,
            bytes.len() - ASSET_HEADER_SIZE
        );
    }

    #[test]
    fn test_foreign_hash_rejected() {
        let mut bytes = ModelFile::to_bytes(&sample_model(), AssetId::NIL).unwrap();
        // Corrupt the structure hash at offset 16.
        bytes[16] ^= 0xFF;
        assert!(matches!(
            ModelFile::parse(&bytes),
            Err(Error::Schema(SchemaError::UnknownStructHash { .. }))
        ));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let bytes = ModelFile::to_bytes(&sample_model(), AssetId::NIL).unwrap();
        assert!(ModelFile::parse(&bytes[..bytes.len() - 8]).is_err());
    }
}
