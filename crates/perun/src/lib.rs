//! Perun - binary scene-graph container library.
//!
//! This crate provides a unified interface to the Perun library ecosystem
//! for moving scene graphs in and out of the engine's model container format.
//!
//! # Crates
//!
//! - [`perun_common`] - Common utilities (binary cursors, CRC32C, asset ids)
//! - [`perun_schema`] - Schema engine, pointer lists, deferred writes,
//!   compact codecs, container envelope
//! - [`perun_mdl`] - Model structures, geometry packer, format catalog
//!
//! # Example
//!
//! ```no_run
//! use perun::prelude::*;
//!
//! // Open a model container
//! let file = ModelFile::open("props/crate.pmd")?;
//! println!(
//!     "{}: {} meshes",
//!     file.model.name,
//!     file.model.geometry.meshes.len()
//! );
//!
//! // Re-export it under a fresh asset id
//! ModelFile::write_to("props/crate_copy.pmd", &file.model, AssetId::generate())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use perun_common as common;
pub use perun_mdl as mdl;
pub use perun_schema as schema;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use perun_common::{crc, AssetId, BinaryReader, ByteWriter};
    pub use perun_mdl::pack::{pack_meshes, MeshSource, PackWarning};
    pub use perun_mdl::{
        AnimClip, AnimTrack, GeometryStream, MeshChunk, ModelFile, ModelRoot, SceneNode,
    };
    pub use perun_schema::{Catalog, Codec, Envelope, Field, Record, RecordKind, StructDef};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
