//! Registered wire structure definitions.

mod anim;
mod geometry;
mod model;
mod scene;

pub use anim::{AnimClip, AnimTrack};
pub use geometry::{GeometryStream, GeometryStreamV1, LayoutEntry, MeshChunk};
pub use model::ModelRoot;
pub use scene::{SceneNode, CHILD_LIST_TAG};
