//! The top-level model structure.

use perun_schema::{
    Codec, Field, FieldReader, FieldWriter, Record, Result, StructDef,
};

use super::anim::AnimClip;
use super::geometry::GeometryStream;
use super::scene::SceneNode;

/// A complete model: scene hierarchy, packed geometry, and animation clips.
///
/// This is the structure an asset-kind container file holds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelRoot {
    pub name: String,
    pub root: SceneNode,
    pub geometry: GeometryStream,
    pub clips: Vec<AnimClip>,
}

static MODEL_ROOT_FIELDS: &[Field] = &[
    Field::plain("name", Codec::List(&Codec::Char)),
    Field::plain("root", Codec::Struct(SceneNode::def)),
    Field::plain("geometry", Codec::Struct(GeometryStream::def)),
    Field::plain("clips", Codec::List(&Codec::Struct(AnimClip::def))),
];
static MODEL_ROOT_DEF: StructDef = StructDef::new("ModelRoot", MODEL_ROOT_FIELDS);

impl Record for ModelRoot {
    fn def() -> &'static StructDef {
        &MODEL_ROOT_DEF
    }

    fn read(r: &mut FieldReader<'_, '_>) -> Result<Self> {
        Ok(Self {
            name: r.string()?,
            root: r.nested()?,
            geometry: r.nested()?,
            clips: r.list()?,
        })
    }

    fn write(&self, w: &mut FieldWriter<'_>) -> Result<()> {
        w.string(&self.name)?;
        w.nested(&self.root)?;
        w.nested(&self.geometry)?;
        w.list(&self.clips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perun_schema::{read_root, write_root};

    #[test]
    fn test_empty_model_roundtrip() {
        let model = ModelRoot {
            name: "crate_props".into(),
            root: SceneNode::new("root"),
            geometry: GeometryStream::default(),
            clips: vec![],
        };
        let bytes = write_root(&model).unwrap();
        let back: ModelRoot = read_root(&bytes).unwrap();
        assert_eq!(back, model);
    }
}
