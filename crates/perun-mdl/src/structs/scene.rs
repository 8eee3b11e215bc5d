//! Scene graph nodes.
//!
//! A node's children field is a pointer-list whose element codec is the node
//! definition itself, so trees of arbitrary depth serialize through the same
//! mechanism as every other list.

use glam::{Quat, Vec3};
use perun_common::BinaryReader;
use perun_schema::{
    read_struct, write_struct, Codec, Element, Field, FieldReader, FieldWriter, Record, Result,
    StructDef, WriteCursor,
};

/// Format tag emitted for child-node lists.
pub const CHILD_LIST_TAG: u32 = 0xAAAAAA01;

/// One node of the scene hierarchy.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneNode {
    pub name: String,
    pub flags: u32,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Create a leaf node with an identity transform.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: 0,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            children: Vec::new(),
        }
    }

    /// Total node count of this subtree, including self.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(SceneNode::subtree_len)
            .sum::<usize>()
    }
}

fn node_def() -> &'static StructDef {
    &NODE_DEF
}

static NODE_CHILD_CODEC: Codec = Codec::Struct(node_def);

static NODE_FIELDS: &[Field] = &[
    Field::plain("name", Codec::List(&Codec::Char)),
    Field::plain("flags", Codec::UInt32),
    Field::plain("translation", Codec::Struct(<Vec3 as Record>::def)),
    Field::array("rotation", Codec::Float32, 4),
    Field::plain("scale", Codec::Struct(<Vec3 as Record>::def)),
    Field::tagged("children", Codec::List(&NODE_CHILD_CODEC), CHILD_LIST_TAG),
];

static NODE_DEF: StructDef = StructDef::new("SceneNode", NODE_FIELDS);

impl Record for SceneNode {
    fn def() -> &'static StructDef {
        &NODE_DEF
    }

    fn read(r: &mut FieldReader<'_, '_>) -> Result<Self> {
        Ok(Self {
            name: r.string()?,
            flags: r.u32()?,
            translation: r.nested()?,
            rotation: Quat::from_array(r.array::<f32, 4>()?),
            scale: r.nested()?,
            children: r.list()?,
        })
    }

    fn write(&self, w: &mut FieldWriter<'_>) -> Result<()> {
        w.string(&self.name)?;
        w.u32(self.flags)?;
        w.nested(&self.translation)?;
        w.array(&self.rotation.to_array())?;
        w.nested(&self.scale)?;
        w.list(&self.children)
    }
}

impl Element for SceneNode {
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

#[cfg(test)]
mod tests {
    use super::*;
    use perun_schema::{read_root, write_root};

    fn sample_tree() -> SceneNode {
        let mut root = SceneNode::new("root");
        root.translation = Vec3::new(1.0, 2.0, 3.0);
        root.rotation = Quat::from_rotation_y(0.5);

        let mut arm = SceneNode::new("arm");
        arm.flags = 4;
        arm.children.push(SceneNode::new("hand"));

        root.children.push(arm);
        root.children.push(SceneNode::new("leg"));
        root
    }

    #[test]
    fn test_tree_roundtrip() {
        let tree = sample_tree();
        let bytes = write_root(&tree).unwrap();
        let back: SceneNode = read_root(&bytes).unwrap();
        assert_eq!(back, tree);
        assert_eq!(back.subtree_len(), 4);
    }

    #[test]
    fn test_child_list_tag_on_wire() {
        let tree = sample_tree();
        let bytes = write_root(&tree).unwrap();
        // children is the last field: record at fixed size - 16, tag in its
        // final 4 bytes.
        let record_pos = SceneNode::def().fixed_size() - 16;
        assert_eq!(
            &bytes[record_pos + 12..record_pos + 16],
            &CHILD_LIST_TAG.to_le_bytes()
        );
    }

    #[test]
    fn test_leaf_children_record_is_empty() {
        let bytes = write_root(&SceneNode::new("solo")).unwrap();
        let record_pos = SceneNode::def().fixed_size() - 16;
        assert_eq!(&bytes[record_pos..record_pos + 8], &0i64.to_le_bytes());
        assert_eq!(
            &bytes[record_pos + 8..record_pos + 12],
            &0u32.to_le_bytes()
        );
    }
}
