//! Animation clips.
//!
//! Per-sample rotations use the 6-byte compressed quaternion codec; at 30+
//! samples per second per bone that halving of the frame data is the reason
//! the codec exists. Retargeting is the editor layer's problem - these are
//! wire structures only.

use glam::{Quat, Vec3};
use perun_common::BinaryReader;
use perun_schema::{
    read_struct, write_struct, Codec, Element, Field, FieldReader, FieldWriter, Record, Result,
    StructDef, WriteCursor,
};

/// Keyframe data for one target node.
///
/// The key-time list is shared by every channel of the track; channels a
/// track does not animate stay empty.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimTrack {
    /// Name of the scene node this track drives.
    pub target: String,
    pub times: Vec<f32>,
    pub rotations: Vec<Quat>,
    pub translations: Vec<Vec3>,
    pub scales: Vec<Vec3>,
}

static ANIM_TRACK_FIELDS: &[Field] = &[
    Field::plain("target", Codec::List(&Codec::Char)),
    Field::plain("times", Codec::List(&Codec::Float32)),
    Field::plain("rotations", Codec::List(&Codec::Quat48)),
    Field::plain("translations", Codec::List(&Codec::Struct(<Vec3 as Record>::def))),
    Field::plain("scales", Codec::List(&Codec::Struct(<Vec3 as Record>::def))),
];
static ANIM_TRACK_DEF: StructDef = StructDef::new("AnimTrack", ANIM_TRACK_FIELDS);

impl Record for AnimTrack {
    fn def() -> &'static StructDef {
        &ANIM_TRACK_DEF
    }

    fn read(r: &mut FieldReader<'_, '_>) -> Result<Self> {
        Ok(Self {
            target: r.string()?,
            times: r.list()?,
            rotations: r.list()?,
            translations: r.list()?,
            scales: r.list()?,
        })
    }

    fn write(&self, w: &mut FieldWriter<'_>) -> Result<()> {
        w.string(&self.target)?;
        w.list(&self.times)?;
        w.list(&self.rotations)?;
        w.list(&self.translations)?;
        w.list(&self.scales)
    }
}

impl Element for AnimTrack {
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

/// One named animation clip.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimClip {
    pub name: String,
    /// Clip length in seconds.
    pub duration: f32,
    pub tracks: Vec<AnimTrack>,
}

static ANIM_CLIP_FIELDS: &[Field] = &[
    Field::plain("name", Codec::List(&Codec::Char)),
    Field::plain("duration", Codec::Float32),
    Field::plain("tracks", Codec::List(&Codec::Struct(AnimTrack::def))),
];
static ANIM_CLIP_DEF: StructDef = StructDef::new("AnimClip", ANIM_CLIP_FIELDS);

impl Record for AnimClip {
    fn def() -> &'static StructDef {
        &ANIM_CLIP_DEF
    }

    fn read(r: &mut FieldReader<'_, '_>) -> Result<Self> {
        Ok(Self {
            name: r.string()?,
            duration: r.f32()?,
            tracks: r.list()?,
        })
    }

    fn write(&self, w: &mut FieldWriter<'_>) -> Result<()> {
        w.string(&self.name)?;
        w.f32(self.duration)?;
        w.list(&self.tracks)
    }
}

impl Element for AnimClip {
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

    #[test]
    fn test_clip_roundtrip_within_quantization() {
        let clip = AnimClip {
            name: "walk".into(),
            duration: 1.25,
            tracks: vec![AnimTrack {
                target: "hip".into(),
                times: vec![0.0, 0.5, 1.0],
                rotations: vec![
                    Quat::IDENTITY,
                    Quat::from_rotation_z(0.4),
                    Quat::from_rotation_z(0.8),
                ],
                translations: vec![Vec3::ZERO, Vec3::Y, Vec3::Y * 2.0],
                scales: vec![],
            }],
        };

        let bytes = write_root(&clip).unwrap();
        let back: AnimClip = read_root(&bytes).unwrap();

        assert_eq!(back.name, clip.name);
        assert_eq!(back.duration, clip.duration);
        assert_eq!(back.tracks[0].times, clip.tracks[0].times);
        assert_eq!(back.tracks[0].translations, clip.tracks[0].translations);
        assert!(back.tracks[0].scales.is_empty());
        for (a, b) in back.tracks[0]
            .rotations
            .iter()
            .zip(&clip.tracks[0].rotations)
        {
            // Rotations pass through the lossy 6-byte codec.
            assert!(a.angle_between(*b) < 1e-3, "{a:?} vs {b:?}");
        }
    }
}
