//! Decoded animations with signed root offsets and [Rotation] values for each bone.
//!
//! Root offsets are signed 16 bit values and rotations use 12 bit two's complement.
//! Converting an [AnimationData] back to an [Animation] clears the unused bits of each packed rotation.
//! Use [interpolate_animation] to add frames without changing the original frames.
use binread::{
    io::{Read, Seek},
    BinReaderExt, BinResult,
};
use mch_lib::formats::anim::{Animation, Frame, PackedRotation};
use mch_lib::MchWrite;
use std::convert::TryFrom;
use std::io::Write;

use crate::error::FormatError;
use crate::rotation::Rotation;

mod interpolation;
pub use interpolation::interpolate_animation;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The pose for a single frame.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameData {
    /// The translation of the root bone in vertex units.
    pub root_offset: [i16; 3],
    pub rotations: Vec<Rotation>,
}

impl From<&Frame> for FrameData {
    fn from(f: &Frame) -> Self {
        Self {
            root_offset: f.root_offset,
            rotations: f.rotations.iter().copied().map(Rotation::from).collect(),
        }
    }
}

impl From<&FrameData> for Frame {
    fn from(f: &FrameData) -> Self {
        Self {
            root_offset: f.root_offset,
            rotations: f.rotations.iter().copied().map(PackedRotation::from).collect(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnimationData {
    /// The number of rotations in each frame.
    pub bone_count: usize,
    pub frames: Vec<FrameData>,
}

impl From<&Animation> for AnimationData {
    fn from(a: &Animation) -> Self {
        Self {
            bone_count: a.bone_count as usize,
            frames: a.frames.iter().map(FrameData::from).collect(),
        }
    }
}

impl TryFrom<&AnimationData> for Animation {
    type Error = FormatError;

    fn try_from(a: &AnimationData) -> Result<Self, Self::Error> {
        let frame_count = u16::try_from(a.frames.len()).map_err(|_| FormatError::CountOverflow {
            name: "frame",
            count: a.frames.len(),
            bits: 16,
        })?;
        let bone_count = u16::try_from(a.bone_count).map_err(|_| FormatError::CountOverflow {
            name: "bone",
            count: a.bone_count,
            bits: 16,
        })?;

        let frames = a
            .frames
            .iter()
            .enumerate()
            .map(|(i, f)| {
                if f.rotations.len() == a.bone_count {
                    Ok(Frame::from(f))
                } else {
                    Err(FormatError::FrameBoneCount {
                        frame: i,
                        count: f.rotations.len(),
                        bone_count: a.bone_count,
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            frame_count,
            bone_count,
            frames,
        })
    }
}

/// Reads `frame_count` frames with `bone_count` rotations each.
pub fn decode_animation<R: Read + Seek>(
    reader: &mut R,
    frame_count: u16,
    bone_count: u16,
) -> BinResult<AnimationData> {
    let frames = (0..frame_count)
        .map(|_| {
            reader
                .read_le_args::<Frame>((bone_count,))
                .map(|f| FrameData::from(&f))
        })
        .collect::<BinResult<Vec<_>>>()?;

    Ok(AnimationData {
        bone_count: bone_count as usize,
        frames,
    })
}

/// Writes the frames of `animation` without the frame and bone counts.
pub fn encode_animation<W: Write + Seek>(
    writer: &mut W,
    animation: &AnimationData,
) -> Result<(), FormatError> {
    let animation = Animation::try_from(animation)?;
    animation.frames.mch_write(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_hex_eq;
    use binread::io::Cursor;
    use hexlit::hex;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_root_offset_sign() {
        // Values from 0x8000 to 0xEFFF are negative.
        let mut reader = Cursor::new(hex!("0080 00E0 FF7F 00000000"));
        let animation = decode_animation(&mut reader, 1, 1).unwrap();

        assert_eq!([i16::MIN, -0x2000, i16::MAX], animation.frames[0].root_offset);
    }

    #[test]
    fn decode_rotation_sign() {
        // 0xEFC is negative and 0x3FC is positive.
        let mut reader = Cursor::new(hex!("0000 0000 0000 FFBF000C"));
        let animation = decode_animation(&mut reader, 1, 1).unwrap();

        assert_eq!(
            Rotation {
                x: -260,
                y: 0,
                z: 0x3FC
            },
            animation.frames[0].rotations[0]
        );
    }

    #[test]
    fn decode_multiple_frames() {
        let mut reader = Cursor::new(hex!(
            "0100 0200 0300 40000000 40800000 FFFF FEFF FDFF 00000000 00000000"
        ));
        let animation = decode_animation(&mut reader, 2, 2).unwrap();

        assert_eq!(2, animation.bone_count);
        assert_eq!(
            vec![
                FrameData {
                    root_offset: [1, 2, 3],
                    rotations: vec![Rotation::new(0, 0, 0x100), Rotation::new(0x200, 0, 0x100)]
                },
                FrameData {
                    root_offset: [-1, -2, -3],
                    rotations: vec![Rotation::default(); 2]
                }
            ],
            animation.frames
        );
    }

    #[test]
    fn decode_not_enough_data() {
        let mut reader = Cursor::new(hex!("0100 0200 0300 4000"));
        assert!(decode_animation(&mut reader, 1, 1).is_err());
    }

    #[test]
    fn encode_frames() {
        let animation = AnimationData {
            bone_count: 1,
            frames: vec![FrameData {
                root_offset: [i16::MIN, 0, 256],
                rotations: vec![Rotation::new(-260, 0, 0x3FC)],
            }],
        };

        let mut writer = Cursor::new(Vec::new());
        encode_animation(&mut writer, &animation).unwrap();

        assert_hex_eq!(writer.get_ref(), &hex!("0080 0000 0001 FFBF000C"));
    }

    #[test]
    fn encode_frame_bone_count_mismatch() {
        let animation = AnimationData {
            bone_count: 2,
            frames: vec![FrameData {
                root_offset: [0; 3],
                rotations: vec![Rotation::default()],
            }],
        };

        let mut writer = Cursor::new(Vec::new());
        assert!(matches!(
            encode_animation(&mut writer, &animation),
            Err(FormatError::FrameBoneCount {
                frame: 0,
                count: 1,
                bone_count: 2
            })
        ));
    }

    #[test]
    fn convert_animation() {
        let animation = Animation {
            frame_count: 1,
            bone_count: 1,
            frames: vec![Frame {
                root_offset: [4, 5, 6],
                rotations: vec![PackedRotation::from_bytes([0x40, 0x80, 0xC0, 0x00])],
            }],
        };

        let data = AnimationData::from(&animation);
        assert_eq!(
            Rotation {
                x: 0x200,
                y: 0x300,
                z: 0x100
            },
            data.frames[0].rotations[0]
        );
        assert_eq!(animation, Animation::try_from(&data).unwrap());
    }
}
