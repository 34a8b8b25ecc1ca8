//! Animation blocks store skeletal animations as per frame root translations and bone rotations.
//! The same block layout is used after the embedded model data in MCH files and for each character in ONE archives.
//! The first frame of the first animation in an MCH file is the model's rest pose.
use binread::{
    io::{Read, Seek},
    BinRead, BinResult, ReadOptions,
};
use mch_write::MchWrite;
use modular_bitfield::prelude::*;
use std::io::Write;

use crate::CountWidth;

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

/// Three rotation angles packed into 4 bytes.
///
/// Each angle uses 12 bits where 4096 units are a full revolution.
/// Only the upper 10 bits are stored, so the lowest 2 bits of every angle are always zero.
/// The first three bytes store the low 8 bits of the Z, X, and Y angles.
/// The last byte stores the 2 high bits of the Z, X, and Y angles followed by 2 unused bits.
#[bitfield(bits = 32)]
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, Clone, Copy, PartialEq, Eq)]
#[br(map = Self::from_bytes)]
pub struct PackedRotation {
    pub z_low: B8,
    pub x_low: B8,
    pub y_low: B8,
    pub z_high: B2,
    pub x_high: B2,
    pub y_high: B2,
    pub unused: B2,
}

mch_write::mch_write_modular_bitfield_impl!(PackedRotation, 4);

/// The pose for all bones for a single frame.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, MchWrite, Clone, PartialEq)]
#[br(import(bone_count: u16))]
pub struct Frame {
    /// The translation of the root bone in vertex units.
    pub root_offset: [i16; 3],
    #[br(count = bone_count as usize)]
    pub rotations: Vec<PackedRotation>,
}

/// A single animation with a fixed number of bones for every frame.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, MchWrite, Clone, PartialEq)]
pub struct Animation {
    pub frame_count: u16,
    pub bone_count: u16,
    #[br(count = frame_count as usize, args(bone_count))]
    pub frames: Vec<Frame>,
}

/// A count followed by that many [Animation].
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationBlock {
    /// The size of the animation count when reading and writing.
    pub count_width: CountWidth,
    pub animations: Vec<Animation>,
}

impl BinRead for AnimationBlock {
    type Args = (CountWidth,);

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        options: &ReadOptions,
        args: Self::Args,
    ) -> BinResult<Self> {
        let (count_width,) = args;
        let count = count_width.read_count(reader, options)?;

        let mut animations = Vec::new();
        for _ in 0..count {
            animations.push(Animation::read_options(reader, options, ())?);
        }

        Ok(Self {
            count_width,
            animations,
        })
    }
}

impl MchWrite for AnimationBlock {
    fn mch_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        self.count_width
            .write_count(writer, self.animations.len())?;
        self.animations.mch_write(writer)
    }

    fn size_in_bytes(&self) -> u64 {
        self.count_width.size_in_bytes() + self.animations.size_in_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_hex_eq;
    use binread::{io::Cursor, BinReaderExt};
    use hexlit::hex;

    #[test]
    fn read_packed_rotation() {
        let mut reader = Cursor::new(hex!("40 80 C0 39"));
        let value = reader.read_le::<PackedRotation>().unwrap();

        assert_eq!(0x40, value.z_low());
        assert_eq!(0x80, value.x_low());
        assert_eq!(0xC0, value.y_low());
        assert_eq!(1, value.z_high());
        assert_eq!(2, value.x_high());
        assert_eq!(3, value.y_high());
        assert_eq!(0, value.unused());
    }

    #[test]
    fn write_packed_rotation() {
        let value = PackedRotation::new()
            .with_z_low(0x40)
            .with_x_low(0x80)
            .with_y_low(0xC0)
            .with_z_high(1)
            .with_x_high(2)
            .with_y_high(3);

        let mut writer = Cursor::new(Vec::new());
        value.mch_write(&mut writer).unwrap();

        assert_hex_eq!(writer.get_ref(), &hex!("40 80 C0 39"));
    }

    #[test]
    fn read_animation_block_u16_count() {
        // 1 animation with 2 frames and 1 bone.
        let mut reader = Cursor::new(hex!(
            "0100 0200 0100 0100 FFFF 0080 11223300 0200 0000 FF7F 44556603"
        ));
        let value = reader
            .read_le_args::<AnimationBlock>((CountWidth::U16,))
            .unwrap();

        assert_eq!(CountWidth::U16, value.count_width);
        assert_eq!(1, value.animations.len());

        let animation = &value.animations[0];
        assert_eq!(2, animation.frame_count);
        assert_eq!(1, animation.bone_count);
        assert_eq!([1, -1, i16::MIN], animation.frames[0].root_offset);
        assert_eq!([2, 0, i16::MAX], animation.frames[1].root_offset);
        assert_eq!(0x44, animation.frames[1].rotations[0].z_low());
        assert_eq!(3, animation.frames[1].rotations[0].z_high());
    }

    #[test]
    fn read_animation_block_u32_count() {
        let mut reader = Cursor::new(hex!("01000000 0100 0000 0A00 0B00 0C00"));
        let value = reader
            .read_le_args::<AnimationBlock>((CountWidth::U32,))
            .unwrap();

        assert_eq!(1, value.animations.len());
        assert_eq!(
            vec![Frame {
                root_offset: [10, 11, 12],
                rotations: Vec::new()
            }],
            value.animations[0].frames
        );
        assert_eq!(4 + 4 + 6, value.size_in_bytes());
    }

    #[test]
    fn read_animation_block_large_count() {
        let mut reader = Cursor::new(hex!("FFFFFFFF 0100 0000 0A00 0B00 0C00"));
        let result = reader.read_le_args::<AnimationBlock>((CountWidth::U32,));
        assert!(result.is_err());
    }

    #[test]
    fn write_animation_block() {
        let value = AnimationBlock {
            count_width: CountWidth::U16,
            animations: vec![Animation {
                frame_count: 1,
                bone_count: 1,
                frames: vec![Frame {
                    root_offset: [-2, 0, 256],
                    rotations: vec![PackedRotation::from_bytes([1, 2, 3, 0xC0])],
                }],
            }],
        };

        let mut writer = Cursor::new(Vec::new());
        value.mch_write(&mut writer).unwrap();

        assert_hex_eq!(
            writer.get_ref(),
            &hex!("0100 0100 0100 FEFF 0000 0001 010203C0")
        );
        assert_eq!(writer.get_ref().len() as u64, value.size_in_bytes());
    }
}
