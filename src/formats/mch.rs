//! The [Mch] format stores a field character model with its skeleton, skinned geometry, and rest pose animation.
//! These files typically use the ".mch" suffix like "d000.mch".
//! The first four characters of the file name identify the character.
//!
//! The file starts with a list of TIM texture offsets followed by the address of the model.
//! All offsets in the [MchHeader] are relative to the start of the model.
//! Additional animations are stored in [One](crate::formats::one::One) archives.
use binread::{
    io::{Cursor, Read, Seek, SeekFrom},
    BinRead, BinReaderExt, BinResult, ReadOptions,
};
use mch_write::MchWrite;
use std::convert::TryFrom;
use std::io::Write;

use crate::formats::anim::AnimationBlock;
use crate::formats::tim::Tim;
use crate::{
    read_bytes, read_to_end, read_until, read_vec, write_at, CountWidth, OffsetList,
};

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

/// Masks the texture offsets to the absolute position of the TIM data.
pub const TEXTURE_OFFSET_MASK: u32 = 0x00FFFFFF;

pub const HEADER_SIZE: u64 = 0x40;
pub const BONE_SIZE: u64 = 64;
pub const VERTEX_SIZE: u64 = 8;
pub const FACE_SIZE: u64 = 64;
pub const UNK1_SIZE: u64 = 32;
pub const SKIN_GROUP_SIZE: u64 = 8;

/// The region counts and offsets for an [MchModel].
/// Offsets are relative to the start of the header.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, MchWrite, Clone, PartialEq, Eq, Default)]
pub struct MchHeader {
    pub bone_count: u32,
    pub vertex_count: u32,
    /// The size in bytes of the texture animation data.
    pub tex_anim_size: u32,
    pub face_count: u32,
    pub unk1_count: u32,
    pub skin_group_count: u32,
    pub unk2_count: u32,
    pub triangle_count: u16,
    pub quad_count: u16,
    pub bone_offset: u32,
    pub vertex_offset: u32,
    pub tex_anim_offset: u32,
    pub face_offset: u32,
    pub unk1_offset: u32,
    pub skin_group_offset: u32,
    pub anim_offset: u32,
    /// Usually a constant like `0x01800140` rather than an offset.
    pub unk2_offset: u32,
}

/// A bone in the skeleton hierarchy.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, MchWrite, Clone, PartialEq, Eq)]
pub struct Bone {
    /// The index of the parent bone plus one or `0` for the root.
    pub parent: u16,
    pub unk1: u16,
    pub unk2: [u8; 4],
    /// The length of the bone along its local Z axis in vertex units.
    pub length: i16,
    #[br(count = 54)]
    pub unk3: Vec<u8>,
}

/// A vertex position in the local space of the bone for its [SkinGroup].
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, MchWrite, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vertex {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub unk1: u16,
}

/// The primitive type of a [Face] determined by the face's tag.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceKind {
    Triangle,
    Quad,
}

impl FaceKind {
    pub const TRIANGLE_TAG: u32 = 0x25010607;
    pub const QUAD_TAG: u32 = 0x2D010709;

    pub fn tag(self) -> u32 {
        match self {
            FaceKind::Triangle => Self::TRIANGLE_TAG,
            FaceKind::Quad => Self::QUAD_TAG,
        }
    }

    /// The number of used vertex and UV corners.
    pub fn corner_count(self) -> usize {
        match self {
            FaceKind::Triangle => 3,
            FaceKind::Quad => 4,
        }
    }
}

impl TryFrom<u32> for FaceKind {
    type Error = u32;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        match tag {
            Self::TRIANGLE_TAG => Ok(FaceKind::Triangle),
            Self::QUAD_TAG => Ok(FaceKind::Quad),
            _ => Err(tag),
        }
    }
}

impl BinRead for FaceKind {
    type Args = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        options: &ReadOptions,
        _args: Self::Args,
    ) -> BinResult<Self> {
        let pos = reader.seek(SeekFrom::Current(0))?;
        let tag = u32::read_options(reader, options, ())?;
        FaceKind::try_from(tag).map_err(|tag| binread::Error::AssertFail {
            pos,
            message: format!("Unrecognized face tag {:#010x}.", tag),
        })
    }
}

impl MchWrite for FaceKind {
    fn mch_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        self.tag().mch_write(writer)
    }

    fn size_in_bytes(&self) -> u64 {
        4
    }
}

/// An unsigned texture coordinate relative to the face's texture group.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, MchWrite, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Uv {
    pub u: u8,
    pub v: u8,
}

/// A triangle or quad.
///
/// Corners are stored in the order `v2, v3, v1, v4`
/// for both [vertex_indices](#structfield.vertex_indices) and [uvs](#structfield.uvs).
/// The fourth corner of a triangle is unused.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, MchWrite, Clone, PartialEq, Eq)]
pub struct Face {
    pub kind: FaceKind,
    pub unk1: [u8; 8],
    pub vertex_indices: [u16; 4],
    pub normals: [i16; 4],
    /// Flat vertex colors for each corner.
    pub colors: [u32; 4],
    pub uvs: [Uv; 4],
    pub unk2: u16,
    pub texture_group: u16,
    pub unk3: [u8; 8],
}

/// A contiguous range of vertices transformed by a single bone.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, MchWrite, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkinGroup {
    pub first_vertex: u16,
    pub vertex_count: u16,
    /// The index of the bone plus one.
    pub bone: u16,
    pub unk1: u16,
}

#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, MchWrite, Clone, PartialEq, Eq)]
pub struct Unk1(#[br(count = UNK1_SIZE as usize)] pub Vec<u8>);

/// The model data starting at the model address.
/// Each region is read from its offset in the [MchHeader],
/// so the region counts and offsets should be updated after editing a region.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, Clone, PartialEq)]
#[br(import(base: u64, count_width: CountWidth))]
pub struct MchModel {
    pub header: MchHeader,

    #[br(seek_before = SeekFrom::Start(base + header.bone_offset as u64))]
    #[br(parse_with = read_vec, args(header.bone_count))]
    pub bones: Vec<Bone>,

    #[br(seek_before = SeekFrom::Start(base + header.vertex_offset as u64))]
    #[br(parse_with = read_vec, args(header.vertex_count))]
    pub vertices: Vec<Vertex>,

    #[br(seek_before = SeekFrom::Start(base + header.tex_anim_offset as u64))]
    #[br(parse_with = read_bytes, args(header.tex_anim_size as u64))]
    pub tex_anim: Vec<u8>,

    #[br(seek_before = SeekFrom::Start(base + header.face_offset as u64))]
    #[br(parse_with = read_vec, args(header.face_count))]
    pub faces: Vec<Face>,

    #[br(seek_before = SeekFrom::Start(base + header.unk1_offset as u64))]
    #[br(parse_with = read_vec, args(header.unk1_count))]
    pub unk1: Vec<Unk1>,

    #[br(seek_before = SeekFrom::Start(base + header.skin_group_offset as u64))]
    #[br(parse_with = read_vec, args(header.skin_group_count))]
    pub skin_groups: Vec<SkinGroup>,

    #[br(seek_before = SeekFrom::Start(base + header.anim_offset as u64))]
    #[br(args(count_width))]
    pub animations: AnimationBlock,

    /// The remaining bytes after the animations.
    /// This includes the data for [unk2_count](struct.MchHeader.html#structfield.unk2_count).
    #[br(parse_with = read_to_end)]
    pub trailer: Vec<u8>,
}

impl MchWrite for MchModel {
    fn mch_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        let base = writer.stream_position()?;
        let header = &self.header;

        self.header.mch_write(writer)?;
        write_at(writer, base + header.bone_offset as u64, &self.bones)?;
        write_at(writer, base + header.vertex_offset as u64, &self.vertices)?;
        write_at(writer, base + header.tex_anim_offset as u64, &self.tex_anim)?;
        write_at(writer, base + header.face_offset as u64, &self.faces)?;
        write_at(writer, base + header.unk1_offset as u64, &self.unk1)?;
        write_at(writer, base + header.skin_group_offset as u64, &self.skin_groups)?;
        write_at(writer, base + header.anim_offset as u64, &self.animations)?;
        self.trailer.mch_write(writer)?;
        Ok(())
    }

    fn size_in_bytes(&self) -> u64 {
        let header = &self.header;
        [
            HEADER_SIZE,
            header.bone_offset as u64 + self.bones.size_in_bytes(),
            header.vertex_offset as u64 + self.vertices.size_in_bytes(),
            header.tex_anim_offset as u64 + self.tex_anim.size_in_bytes(),
            header.face_offset as u64 + self.faces.size_in_bytes(),
            header.unk1_offset as u64 + self.unk1.size_in_bytes(),
            header.skin_group_offset as u64 + self.skin_groups.size_in_bytes(),
            header.anim_offset as u64
                + self.animations.size_in_bytes()
                + self.trailer.size_in_bytes(),
        ]
        .into_iter()
        .max()
        .unwrap_or(HEADER_SIZE)
    }
}

/// A field character model.
/// Compatible with the field models of the PlayStation and PC releases.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, Clone, PartialEq)]
#[br(import(count_width: CountWidth))]
pub struct Mch {
    /// Absolute offsets of TIM textures stored in the upper bits.
    /// See [TEXTURE_OFFSET_MASK].
    pub texture_offsets: OffsetList,
    /// The absolute position of the [MchHeader].
    pub model_address: u32,
    /// The TIM data between the offset list and the model.
    #[br(parse_with = read_until, args(model_address as u64))]
    pub texture_data: Vec<u8>,
    #[br(args(model_address as u64, count_width))]
    pub model: MchModel,
}

impl Mch {
    /// The absolute position of the first byte of [texture_data](#structfield.texture_data).
    pub fn texture_data_start(&self) -> u64 {
        self.texture_offsets.size_in_bytes() + 4
    }

    /// Parses the TIM header for each of the [texture_offsets](#structfield.texture_offsets).
    pub fn textures(&self) -> BinResult<Vec<Tim>> {
        let data_start = self.texture_data_start();
        self.texture_offsets
            .0
            .iter()
            .map(|offset| {
                let pos = (offset & TEXTURE_OFFSET_MASK) as u64;
                let relative_pos = pos
                    .checked_sub(data_start)
                    .filter(|p| *p < self.texture_data.len() as u64)
                    .ok_or(binread::Error::AssertFail {
                        pos,
                        message: format!("Texture offset {:#x} is outside the texture data.", pos),
                    })?;

                let mut reader = Cursor::new(&self.texture_data[relative_pos as usize..]);
                reader.read_le::<Tim>()
            })
            .collect()
    }
}

impl MchWrite for Mch {
    fn mch_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        self.texture_offsets.mch_write(writer)?;
        self.model_address.mch_write(writer)?;
        self.texture_data.mch_write(writer)?;
        write_at(writer, self.model_address as u64, &self.model)
    }

    fn size_in_bytes(&self) -> u64 {
        self.model_address as u64 + self.model.size_in_bytes()
    }
}
