//! Parsing and recalculation of the [MchHeader].
//!
//! Exported models keep the original bones, texture animation data, and unknown regions,
//! so only the regions after the bones need to be moved.
//! The vertex region stays at its original offset and every following region is packed
//! directly after the previous one.
use binread::{
    io::{Read, Seek, SeekFrom},
    BinReaderExt, BinResult,
};
use mch_lib::{
    formats::mch::{MchHeader, FACE_SIZE, SKIN_GROUP_SIZE, UNK1_SIZE, VERTEX_SIZE},
    OffsetList,
};
use std::convert::TryFrom;

use crate::error::FormatError;

/// The location of the model and its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderData {
    /// Absolute TIM offsets with flags in the upper bits.
    pub texture_offsets: Vec<u32>,
    /// The absolute position of the header.
    pub model_address: u32,
    pub header: MchHeader,
}

/// Reads the texture offsets, model address, and header from the start of an MCH file.
pub fn parse_header<R: Read + Seek>(reader: &mut R) -> BinResult<HeaderData> {
    reader.seek(SeekFrom::Start(0))?;
    let texture_offsets: OffsetList = reader.read_le()?;
    let model_address: u32 = reader.read_le()?;

    reader.seek(SeekFrom::Start(model_address as u64))?;
    let header: MchHeader = reader.read_le()?;

    Ok(HeaderData {
        texture_offsets: texture_offsets.0,
        model_address,
        header,
    })
}

/// The element counts for the regions rebuilt on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegionCounts {
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub quad_count: usize,
    pub skin_group_count: usize,
}

impl RegionCounts {
    pub fn face_count(&self) -> usize {
        self.triangle_count + self.quad_count
    }
}

/// Calculates the header for a model with the given `counts`.
///
/// The bone count and offset, vertex offset, texture animation size,
/// unknown region counts, and [unk2_offset](MchHeader::unk2_offset) are kept from `original`.
pub fn synthesize_header(
    original: &MchHeader,
    counts: RegionCounts,
) -> Result<MchHeader, FormatError> {
    let vertex_count = count_u32("vertex", counts.vertex_count)?;
    let face_count = count_u32("face", counts.face_count())?;
    let skin_group_count = count_u32("skin group", counts.skin_group_count)?;
    let triangle_count = count_u16("triangle", counts.triangle_count)?;
    let quad_count = count_u16("quad", counts.quad_count)?;

    let vertex_offset = original.vertex_offset as u64;
    let tex_anim_offset = vertex_offset + VERTEX_SIZE * vertex_count as u64;
    let face_offset = tex_anim_offset + original.tex_anim_size as u64;
    let unk1_offset = face_offset + FACE_SIZE * face_count as u64;
    let skin_group_offset = unk1_offset + UNK1_SIZE * original.unk1_count as u64;
    let anim_offset = skin_group_offset + SKIN_GROUP_SIZE * skin_group_count as u64;

    Ok(MchHeader {
        bone_count: original.bone_count,
        vertex_count,
        tex_anim_size: original.tex_anim_size,
        face_count,
        unk1_count: original.unk1_count,
        skin_group_count,
        unk2_count: original.unk2_count,
        triangle_count,
        quad_count,
        bone_offset: original.bone_offset,
        vertex_offset: original.vertex_offset,
        tex_anim_offset: offset_u32("texture animation", tex_anim_offset)?,
        face_offset: offset_u32("face", face_offset)?,
        unk1_offset: offset_u32("unk1", unk1_offset)?,
        skin_group_offset: offset_u32("skin group", skin_group_offset)?,
        anim_offset: offset_u32("animation", anim_offset)?,
        unk2_offset: original.unk2_offset,
    })
}

fn count_u32(name: &'static str, count: usize) -> Result<u32, FormatError> {
    u32::try_from(count).map_err(|_| FormatError::CountOverflow {
        name,
        count,
        bits: 32,
    })
}

fn count_u16(name: &'static str, count: usize) -> Result<u16, FormatError> {
    u16::try_from(count).map_err(|_| FormatError::CountOverflow {
        name,
        count,
        bits: 16,
    })
}

fn offset_u32(name: &'static str, offset: u64) -> Result<u32, FormatError> {
    u32::try_from(offset).map_err(|_| FormatError::OffsetOverflow { name })
}
