//! TIM is the PlayStation texture format used for the textures of [Mch](crate::formats::mch::Mch) models
//! and the non playable characters in [One](crate::formats::one::One) archives.
//! Only the headers are decoded. Pixel data is kept as raw bytes.
use binread::BinRead;

use crate::read_bytes;

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

const BLOCK_HEADER_SIZE: u32 = 12;

/// A rectangle of data destined for video memory.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, Clone, PartialEq, Eq)]
pub struct TimBlock {
    /// The size of the block including the 12 byte block header.
    pub size: u32,
    pub x: u16,
    pub y: u16,
    /// The width in 16 bit units.
    pub width: u16,
    pub height: u16,
    #[br(parse_with = read_bytes, args(size.saturating_sub(BLOCK_HEADER_SIZE) as u64))]
    pub data: Vec<u8>,
}

/// The number of bits used for each pixel.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    Indexed4,
    Indexed8,
    Direct16,
    Direct24,
    Mixed,
}

#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, BinRead, Clone, PartialEq, Eq)]
#[br(magic = 0x10u32)]
pub struct Tim {
    pub flags: u32,
    /// The color lookup table for indexed images.
    #[br(if(flags & 0x8 != 0))]
    pub clut: Option<TimBlock>,
    pub image: TimBlock,
}

impl Tim {
    pub fn color_depth(&self) -> ColorDepth {
        match self.flags & 0x7 {
            0 => ColorDepth::Indexed4,
            1 => ColorDepth::Indexed8,
            2 => ColorDepth::Direct16,
            3 => ColorDepth::Direct24,
            _ => ColorDepth::Mixed,
        }
    }

    /// The width of the image in pixels.
    pub fn pixel_width(&self) -> u32 {
        let width = self.image.width as u32;
        match self.color_depth() {
            ColorDepth::Indexed4 => width * 4,
            ColorDepth::Indexed8 => width * 2,
            ColorDepth::Direct24 => width * 2 / 3,
            ColorDepth::Direct16 | ColorDepth::Mixed => width,
        }
    }

    /// The total size in bytes including the 8 byte file header.
    pub fn size_in_bytes(&self) -> u64 {
        8 + self.clut.as_ref().map(|c| c.size as u64).unwrap_or(0) + self.image.size as u64
    }
}
