use ahash::AHashMap;
use mch_lib::formats::mch::Uv;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The divisor for converting atlas coordinates in texels to normalized coordinates.
pub const NORMALIZED_UV_SCALE: f32 = 256.0;

/// The size of the area addressable by the 8 bit UV coordinates of a single face.
const CELL_RANGE: u32 = 256;

/// A texture coordinate in texels on the combined texture atlas.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UvData {
    pub u: u32,
    pub v: u32,
}

impl UvData {
    pub fn new(u: u32, v: u32) -> Self {
        Self { u, v }
    }
}

/// Describes how the texture group of each face maps to a cell on the texture atlas.
///
/// Groups are assigned to cells in row major order.
/// Cells may overlap since a face can address 256 texels from the cell origin on each axis.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasLayout {
    pub cell_width: u32,
    pub cell_height: u32,
    pub columns: u16,
}

impl AtlasLayout {
    /// A single column of bands with a height of 128 texels.
    pub const LEGACY: Self = Self {
        cell_width: 256,
        cell_height: 0x80,
        columns: 1,
    };

    /// Two columns of 128x128 cells.
    pub const GRID: Self = Self {
        cell_width: 128,
        cell_height: 128,
        columns: 2,
    };

    /// The row and column of the cell for `texture_group`.
    pub fn cell(&self, texture_group: u16) -> (u32, u32) {
        let columns = self.columns.max(1);
        (
            (texture_group / columns) as u32,
            (texture_group % columns) as u32,
        )
    }

    /// The texture group for the cell at `row` and `column`.
    pub fn texture_group(&self, row: u32, column: u32) -> Option<u16> {
        let columns = self.columns.max(1) as u32;
        if column >= columns {
            return None;
        }
        row.checked_mul(columns)
            .and_then(|g| g.checked_add(column))
            .and_then(|g| u16::try_from(g).ok())
    }

    /// The position in texels of the top left corner of the cell for `texture_group`.
    pub fn cell_origin(&self, texture_group: u16) -> UvData {
        let (row, column) = self.cell(texture_group);
        UvData {
            u: column * self.cell_width,
            v: row * self.cell_height,
        }
    }

    /// The height in texels of the rows used by `texture_groups` or `0` if there are no groups.
    pub fn used_height<I: IntoIterator<Item = u16>>(&self, texture_groups: I) -> u32 {
        texture_groups
            .into_iter()
            .map(|group| (self.cell(group).0 + 1) * self.cell_height)
            .max()
            .unwrap_or(0)
    }

    /// Offsets a face's UV by the origin of its texture group's cell.
    pub fn to_atlas(&self, uv: Uv, texture_group: u16) -> UvData {
        let origin = self.cell_origin(texture_group);
        UvData {
            u: origin.u + uv.u as u32,
            v: origin.v + uv.v as u32,
        }
    }

    /// Converts an atlas UV back to the face's UV relative to the cell for `texture_group`.
    /// Returns `None` if `uv` can't be addressed from the cell.
    pub fn to_local(&self, uv: UvData, texture_group: u16) -> Option<Uv> {
        let origin = self.cell_origin(texture_group);
        let u = uv.u.checked_sub(origin.u).filter(|u| *u < CELL_RANGE)?;
        let v = uv.v.checked_sub(origin.v).filter(|v| *v < CELL_RANGE)?;
        Some(Uv {
            u: u as u8,
            v: v as u8,
        })
    }
}

/// Removes duplicate UVs while preserving the order of first occurrence.
/// Returns the unique values and the index into the unique values for each element of `uvs`.
pub fn dedup_uvs(uvs: &[UvData]) -> (Vec<UvData>, Vec<usize>) {
    let mut unique = Vec::new();
    let mut index_by_uv = AHashMap::new();

    let indices = uvs
        .iter()
        .map(|uv| {
            *index_by_uv.entry(*uv).or_insert_with(|| {
                unique.push(*uv);
                unique.len() - 1
            })
        })
        .collect();

    (unique, indices)
}

/// Converts atlas UVs to normalized coordinates.
///
/// `u` is divided by [NORMALIZED_UV_SCALE].
/// `v` is divided by the atlas height, which is at least the 256 texels addressable from a single cell.
/// The height grows to include `atlas_height` and the largest `v`, so both coordinates stay in `[0, 1]`.
/// Flipping sets `v` to `1 - v` for applications with the origin at the bottom left.
pub fn normalize_uvs(uvs: &[UvData], atlas_height: u32, flip_v: bool) -> Vec<[f32; 2]> {
    let height = uvs
        .iter()
        .map(|uv| uv.v)
        .fold(atlas_height.max(CELL_RANGE), u32::max) as f32;

    uvs.iter()
        .map(|uv| {
            let u = uv.u as f32 / NORMALIZED_UV_SCALE;
            let v = uv.v as f32 / height;
            if flip_v {
                [u, 1.0 - v]
            } else {
                [u, v]
            }
        })
        .collect()
}
