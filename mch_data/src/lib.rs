//! # mch_data
//!
//! mch_data provides a more intuitive API for field character models built on mch_lib.
//!
//! ## Features
//! - Decoding of vertex positions, faces, and UVs into standard Rust types like [Vec] and [f32]
//! - Named bones and rest pose calculation for known characters
//! - Decoding and encoding of packed bone rotations
//! - Frame interpolation for the animations in ONE archives
//! - Errors for invalid data such as out of bounds vertex indices or vertices bound to multiple bones
//!
//! ## Getting Started
//! The easiest way to access important items like [ModelData](crate::model_data::ModelData) is to import the [prelude].
/*!
```no_run
use mch_data::prelude::*;

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let mch = mch_lib::Mch::from_file("d000.mch")?;
let model = ModelData::from_mch(&mch, "d000", &ModelOptions::default())?;

for bone in &model.skeleton.bones {
    println!("{} {:?}", bone.name, bone.parent_index);
}

// Export using the vertex groups from the original file.
let groups = model.vertex_groups();
let new_mch = model.to_mch(&mch, &groups, &ExportOptions::default())?;
new_mch.write_to_file("d000-new.mch")?;
# Ok(())
# }
```
 */
//!
//! ## File Differences
//! Bones, texture data, texture animations, unknown regions, and the embedded animations
//! are carried over unchanged from the original file when exporting.
//! Exporting an unmodified model with its own vertex groups produces an identical file.
//! Vertex positions are rounded down to the nearest vertex unit when encoding,
//! so positions that are not multiples of `1 / divisor` will change slightly.
pub mod anim_data;
pub mod error;
pub mod header_data;
pub mod mesh_data;
pub mod model_data;
pub mod one_data;
pub mod rotation;
pub mod skel_data;
pub mod skin_data;

/// Common imports for top level types and options.
pub mod prelude {
    pub use crate::anim_data::{AnimationData, FrameData};
    pub use crate::error::{
        ArchiveError, ExportError, FormatError, PartitionError, UnknownCharacterError,
    };
    pub use crate::mesh_data::{AtlasLayout, MeshData};
    pub use crate::model_data::{ExportOptions, FormatRevision, ModelData, ModelOptions};
    pub use crate::rotation::Rotation;
    pub use crate::skel_data::{CharacterProfile, SkeletonData};
    pub use crate::skin_data::{SkinPartition, VertexGroup, VertexWeight};
}

#[cfg(test)]
pub(crate) fn group_hex(a: &str, words_per_line: usize) -> String {
    use itertools::Itertools;

    // ex: "FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF..."
    let words = a
        .chars()
        .collect::<Vec<char>>()
        .chunks(8)
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<String>>();

    words.chunks(words_per_line).map(|c| c.join(" ")).join("\n")
}

#[cfg(test)]
macro_rules! assert_hex_eq {
    ($a:expr, $b:expr) => {
        assert!(
            $a == $b,
            "\n{} !=\n{}",
            crate::group_hex(&hex::encode($a), 8),
            crate::group_hex(&hex::encode($b), 8)
        )
    };
}

#[cfg(test)]
pub(crate) use assert_hex_eq;
