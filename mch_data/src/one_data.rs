//! Animations stored in [One] archives.
//!
//! Archives store additional animations for each character in a field.
//! Interpolating an archive only changes the animation frames,
//! so textures, embedded models, and any trailing bytes are preserved.
use mch_lib::{CountWidth, One};
use std::path::Path;
use tracing::{debug, warn};

use crate::anim_data::{interpolate_animation, AnimationData};
use crate::error::{ArchiveError, ArchiveNotFoundError, FormatError, UnknownCharacterError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An overview of a character's data in an archive.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterSummary {
    pub name: String,
    pub flags: u32,
    /// `true` if the character has textures and an embedded model.
    pub has_model: bool,
    /// The size in bytes of the character data.
    pub size: u64,
    /// The frame count for each animation.
    pub frame_counts: Vec<u16>,
}

/// Summarizes each character in `one` in directory order.
pub fn archive_summary(one: &One) -> Vec<CharacterSummary> {
    one.entries
        .iter()
        .zip(one.characters.iter())
        .map(|(entry, character)| CharacterSummary {
            name: entry.name(),
            flags: entry.flags,
            has_model: entry.has_model(),
            size: character.data_size(),
            frame_counts: character
                .animations
                .animations
                .iter()
                .map(|a| a.frame_count)
                .collect(),
        })
        .collect()
}

/// Decodes the animations for the character with the given name like "d000".
pub fn character_animations(
    one: &One,
    name: &str,
) -> Result<Vec<AnimationData>, UnknownCharacterError> {
    let (_, character) = one
        .character(name)
        .ok_or_else(|| UnknownCharacterError(name.to_string()))?;

    Ok(character
        .animations
        .animations
        .iter()
        .map(AnimationData::from)
        .collect())
}

/// Reads the archive at `path` and decodes the animations for the character `name`.
///
/// Returns an empty list if the archive has no animations for the character.
pub fn read_archive_animations<P: AsRef<Path>>(
    path: P,
    name: &str,
    count_width: CountWidth,
) -> Result<Vec<AnimationData>, ArchiveError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ArchiveNotFoundError {
            path: path.to_path_buf(),
        }
        .into());
    }

    let one = One::from_file_with_count_width(path, count_width).map_err(FormatError::from)?;
    match character_animations(&one, name) {
        Ok(animations) => {
            debug!(
                "Read {} animations for {:?} from {:?}.",
                animations.len(),
                name,
                path
            );
            Ok(animations)
        }
        Err(e) => {
            warn!("{} Skipping archive {:?}.", e, path);
            Ok(Vec::new())
        }
    }
}

/// Inserts `extra_frames` frames between each pair of frames for every animation in `one`.
///
/// Character addresses and sizes are recalculated when writing the returned archive.
/// Passing `0` returns an identical archive.
pub fn interpolate_archive(one: &One, extra_frames: usize) -> Result<One, FormatError> {
    let mut new_one = one.clone();

    for (entry, character) in new_one.entries.iter().zip(new_one.characters.iter_mut()) {
        let animations = &mut character.animations.animations;
        debug!(
            "Interpolating {} animations for {:?}.",
            animations.len(),
            entry.name()
        );

        *animations = animations
            .iter()
            .map(|a| interpolate_animation(a, extra_frames))
            .collect::<Result<Vec<_>, _>>()?;
    }

    Ok(new_one)
}
