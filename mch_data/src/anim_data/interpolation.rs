use itertools::Itertools;
use mch_lib::formats::anim::{Animation, Frame, PackedRotation};
use std::convert::TryFrom;

use crate::error::FormatError;
use crate::rotation::Rotation;

/// Inserts `extra_frames` linearly interpolated frames between each pair of consecutive frames.
///
/// The original frames are copied unchanged, so an animation with `n` frames
/// has `(n - 1) * extra_frames + n` frames after interpolating.
/// Interpolated values are truncated towards zero.
/// Rotations are interpolated per angle without taking the shortest path.
pub fn interpolate_animation(
    animation: &Animation,
    extra_frames: usize,
) -> Result<Animation, FormatError> {
    let frame_count = animation.frames.len();
    let new_count = frame_count
        .saturating_sub(1)
        .saturating_mul(extra_frames)
        .saturating_add(frame_count);
    let new_frame_count = u16::try_from(new_count).map_err(|_| FormatError::CountOverflow {
        name: "frame",
        count: new_count,
        bits: 16,
    })?;

    let mut frames = Vec::with_capacity(new_count);
    for (a, b) in animation.frames.iter().tuple_windows() {
        frames.push(a.clone());
        for k in 1..=extra_frames {
            frames.push(interpolate_frame(a, b, k, extra_frames + 1));
        }
    }
    if let Some(last) = animation.frames.last() {
        frames.push(last.clone());
    }

    Ok(Animation {
        frame_count: new_frame_count,
        bone_count: animation.bone_count,
        frames,
    })
}

fn interpolate_frame(a: &Frame, b: &Frame, k: usize, steps: usize) -> Frame {
    let lerp = |start: i32, end: i32| {
        // Casting truncates towards zero.
        let step = (end - start) as f64 / steps as f64;
        (start as f64 + step * k as f64) as i32
    };

    let root_offset = [
        lerp(a.root_offset[0] as i32, b.root_offset[0] as i32) as i16,
        lerp(a.root_offset[1] as i32, b.root_offset[1] as i32) as i16,
        lerp(a.root_offset[2] as i32, b.root_offset[2] as i32) as i16,
    ];

    let rotations = a
        .rotations
        .iter()
        .zip(b.rotations.iter())
        .map(|(ra, rb)| {
            let ra = Rotation::from(*ra);
            let rb = Rotation::from(*rb);
            PackedRotation::from(Rotation::wrapped(
                lerp(ra.x as i32, rb.x as i32),
                lerp(ra.y as i32, rb.y as i32),
                lerp(ra.z as i32, rb.z as i32),
            ))
        })
        .collect();

    Frame {
        root_offset,
        rotations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame(root_offset: [i16; 3], rotations: &[Rotation]) -> Frame {
        Frame {
            root_offset,
            rotations: rotations.iter().copied().map(PackedRotation::from).collect(),
        }
    }

    fn animation(frames: Vec<Frame>) -> Animation {
        Animation {
            frame_count: frames.len() as u16,
            bone_count: frames.first().map(|f| f.rotations.len() as u16).unwrap_or(0),
            frames,
        }
    }

    #[test]
    fn interpolate_zero_frames() {
        let value = animation(vec![
            frame([0, 1, 2], &[Rotation::new(4, 8, 12)]),
            frame([3, 4, 5], &[Rotation::new(-4, 0, 0)]),
        ]);
        assert_eq!(value, interpolate_animation(&value, 0).unwrap());
    }

    #[test]
    fn interpolate_empty_and_single_frame() {
        let empty = animation(Vec::new());
        assert_eq!(empty, interpolate_animation(&empty, 3).unwrap());

        let single = animation(vec![frame([1, 2, 3], &[Rotation::default()])]);
        assert_eq!(single, interpolate_animation(&single, 3).unwrap());
    }

    #[test]
    fn interpolate_frame_count() {
        let value = animation(vec![frame([0; 3], &[]); 5]);
        let new_value = interpolate_animation(&value, 3).unwrap();

        assert_eq!(4 * 3 + 5, new_value.frame_count);
        assert_eq!(17, new_value.frames.len());
        assert_eq!(0, new_value.bone_count);
    }

    #[test]
    fn interpolate_single_frame_between() {
        let value = animation(vec![
            frame([0, -10, 5], &[Rotation::new(0, 100, -100)]),
            frame([3, 10, -5], &[Rotation::new(8, 200, 100)]),
        ]);
        let new_value = interpolate_animation(&value, 1).unwrap();

        assert_eq!(3, new_value.frame_count);
        assert_eq!(value.frames[0], new_value.frames[0]);
        assert_eq!(value.frames[1], new_value.frames[2]);

        // 1.5 truncates to 1.
        assert_eq!([1, 0, 0], new_value.frames[1].root_offset);
        // Wrapping clears the 2 lowest bits.
        assert_eq!(
            Rotation::new(4, 148, 0),
            Rotation::from(new_value.frames[1].rotations[0])
        );
    }

    #[test]
    fn interpolate_truncates_towards_zero() {
        let value = animation(vec![frame([0, 0, 0], &[]), frame([-5, 5, -2], &[])]);
        let new_value = interpolate_animation(&value, 2).unwrap();

        // Steps are -5/3, 5/3, and -2/3.
        assert_eq!([-1, 1, 0], new_value.frames[1].root_offset);
        assert_eq!([-3, 3, -1], new_value.frames[2].root_offset);
    }

    #[test]
    fn interpolate_negative_rotations() {
        let value = animation(vec![
            frame([0; 3], &[Rotation::new(-2048, 0, 0)]),
            frame([0; 3], &[Rotation::new(-1024, 0, 0)]),
        ]);
        let new_value = interpolate_animation(&value, 3).unwrap();

        let angles: Vec<_> = new_value
            .frames
            .iter()
            .map(|f| Rotation::from(f.rotations[0]).x)
            .collect();
        assert_eq!(vec![-2048, -1792, -1536, -1280, -1024], angles);
    }

    #[test]
    fn interpolate_preserves_unused_bits() {
        let mut value = animation(vec![frame([0; 3], &[Rotation::default()]); 2]);
        value.frames[0].rotations[0] = PackedRotation::from_bytes([0, 0, 0, 0xC0]);

        let new_value = interpolate_animation(&value, 1).unwrap();
        assert_eq!([0, 0, 0, 0xC0], new_value.frames[0].rotations[0].into_bytes());
        assert_eq!([0, 0, 0, 0], new_value.frames[1].rotations[0].into_bytes());
    }

    #[test]
    fn interpolate_frame_count_overflow() {
        let value = animation(vec![frame([0; 3], &[]); 3]);

        assert!(matches!(
            interpolate_animation(&value, 40000),
            Err(FormatError::CountOverflow {
                name: "frame",
                count: 80003,
                bits: 16
            })
        ));
    }
}
