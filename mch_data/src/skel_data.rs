//! Bone hierarchies and rest poses.
//!
//! The file stores a parent index and length for each bone but no transforms.
//! The rest pose is calculated from the first frame of the first animation embedded in the model
//! combined with a fixed rotation for some named bones.
use glam::{Quat, Vec3};
use mch_lib::formats::mch::Bone;
use std::collections::VecDeque;

use crate::anim_data::FrameData;
use crate::error::FormatError;

mod character;
pub use character::{CharacterProfile, BONE_SLOT_COUNT, BONE_SLOT_NAMES};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// A fixed rotation applied to a named bone when calculating the rest pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRotation {
    pub bone_name: &'static str,
    pub axis: Axis,
    pub degrees: f32,
}

impl AxisRotation {
    pub fn to_quat(&self) -> Quat {
        let angle = self.degrees.to_radians();
        match self.axis {
            Axis::X => Quat::from_rotation_x(angle),
            Axis::Y => Quat::from_rotation_y(angle),
            Axis::Z => Quat::from_rotation_z(angle),
        }
    }
}

/// Corrections that orient the limbs and spine of the rest pose.
pub const REST_POSE_CORRECTIONS: [AxisRotation; 9] = [
    AxisRotation {
        bone_name: "upperbody",
        axis: Axis::Y,
        degrees: 180.0,
    },
    AxisRotation {
        bone_name: "neck",
        axis: Axis::Y,
        degrees: 180.0,
    },
    AxisRotation {
        bone_name: "head",
        axis: Axis::Y,
        degrees: 180.0,
    },
    AxisRotation {
        bone_name: "breast_L",
        axis: Axis::X,
        degrees: -90.0,
    },
    AxisRotation {
        bone_name: "breast_R",
        axis: Axis::X,
        degrees: 90.0,
    },
    AxisRotation {
        bone_name: "shoulder_L",
        axis: Axis::X,
        degrees: -60.0,
    },
    AxisRotation {
        bone_name: "shoulder_R",
        axis: Axis::X,
        degrees: 60.0,
    },
    AxisRotation {
        bone_name: "hip_L",
        axis: Axis::X,
        degrees: -90.0,
    },
    AxisRotation {
        bone_name: "hip_R",
        axis: Axis::X,
        degrees: 90.0,
    },
];

fn correction(bone_name: &str) -> Quat {
    REST_POSE_CORRECTIONS
        .iter()
        .filter(|c| c.bone_name == bone_name)
        .fold(Quat::IDENTITY, |q, c| q * c.to_quat())
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoneData {
    pub name: String,
    /// The index of the parent bone or `None` for the root.
    pub parent_index: Option<usize>,
    /// The length along the bone's local Z axis in vertex units.
    pub length: i16,
    pub child_count: usize,
    /// The total number of descendants.
    pub chain_length: usize,
}

/// A validated bone hierarchy with a single root.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SkeletonData {
    pub bones: Vec<BoneData>,
    /// Bone indices ordered so that parents appear before their children.
    pub traversal_order: Vec<usize>,
}

impl SkeletonData {
    /// Builds the hierarchy for `bones` with names from `profile`.
    pub fn from_bones(bones: &[Bone], profile: &CharacterProfile) -> Result<Self, FormatError> {
        let bone_count = bones.len();

        let parents = bones
            .iter()
            .enumerate()
            .map(|(i, b)| match b.parent {
                0 => Ok(None),
                p if (p as usize) <= bone_count => Ok(Some(p as usize - 1)),
                p => Err(FormatError::InvalidParent {
                    bone: i,
                    parent: p as usize - 1,
                    bone_count,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let roots: Vec<_> = (0..bone_count).filter(|i| parents[*i].is_none()).collect();
        if bone_count > 0 && roots.len() != 1 {
            return Err(FormatError::RootCount { count: roots.len() });
        }

        let mut children = vec![Vec::new(); bone_count];
        for (i, parent) in parents.iter().enumerate() {
            if let Some(p) = parent {
                children[*p].push(i);
            }
        }

        // Bones not reachable from the root are part of a cycle.
        let traversal_order = breadth_first_order(&roots, &children);
        if let Some(bone) = (0..bone_count).find(|i| !traversal_order.contains(i)) {
            return Err(FormatError::BoneCycle { bone });
        }

        let mut chain_lengths = vec![0; bone_count];
        for i in traversal_order.iter().rev() {
            if let Some(p) = parents[*i] {
                chain_lengths[p] += 1 + chain_lengths[*i];
            }
        }

        let bones = bones
            .iter()
            .enumerate()
            .map(|(i, b)| BoneData {
                name: profile.bone_name(i),
                parent_index: parents[i],
                length: b.length,
                child_count: children[i].len(),
                chain_length: chain_lengths[i],
            })
            .collect();

        Ok(Self {
            bones,
            traversal_order,
        })
    }

    /// Calculates the rest pose from the first frame of the model's embedded animation.
    /// Lengths and offsets are divided by `divisor`.
    pub fn compute_rest_pose(
        &self,
        frame: &FrameData,
        divisor: f32,
    ) -> Result<RestPose, FormatError> {
        if frame.rotations.len() != self.bones.len() {
            return Err(FormatError::FrameBoneCount {
                frame: 0,
                count: frame.rotations.len(),
                bone_count: self.bones.len(),
            });
        }

        let mut rotations = vec![Quat::IDENTITY; self.bones.len()];
        let mut heads = vec![Vec3::ZERO; self.bones.len()];
        let mut tails = vec![Vec3::ZERO; self.bones.len()];

        for i in self.traversal_order.iter().copied() {
            let bone = &self.bones[i];
            let local = frame.rotations[i].to_quat() * correction(&bone.name);

            match bone.parent_index {
                Some(p) => {
                    rotations[i] = rotations[p] * local;
                    heads[i] = tails[p];
                    tails[i] = heads[i] + rotations[i] * Vec3::Z * bone.length as f32 / divisor;
                }
                None => {
                    let [x, y, z] = frame.root_offset;
                    rotations[i] = local;
                    heads[i] = Vec3::ZERO;
                    tails[i] = Vec3::new(x as f32, y as f32, z as f32) / divisor;
                }
            }
        }

        let bones = (0..self.bones.len())
            .map(|i| RestBone {
                head: heads[i].to_array(),
                tail: tails[i].to_array(),
                rotation: rotations[i].to_array(),
            })
            .collect();

        Ok(RestPose { bones })
    }
}

fn breadth_first_order(roots: &[usize], children: &[Vec<usize>]) -> Vec<usize> {
    let mut order = Vec::with_capacity(children.len());
    let mut queue: VecDeque<_> = roots.iter().copied().collect();
    while let Some(i) = queue.pop_front() {
        order.push(i);
        queue.extend(children[i].iter().copied());
    }
    order
}

/// The model space transform for a bone in the rest pose.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestBone {
    pub head: [f32; 3],
    pub tail: [f32; 3],
    /// The accumulated rotation as a quaternion in `x, y, z, w` order.
    pub rotation: [f32; 4],
}

impl RestBone {
    /// Transforms a vertex from the bone's local space to model space.
    pub fn bind_position(&self, position: [f32; 3]) -> [f32; 3] {
        let rotation = Quat::from_array(self.rotation);
        (rotation * Vec3::from(position) + Vec3::from(self.head)).to_array()
    }

    /// Transforms a vertex from model space to the bone's local space.
    pub fn unbind_position(&self, position: [f32; 3]) -> [f32; 3] {
        let rotation = Quat::from_array(self.rotation);
        (rotation.inverse() * (Vec3::from(position) - Vec3::from(self.head))).to_array()
    }
}

/// The rest pose transforms with the same ordering as [SkeletonData::bones].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RestPose {
    pub bones: Vec<RestBone>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::Rotation;
    use approx::assert_relative_eq;

    fn bone(parent: u16, length: i16) -> Bone {
        Bone {
            parent,
            unk1: parent * 0x40,
            unk2: [0; 4],
            length,
            unk3: vec![0; 54],
        }
    }

    fn assert_vec_eq(expected: [f32; 3], actual: [f32; 3]) {
        for (e, a) in expected.iter().zip(actual.iter()) {
            assert_relative_eq!(*e, *a, epsilon = 1e-5);
        }
    }

    #[test]
    fn build_hierarchy_out_of_order() {
        // Bone 1 is the root with children 2 and 3.
        // Bone 0 is a child of bone 2.
        let bones = [bone(3, 0), bone(0, 0), bone(2, 10), bone(2, 10)];
        let skeleton = SkeletonData::from_bones(&bones, CharacterProfile::identity()).unwrap();

        assert_eq!(Some(2), skeleton.bones[0].parent_index);
        assert_eq!(None, skeleton.bones[1].parent_index);
        assert_eq!(vec![1, 2, 3, 0], skeleton.traversal_order);

        assert_eq!(2, skeleton.bones[1].child_count);
        assert_eq!(3, skeleton.bones[1].chain_length);
        assert_eq!(1, skeleton.bones[2].chain_length);
        assert_eq!(0, skeleton.bones[3].chain_length);
        assert_eq!("upperbody", skeleton.bones[1].name);
    }

    #[test]
    fn build_empty_skeleton() {
        let skeleton = SkeletonData::from_bones(&[], CharacterProfile::identity()).unwrap();
        assert!(skeleton.bones.is_empty());
    }

    #[test]
    fn build_invalid_parent() {
        let result = SkeletonData::from_bones(&[bone(0, 0), bone(3, 0)], CharacterProfile::identity());
        assert!(matches!(
            result,
            Err(FormatError::InvalidParent {
                bone: 1,
                parent: 2,
                bone_count: 2
            })
        ));
    }

    #[test]
    fn build_multiple_roots() {
        let result = SkeletonData::from_bones(&[bone(0, 0), bone(0, 0)], CharacterProfile::identity());
        assert!(matches!(result, Err(FormatError::RootCount { count: 2 })));
    }

    #[test]
    fn build_cycle() {
        // 1 and 2 are each other's parent.
        let bones = [bone(0, 0), bone(3, 0), bone(2, 0)];
        let result = SkeletonData::from_bones(&bones, CharacterProfile::identity());
        assert!(matches!(result, Err(FormatError::BoneCycle { bone: 1 })));
    }

    #[test]
    fn build_self_parent() {
        let bones = [bone(0, 0), bone(2, 0)];
        let result = SkeletonData::from_bones(&bones, CharacterProfile::identity());
        assert!(matches!(result, Err(FormatError::BoneCycle { bone: 1 })));
    }

    #[test]
    fn rest_pose_chain() {
        // Use names without corrections.
        let bones = [bone(0, 0), bone(1, 256), bone(2, -512)];
        let mut skeleton = SkeletonData::from_bones(&bones, CharacterProfile::identity()).unwrap();
        for (i, bone) in skeleton.bones.iter_mut().enumerate() {
            bone.name = format!("bone_{}", i);
        }

        let frame = FrameData {
            root_offset: [0, 512, 0],
            rotations: vec![
                Rotation::default(),
                // 90 degrees around X.
                Rotation::new(1024, 0, 0),
                Rotation::default(),
            ],
        };
        let pose = skeleton.compute_rest_pose(&frame, 256.0).unwrap();

        assert_vec_eq([0.0, 0.0, 0.0], pose.bones[0].head);
        assert_vec_eq([0.0, 2.0, 0.0], pose.bones[0].tail);

        // +Z rotated 90 degrees around X points along -Y.
        assert_vec_eq([0.0, 2.0, 0.0], pose.bones[1].head);
        assert_vec_eq([0.0, 1.0, 0.0], pose.bones[1].tail);

        // Negative lengths point backwards.
        assert_vec_eq([0.0, 1.0, 0.0], pose.bones[2].head);
        assert_vec_eq([0.0, 3.0, 0.0], pose.bones[2].tail);
    }

    #[test]
    fn rest_pose_named_corrections() {
        let bones = [bone(0, 0), bone(1, 256)];
        let skeleton = SkeletonData::from_bones(&bones, CharacterProfile::identity()).unwrap();
        assert_eq!("upperbody", skeleton.bones[1].name);

        let frame = FrameData {
            root_offset: [0, 0, 0],
            rotations: vec![Rotation::default(); 2],
        };
        let pose = skeleton.compute_rest_pose(&frame, 256.0).unwrap();

        // The upper body is rotated 180 degrees around Y.
        assert_vec_eq([0.0, 0.0, -1.0], pose.bones[1].tail);
    }

    #[test]
    fn rest_pose_frame_bone_count() {
        let skeleton =
            SkeletonData::from_bones(&[bone(0, 0), bone(1, 0)], CharacterProfile::identity())
                .unwrap();
        let frame = FrameData {
            root_offset: [0; 3],
            rotations: vec![Rotation::default()],
        };

        assert!(matches!(
            skeleton.compute_rest_pose(&frame, 256.0),
            Err(FormatError::FrameBoneCount {
                frame: 0,
                count: 1,
                bone_count: 2
            })
        ));
    }

    #[test]
    fn bind_unbind_position() {
        let bone = RestBone {
            head: [1.0, 2.0, 3.0],
            tail: [1.0, 2.0, 4.0],
            rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2).to_array(),
        };

        let bound = bone.bind_position([1.0, 0.0, 0.0]);
        assert_vec_eq([1.0, 3.0, 3.0], bound);
        assert_vec_eq([1.0, 0.0, 0.0], bone.unbind_position(bound));
    }

    #[test]
    fn corrections_for_unknown_names() {
        assert_eq!(Quat::IDENTITY, correction("bone_3"));
    }
}
