//! Assignment of vertices to bones.
//!
//! Each vertex in the file is transformed by exactly one bone.
//! Vertices for the same bone are stored contiguously and described by a [SkinGroup].
//! Exporting edited geometry requires sorting the vertices by their [VertexGroup] using a [SkinPartition].
use mch_lib::formats::mch::{FaceKind, SkinGroup};
use std::convert::TryFrom;

use crate::error::{FormatError, PartitionError};
use crate::mesh_data::FaceData;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    pub vertex_index: usize,
    pub vertex_weight: f32,
}

/// The vertices influenced by a single bone.
/// Only vertices with a weight greater than zero are assigned to the group.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct VertexGroup {
    pub bone_index: usize,
    pub vertex_weights: Vec<VertexWeight>,
}

/// A contiguous range of vertices transformed by a single bone.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinGroupData {
    pub first_vertex: usize,
    pub vertex_count: usize,
    pub bone_index: usize,
}

impl SkinGroupData {
    /// The vertex indices in this group.
    pub fn vertex_indices(&self) -> std::ops::Range<usize> {
        self.first_vertex..self.first_vertex + self.vertex_count
    }

    /// Decodes and validates the skin groups stored in a model.
    pub fn from_raw(
        groups: &[SkinGroup],
        vertex_count: usize,
        bone_count: usize,
    ) -> Result<Vec<Self>, FormatError> {
        groups
            .iter()
            .enumerate()
            .map(|(i, g)| {
                let first_vertex = g.first_vertex as usize;
                let end = first_vertex + g.vertex_count as usize;
                let bone = g.bone as usize;
                if end > vertex_count || bone == 0 || bone > bone_count {
                    Err(FormatError::InvalidSkinGroup {
                        group: i,
                        first_vertex,
                        end,
                        bone,
                        vertex_count,
                        bone_count,
                    })
                } else {
                    Ok(Self {
                        first_vertex,
                        vertex_count: g.vertex_count as usize,
                        bone_index: bone - 1,
                    })
                }
            })
            .collect()
    }

    /// Encodes the group with the bone index stored as one based.
    pub fn to_raw(&self, unk1: u16) -> Result<SkinGroup, FormatError> {
        let to_u16 = |name, count| {
            u16::try_from(count).map_err(|_| FormatError::CountOverflow {
                name,
                count,
                bits: 16,
            })
        };

        Ok(SkinGroup {
            first_vertex: to_u16("first vertex", self.first_vertex)?,
            vertex_count: to_u16("skin group vertex", self.vertex_count)?,
            bone: to_u16("bone", self.bone_index + 1)?,
            unk1,
        })
    }
}

/// Creates a vertex group with a weight of `1.0` for each skin group.
pub fn vertex_groups(skin_groups: &[SkinGroupData]) -> Vec<VertexGroup> {
    skin_groups
        .iter()
        .map(|g| VertexGroup {
            bone_index: g.bone_index,
            vertex_weights: g
                .vertex_indices()
                .map(|vertex_index| VertexWeight {
                    vertex_index,
                    vertex_weight: 1.0,
                })
                .collect(),
        })
        .collect()
}

/// A reordering of the vertices so that each vertex group is contiguous.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinPartition {
    /// The skin groups for the reordered vertices.
    /// Groups are in the same order as the vertex groups with empty groups removed.
    pub skin_groups: Vec<SkinGroupData>,
    /// The new index for each original vertex index.
    pub vertex_remap: Vec<usize>,
}

impl SkinPartition {
    /// Assigns each of the `vertex_count` vertices to a skin group.
    /// Every vertex must have a positive weight in exactly one of the `groups`.
    /// Vertices within a group keep their original relative order.
    pub fn new(
        groups: &[VertexGroup],
        vertex_count: usize,
        bone_count: usize,
    ) -> Result<Self, PartitionError> {
        let mut owners: Vec<Option<usize>> = vec![None; vertex_count];

        for (group_index, group) in groups.iter().enumerate() {
            if group.bone_index >= bone_count {
                return Err(PartitionError::UnknownBone {
                    group: group_index,
                    bone: group.bone_index,
                    bone_count,
                });
            }

            for weight in group.vertex_weights.iter().filter(|w| w.vertex_weight > 0.0) {
                let owner = owners.get_mut(weight.vertex_index).ok_or(
                    PartitionError::VertexOutOfRange {
                        group: group_index,
                        vertex: weight.vertex_index,
                        vertex_count,
                    },
                )?;

                match owner {
                    Some(first) if *first != group_index => {
                        return Err(PartitionError::MultipleGroups {
                            vertex: weight.vertex_index,
                            first: *first,
                            second: group_index,
                        })
                    }
                    _ => *owner = Some(group_index),
                }
            }
        }

        if let Some(vertex) = owners.iter().position(|o| o.is_none()) {
            return Err(PartitionError::UnboundVertex { vertex });
        }

        let mut members = vec![Vec::new(); groups.len()];
        for (vertex, owner) in owners.iter().enumerate() {
            if let Some(group) = owner {
                members[*group].push(vertex);
            }
        }

        let mut skin_groups = Vec::new();
        let mut vertex_remap = vec![0; vertex_count];
        let mut next_index = 0;
        for (group, vertices) in groups.iter().zip(members.iter()) {
            if vertices.is_empty() {
                continue;
            }

            skin_groups.push(SkinGroupData {
                first_vertex: next_index,
                vertex_count: vertices.len(),
                bone_index: group.bone_index,
            });
            for vertex in vertices {
                vertex_remap[*vertex] = next_index;
                next_index += 1;
            }
        }

        Ok(Self {
            skin_groups,
            vertex_remap,
        })
    }

    /// Moves each element of `values` to its new vertex index.
    /// `values` should have one element for each vertex.
    pub fn reorder<T: Clone>(&self, values: &[T]) -> Vec<T> {
        let mut ordered: Vec<_> = values.iter().take(self.vertex_remap.len()).cloned().collect();
        for (old, value) in values.iter().enumerate() {
            if let Some(slot) = self
                .vertex_remap
                .get(old)
                .and_then(|new| ordered.get_mut(*new))
            {
                *slot = value.clone();
            }
        }
        ordered
    }

    /// Updates the vertex indices of `faces` to the new vertex order.
    /// This includes the unused fourth corner of triangles.
    /// Indices without a corresponding vertex are left unchanged.
    pub fn remap_faces(&self, faces: &mut [FaceData]) {
        for face in faces {
            for index in face.vertex_indices.iter_mut() {
                if let Some(new) = self.vertex_remap.get(*index) {
                    *index = *new;
                }
            }

            if face.kind != FaceKind::Triangle {
                continue;
            }

            let unused = &mut face.attributes.unused_vertex;
            if let Some(new) = self
                .vertex_remap
                .get(*unused as usize)
                .and_then(|i| u16::try_from(*i).ok())
            {
                *unused = new;
            }
        }
    }
}
