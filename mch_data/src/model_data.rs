//! Decoded field character models.
//!
//! A [ModelData] combines the mesh, skeleton, skin groups, and animations for a single [Mch] file.
//! Exporting replaces the geometry and skin groups of the original file
//! and keeps the remaining regions unchanged.
use mch_lib::formats::mch::{FaceKind, MchModel};
use mch_lib::{CountWidth, Mch};
use std::path::Path;
use tracing::{debug, warn};

use crate::anim_data::AnimationData;
use crate::error::{ArchiveError, ExportError, FormatError};
use crate::header_data::{synthesize_header, RegionCounts};
use crate::mesh_data::{AtlasLayout, MeshData, VertexData};
use crate::one_data::read_archive_animations;
use crate::skel_data::{CharacterProfile, RestBone, RestPose, SkeletonData};
use crate::skin_data::{vertex_groups, SkinGroupData, SkinPartition, VertexGroup};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Layout differences between releases of the game data.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRevision {
    pub atlas: AtlasLayout,
    pub anim_count_width: CountWidth,
}

impl FormatRevision {
    /// Stacked texture bands and 4 byte animation counts.
    pub const LEGACY: Self = Self {
        atlas: AtlasLayout::LEGACY,
        anim_count_width: CountWidth::U32,
    };

    /// A grid of texture cells and 2 byte animation counts.
    pub const CURRENT: Self = Self {
        atlas: AtlasLayout::GRID,
        anim_count_width: CountWidth::U16,
    };
}

impl Default for FormatRevision {
    fn default() -> Self {
        Self::CURRENT
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelOptions {
    pub revision: FormatRevision,
    /// The number of vertex units in one unit of the decoded positions.
    /// This is not stored in the file.
    pub vertex_divisor: f32,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            revision: FormatRevision::default(),
            vertex_divisor: 256.0,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportOptions {
    /// Recalculate face normals from the vertex positions instead of keeping the original values.
    pub regenerate_normals: bool,
    /// The mesh positions are in model space like the values from [ModelData::rest_positions].
    /// Each vertex is transformed back into the local space of the bone for its new skin group.
    /// This has no effect for models without a rest pose.
    pub rest_space_positions: bool,
}

// Rotating back into bone space is only accurate to a small fraction of a vertex unit.
const UNBIND_TOLERANCE: f32 = 1e-3;

/// The first four characters of the file name like "d000" for "d000.mch".
pub fn character_id<P: AsRef<Path>>(path: P) -> Option<String> {
    let name = path.as_ref().file_name()?.to_str()?;
    let id: String = name.chars().take(4).collect();
    if id.chars().count() == 4 {
        Some(id)
    } else {
        None
    }
}

/// The decoded data for a field character model.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    /// The character id like "d000".
    pub character: String,
    pub options: ModelOptions,
    pub mesh: MeshData,
    pub skeleton: SkeletonData,
    /// The rest pose from the first frame of the first embedded animation.
    pub rest_pose: Option<RestPose>,
    pub skin_groups: Vec<SkinGroupData>,
    /// The animations embedded in the model file.
    pub animations: Vec<AnimationData>,
    /// The animations for this character from a [One](mch_lib::One) archive.
    pub archive_animations: Vec<AnimationData>,
}

impl ModelData {
    /// Reads and decodes the model at `path`.
    /// The character is identified from the file name.
    pub fn from_file<P: AsRef<Path>>(path: P, options: &ModelOptions) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let mch = Mch::from_file_with_count_width(path, options.revision.anim_count_width)?;
        let character = character_id(path).unwrap_or_default();
        Self::from_mch(&mch, &character, options)
    }

    /// Decodes `mch` using the bone names for `character`.
    /// Unknown characters use the names from [CharacterProfile::identity].
    pub fn from_mch(mch: &Mch, character: &str, options: &ModelOptions) -> Result<Self, FormatError> {
        let model = &mch.model;

        let profile = CharacterProfile::lookup(character).unwrap_or_else(|e| {
            warn!("{} Using default bone names.", e);
            CharacterProfile::identity()
        });

        let mesh = MeshData::from_raw(
            &model.vertices,
            &model.faces,
            options.vertex_divisor,
            &options.revision.atlas,
        )?;
        let skeleton = SkeletonData::from_bones(&model.bones, profile)?;
        let skin_groups =
            SkinGroupData::from_raw(&model.skin_groups, mesh.vertices.len(), skeleton.bones.len())?;

        let animations: Vec<_> = model
            .animations
            .animations
            .iter()
            .map(AnimationData::from)
            .collect();

        let rest_pose = animations
            .first()
            .and_then(|a| a.frames.first())
            .map(|frame| skeleton.compute_rest_pose(frame, options.vertex_divisor))
            .transpose()?;

        debug!(
            "Decoded {:?} with {} bones, {} vertices, {} faces, {} UVs, {} skin groups, and {} animations.",
            character,
            skeleton.bones.len(),
            mesh.vertices.len(),
            mesh.faces.len(),
            mesh.uvs.len(),
            skin_groups.len(),
            animations.len()
        );

        Ok(Self {
            character: character.to_string(),
            options: *options,
            mesh,
            skeleton,
            rest_pose,
            skin_groups,
            animations,
            archive_animations: Vec::new(),
        })
    }

    /// Loads the animations for this character from the archive at `path`.
    /// A missing archive is not an error and leaves the animations unchanged.
    pub fn load_archive_animations<P: AsRef<Path>>(&mut self, path: P) -> Result<(), FormatError> {
        match read_archive_animations(
            path,
            &self.character,
            self.options.revision.anim_count_width,
        ) {
            Ok(animations) => {
                self.archive_animations = animations;
                Ok(())
            }
            Err(ArchiveError::NotFound(e)) => {
                warn!("{} Skipping additional animations.", e);
                Ok(())
            }
            Err(ArchiveError::Format(e)) => Err(e),
        }
    }

    /// A vertex group with a weight of `1.0` for the vertices in each skin group.
    pub fn vertex_groups(&self) -> Vec<VertexGroup> {
        vertex_groups(&self.skin_groups)
    }

    /// The vertex positions transformed by the rest pose of their bone.
    /// Vertices are stored relative to their bone, so this gives the positions in model space.
    pub fn rest_positions(&self) -> Vec<[f32; 3]> {
        let mut positions: Vec<_> = self.mesh.vertices.iter().map(|v| v.position).collect();

        if let Some(rest_pose) = &self.rest_pose {
            for group in &self.skin_groups {
                if let Some(bone) = rest_pose.bones.get(group.bone_index) {
                    for i in group.vertex_indices() {
                        if let Some(position) = positions.get_mut(i) {
                            *position = bone.bind_position(*position);
                        }
                    }
                }
            }
        }

        positions
    }

    /// Encodes the mesh as a new model based on `original`.
    ///
    /// Vertices are sorted so that each of the `groups` is contiguous.
    /// Face indices are updated to match the new vertex order.
    /// The remaining regions are copied from `original`.
    pub fn to_mch(
        &self,
        original: &Mch,
        groups: &[VertexGroup],
        options: &ExportOptions,
    ) -> Result<Mch, ExportError> {
        let partition =
            SkinPartition::new(groups, self.mesh.vertices.len(), self.skeleton.bones.len())?;

        let mut mesh = MeshData {
            vertices: partition.reorder(&self.mesh.vertices),
            uvs: self.mesh.uvs.clone(),
            faces: self.mesh.faces.clone(),
        };
        partition.remap_faces(&mut mesh.faces);

        if options.rest_space_positions {
            match &self.rest_pose {
                Some(rest_pose) => unbind_vertices(
                    &mut mesh.vertices,
                    &partition.skin_groups,
                    rest_pose,
                    self.options.vertex_divisor,
                ),
                None => warn!(
                    "{:?} has no rest pose. Exporting positions without transforming them.",
                    self.character
                ),
            }
        }

        if options.regenerate_normals {
            mesh.regenerate_normals();
        }

        let (vertices, faces) =
            mesh.to_raw(self.options.vertex_divisor, &self.options.revision.atlas)?;

        // Unknown values are only kept if the group still uses the same bone.
        let original_groups = &original.model.skin_groups;
        let skin_groups = partition
            .skin_groups
            .iter()
            .enumerate()
            .map(|(i, group)| {
                let unk1 = original_groups
                    .get(i)
                    .filter(|g| g.bone as usize == group.bone_index + 1)
                    .map(|g| g.unk1)
                    .unwrap_or(0);
                group.to_raw(unk1)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let triangle_count = faces
            .iter()
            .filter(|f| f.kind == FaceKind::Triangle)
            .count();
        let header = synthesize_header(
            &original.model.header,
            RegionCounts {
                vertex_count: vertices.len(),
                triangle_count,
                quad_count: faces.len() - triangle_count,
                skin_group_count: skin_groups.len(),
            },
        )?;

        debug!(
            "Exporting {} vertices, {} faces, and {} skin groups with animations at {:#x}.",
            vertices.len(),
            faces.len(),
            skin_groups.len(),
            header.anim_offset
        );

        Ok(Mch {
            texture_offsets: original.texture_offsets.clone(),
            model_address: original.model_address,
            texture_data: original.texture_data.clone(),
            model: MchModel {
                header,
                bones: original.model.bones.clone(),
                vertices,
                tex_anim: original.model.tex_anim.clone(),
                faces,
                unk1: original.model.unk1.clone(),
                skin_groups,
                animations: original.model.animations.clone(),
                trailer: original.model.trailer.clone(),
            },
        })
    }
}

/// Moves each vertex in `groups` from model space to the local space of the group's rest bone.
fn unbind_vertices(
    vertices: &mut [VertexData],
    groups: &[SkinGroupData],
    rest_pose: &RestPose,
    divisor: f32,
) {
    for group in groups {
        let bone = match rest_pose.bones.get(group.bone_index) {
            Some(bone) => bone,
            None => {
                warn!("No rest pose for bone {}.", group.bone_index);
                continue;
            }
        };

        for i in group.vertex_indices() {
            if let Some(vertex) = vertices.get_mut(i) {
                vertex.position = unbind_snapped(bone, vertex.position, divisor);
            }
        }
    }
}

/// Unbinds `position` and removes the rounding error for values that land on a whole vertex unit.
/// Encoding rounds down, so an error of `-1e-7` would otherwise lose an entire unit.
fn unbind_snapped(bone: &RestBone, position: [f32; 3], divisor: f32) -> [f32; 3] {
    bone.unbind_position(position).map(|value| {
        let units = value * divisor;
        let rounded = units.round();
        if (units - rounded).abs() < UNBIND_TOLERANCE {
            rounded / divisor
        } else {
            value
        }
    })
}
