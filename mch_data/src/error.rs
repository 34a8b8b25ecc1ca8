//! Error types for decoding and encoding.
use std::path::PathBuf;

use mch_lib::formats::mch::FaceKind;
use thiserror::Error;

/// Errors for data that cannot be decoded or does not fit the binary format.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A count is too large for the field that stores it.
    #[error("{name} count {count} does not fit in {bits} bits.")]
    CountOverflow {
        name: &'static str,
        count: usize,
        bits: u32,
    },

    /// A region offset is too large to store in the header.
    #[error("The {name} offset does not fit in 32 bits.")]
    OffsetOverflow { name: &'static str },

    #[error(
        "Vertex index {index} for face {face} is out of range for a mesh with {vertex_count} vertices."
    )]
    VertexIndexOutOfRange {
        face: usize,
        index: usize,
        vertex_count: usize,
    },

    #[error("UV index {index} for face {face} is out of range for {uv_count} UVs.")]
    UvIndexOutOfRange {
        face: usize,
        index: usize,
        uv_count: usize,
    },

    #[error("Face {face} has {count} corners, but a {kind:?} has {expected} corners.")]
    CornerCount {
        face: usize,
        kind: FaceKind,
        count: usize,
        expected: usize,
    },

    #[error("Position {value} for vertex {vertex} does not fit in 16 bits after scaling.")]
    PositionOutOfRange { vertex: usize, value: f32 },

    #[error("UV ({u}, {v}) for face {face} is outside the atlas cell for texture group {texture_group}.")]
    UvOutOfCell {
        face: usize,
        u: u32,
        v: u32,
        texture_group: u16,
    },

    #[error("Parent index {parent} for bone {bone} is out of range for {bone_count} bones.")]
    InvalidParent {
        bone: usize,
        parent: usize,
        bone_count: usize,
    },

    #[error("Expected a single root bone but found {count}.")]
    RootCount { count: usize },

    #[error("Bone {bone} is part of a cycle in the bone hierarchy.")]
    BoneCycle { bone: usize },

    #[error(
        "Skin group {group} with vertices {first_vertex}..{end} and bone {bone} does not match \
         a mesh with {vertex_count} vertices and {bone_count} bones."
    )]
    InvalidSkinGroup {
        group: usize,
        first_vertex: usize,
        end: usize,
        bone: usize,
        vertex_count: usize,
        bone_count: usize,
    },

    #[error("Frame {frame} has {count} rotations, but the animation has {bone_count} bones.")]
    FrameBoneCount {
        frame: usize,
        count: usize,
        bone_count: usize,
    },

    /// An error occurred while reading the binary data.
    /// This includes unrecognized face tags.
    #[error(transparent)]
    BinRead(#[from] binread::Error),

    /// An error occurred while writing data.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// No bone naming table exists for the character.
/// Bones can still be named using [CharacterProfile::identity](crate::skel_data::CharacterProfile::identity).
#[derive(Debug, Error)]
#[error("No bone naming table for character {0:?}.")]
pub struct UnknownCharacterError(pub String);

/// Errors while assigning vertices to skin groups.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("Vertex {vertex} is not assigned to any vertex group.")]
    UnboundVertex { vertex: usize },

    #[error("Vertex {vertex} is assigned to vertex groups {first} and {second}.")]
    MultipleGroups {
        vertex: usize,
        first: usize,
        second: usize,
    },

    #[error("Vertex group {group} references vertex {vertex}, but the mesh has {vertex_count} vertices.")]
    VertexOutOfRange {
        group: usize,
        vertex: usize,
        vertex_count: usize,
    },

    #[error("Vertex group {group} uses bone {bone}, but the skeleton has {bone_count} bones.")]
    UnknownBone {
        group: usize,
        bone: usize,
        bone_count: usize,
    },
}

/// The companion animation archive does not exist.
/// Models can still be loaded without the additional animations.
#[derive(Debug, Error)]
#[error("Animation archive {path:?} was not found.")]
pub struct ArchiveNotFoundError {
    pub path: PathBuf,
}

/// Errors while loading animations from an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    NotFound(#[from] ArchiveNotFoundError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Errors while exporting an edited model.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Partition(#[from] PartitionError),
}
