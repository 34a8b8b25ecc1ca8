//! Decoded vertex positions, faces, and texture coordinates.
//!
//! Face corners are stored in the file in the order `v2, v3, v1, v4`.
//! [FaceData] uses the canonical order `v1, v2, v3, v4` instead.
//! UVs are converted to coordinates on a combined texture atlas described by an [AtlasLayout]
//! and deduplicated so faces can share UVs by index.
use glam::Vec3;
use mch_lib::formats::mch::{Face, FaceKind, Uv, Vertex};
use std::convert::TryFrom;

use crate::error::FormatError;

mod uv_data;
pub use uv_data::{dedup_uvs, normalize_uvs, AtlasLayout, UvData, NORMALIZED_UV_SCALE};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The bytes after the tag of newly created faces.
pub const DEFAULT_FACE_UNK1: [u8; 8] = [0x44, 0, 0, 0, 1, 0, 0, 0];

/// The flat vertex color of newly created faces.
pub const DEFAULT_FACE_COLOR: u32 = 0x00999999;

/// The scale applied to unit face normals when encoding.
const NORMAL_SCALE: f32 = 256.0;

/// A vertex position in the local space of the bone for its skin group.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexData {
    pub position: [f32; 3],
    pub unk1: u16,
}

/// Face values not needed to reconstruct the geometry.
/// These are preserved so that unedited faces encode to identical bytes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceAttributes {
    pub unk1: [u8; 8],
    /// The face normal scaled by 256 as `x, y, z, x`.
    pub normals: [i16; 4],
    pub colors: [u32; 4],
    pub unk2: u16,
    pub unk3: [u8; 8],
    /// The fourth vertex index for triangles.
    pub unused_vertex: u16,
    /// The fourth UV for triangles.
    pub unused_uv: Uv,
}

impl Default for FaceAttributes {
    fn default() -> Self {
        Self {
            unk1: DEFAULT_FACE_UNK1,
            normals: [0; 4],
            colors: [DEFAULT_FACE_COLOR; 4],
            unk2: 0,
            unk3: [0; 8],
            unused_vertex: 0,
            unused_uv: Uv::default(),
        }
    }
}

/// A triangle or quad with corners in canonical order.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FaceData {
    pub kind: FaceKind,
    /// Indices into [MeshData::vertices] with one element for each corner.
    pub vertex_indices: Vec<usize>,
    /// Indices into [MeshData::uvs] with one element for each corner.
    pub uv_indices: Vec<usize>,
    pub texture_group: u16,
    pub attributes: FaceAttributes,
}

impl FaceData {
    pub fn triangle(vertex_indices: [usize; 3], uv_indices: [usize; 3], texture_group: u16) -> Self {
        Self {
            kind: FaceKind::Triangle,
            vertex_indices: vertex_indices.to_vec(),
            uv_indices: uv_indices.to_vec(),
            texture_group,
            attributes: FaceAttributes::default(),
        }
    }

    pub fn quad(vertex_indices: [usize; 4], uv_indices: [usize; 4], texture_group: u16) -> Self {
        Self {
            kind: FaceKind::Quad,
            vertex_indices: vertex_indices.to_vec(),
            uv_indices: uv_indices.to_vec(),
            texture_group,
            attributes: FaceAttributes::default(),
        }
    }
}

/// The decoded geometry for a model.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub vertices: Vec<VertexData>,
    /// Unique UVs on the texture atlas in order of first use.
    pub uvs: Vec<UvData>,
    pub faces: Vec<FaceData>,
}

impl MeshData {
    /// Decodes the vertices and faces of a model.
    /// Positions are divided by `divisor`.
    pub fn from_raw(
        vertices: &[Vertex],
        faces: &[Face],
        divisor: f32,
        atlas: &AtlasLayout,
    ) -> Result<Self, FormatError> {
        let vertices: Vec<_> = vertices
            .iter()
            .map(|v| VertexData {
                position: [
                    v.x as f32 / divisor,
                    v.y as f32 / divisor,
                    v.z as f32 / divisor,
                ],
                unk1: v.unk1,
            })
            .collect();

        // Triangles repeat their last corner so every face has 4 corners.
        let mut corners = Vec::with_capacity(faces.len() * 4);
        for face in faces {
            let uvs = to_canonical_order(face.uvs);
            let count = face.kind.corner_count();
            corners.extend(uvs[..count].iter().map(|uv| atlas.to_atlas(*uv, face.texture_group)));
            if count < 4 {
                corners.push(atlas.to_atlas(uvs[count - 1], face.texture_group));
            }
        }
        let (uvs, corner_indices) = dedup_uvs(&corners);

        let faces = faces
            .iter()
            .enumerate()
            .map(|(i, face)| {
                let count = face.kind.corner_count();
                let vertex_indices = to_canonical_order(face.vertex_indices)[..count]
                    .iter()
                    .map(|index| {
                        let index = *index as usize;
                        if index < vertices.len() {
                            Ok(index)
                        } else {
                            Err(FormatError::VertexIndexOutOfRange {
                                face: i,
                                index,
                                vertex_count: vertices.len(),
                            })
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                let (unused_vertex, unused_uv) = match face.kind {
                    FaceKind::Triangle => (face.vertex_indices[3], face.uvs[3]),
                    FaceKind::Quad => (0, Uv::default()),
                };

                Ok(FaceData {
                    kind: face.kind,
                    vertex_indices,
                    uv_indices: corner_indices[i * 4..i * 4 + count].to_vec(),
                    texture_group: face.texture_group,
                    attributes: FaceAttributes {
                        unk1: face.unk1,
                        normals: face.normals,
                        colors: face.colors,
                        unk2: face.unk2,
                        unk3: face.unk3,
                        unused_vertex,
                        unused_uv,
                    },
                })
            })
            .collect::<Result<Vec<_>, FormatError>>()?;

        Ok(Self {
            vertices,
            uvs,
            faces,
        })
    }

    /// Encodes the vertices and faces in their current order.
    /// Positions are multiplied by `divisor` and rounded down.
    pub fn to_raw(
        &self,
        divisor: f32,
        atlas: &AtlasLayout,
    ) -> Result<(Vec<Vertex>, Vec<Face>), FormatError> {
        let vertices = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let [x, y, z] = v.position;
                Ok(Vertex {
                    x: encode_position(i, x, divisor)?,
                    y: encode_position(i, y, divisor)?,
                    z: encode_position(i, z, divisor)?,
                    unk1: v.unk1,
                })
            })
            .collect::<Result<Vec<_>, FormatError>>()?;

        let faces = self
            .faces
            .iter()
            .enumerate()
            .map(|(i, face)| self.encode_face(i, face, atlas))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((vertices, faces))
    }

    fn encode_face(
        &self,
        index: usize,
        face: &FaceData,
        atlas: &AtlasLayout,
    ) -> Result<Face, FormatError> {
        let expected = face.kind.corner_count();
        for count in [face.vertex_indices.len(), face.uv_indices.len()] {
            if count != expected {
                return Err(FormatError::CornerCount {
                    face: index,
                    kind: face.kind,
                    count,
                    expected,
                });
            }
        }

        let mut vertex_indices = [face.attributes.unused_vertex; 4];
        for (corner, vertex) in vertex_indices.iter_mut().zip(face.vertex_indices.iter()) {
            if *vertex >= self.vertices.len() {
                return Err(FormatError::VertexIndexOutOfRange {
                    face: index,
                    index: *vertex,
                    vertex_count: self.vertices.len(),
                });
            }
            *corner = u16::try_from(*vertex).map_err(|_| FormatError::CountOverflow {
                name: "vertex index",
                count: *vertex,
                bits: 16,
            })?;
        }

        let mut uvs = [face.attributes.unused_uv; 4];
        for (corner, uv_index) in uvs.iter_mut().zip(face.uv_indices.iter()) {
            let uv = self
                .uvs
                .get(*uv_index)
                .ok_or(FormatError::UvIndexOutOfRange {
                    face: index,
                    index: *uv_index,
                    uv_count: self.uvs.len(),
                })?;
            *corner = atlas
                .to_local(*uv, face.texture_group)
                .ok_or(FormatError::UvOutOfCell {
                    face: index,
                    u: uv.u,
                    v: uv.v,
                    texture_group: face.texture_group,
                })?;
        }

        let attributes = &face.attributes;
        Ok(Face {
            kind: face.kind,
            unk1: attributes.unk1,
            vertex_indices: to_file_order(vertex_indices),
            normals: attributes.normals,
            colors: attributes.colors,
            uvs: to_file_order(uvs),
            unk2: attributes.unk2,
            texture_group: face.texture_group,
            unk3: attributes.unk3,
        })
    }

    /// Recalculates the stored normal for each face from the first three corners.
    /// Degenerate faces use a normal of zero.
    pub fn regenerate_normals(&mut self) {
        let normals: Vec<_> = self.faces.iter().map(|f| self.face_normal(f)).collect();
        for (face, normal) in self.faces.iter_mut().zip(normals) {
            face.attributes.normals = normal;
        }
    }

    fn face_normal(&self, face: &FaceData) -> [i16; 4] {
        let position = |corner: usize| {
            face.vertex_indices
                .get(corner)
                .and_then(|i| self.vertices.get(*i))
                .map(|v| Vec3::from(v.position))
                .unwrap_or(Vec3::ZERO)
        };

        let (a, b, c) = (position(0), position(1), position(2));
        let normal = (b - a).cross(c - a).normalize_or_zero() * NORMAL_SCALE;

        let x = normal.x.floor() as i16;
        let y = normal.y.floor() as i16;
        let z = normal.z.floor() as i16;
        [x, y, z, x]
    }

    /// The UVs converted to normalized coordinates on the atlas rows used by the faces.
    /// See [normalize_uvs].
    pub fn normalized_uvs(&self, atlas: &AtlasLayout, flip_v: bool) -> Vec<[f32; 2]> {
        let height = atlas.used_height(self.faces.iter().map(|f| f.texture_group));
        normalize_uvs(&self.uvs, height, flip_v)
    }
}

fn encode_position(vertex: usize, value: f32, divisor: f32) -> Result<i16, FormatError> {
    let scaled = (value * divisor).floor();
    if scaled >= i16::MIN as f32 && scaled <= i16::MAX as f32 {
        Ok(scaled as i16)
    } else {
        Err(FormatError::PositionOutOfRange { vertex, value })
    }
}

/// Converts corners in the file order `v2, v3, v1, v4` to `v1, v2, v3, v4`.
fn to_canonical_order<T: Copy>(corners: [T; 4]) -> [T; 4] {
    [corners[2], corners[0], corners[1], corners[3]]
}

/// Converts corners in the order `v1, v2, v3, v4` to the file order `v2, v3, v1, v4`.
fn to_file_order<T: Copy>(corners: [T; 4]) -> [T; 4] {
    [corners[1], corners[2], corners[0], corners[3]]
}
