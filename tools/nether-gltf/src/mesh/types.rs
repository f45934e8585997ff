//! Engine-agnostic mesh description

use serde::Serialize;

use crate::document::{ComponentType, PrimitiveMode};
use crate::geometry::{Semantic, VertexFormat};

/// A byte range of the combined mesh buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BufferRange {
    pub offset: usize,
    pub length: usize,
    /// Bytes per element
    pub stride: usize,
    /// Number of elements
    pub count: usize,
}

/// One attribute inside an interleaved vertex bundle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexElement {
    pub semantic: Semantic,
    pub format: VertexFormat,
    /// Byte offset inside one vertex
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VertexBundle {
    pub view: BufferRange,
    pub attributes: Vec<VertexElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexBuffer {
    pub view: BufferRange,
    /// U16 or U32
    pub format: ComponentType,
}

/// One primitive of the packed mesh
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubMesh {
    pub primitive_mode: PrimitiveMode,
    pub vertex_bundle: usize,
    pub indices: Option<IndexBuffer>,
    pub material: Option<usize>,
    pub joint_map_index: Option<usize>,
}

/// Displacement buffers of one target, parallel to [`SubMeshMorph::attributes`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MorphTargetViews {
    pub displacements: Vec<BufferRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubMeshMorph {
    pub attributes: Vec<Semantic>,
    pub targets: Vec<MorphTargetViews>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MorphStruct {
    /// Parallel to [`MeshStruct::primitives`]; `None` for primitives without morphs
    pub sub_meshes: Vec<Option<SubMeshMorph>>,
    /// Default weights, one per target
    pub weights: Vec<f32>,
    pub target_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshStruct {
    pub primitives: Vec<SubMesh>,
    pub vertex_bundles: Vec<VertexBundle>,
    pub min_position: [f64; 3],
    pub max_position: [f64; 3],
    pub joint_maps: Vec<Vec<u32>>,
    pub morph: Option<MorphStruct>,
}

/// Mesh description plus the buffer its ranges point into
#[derive(Debug, Clone, PartialEq)]
pub struct PackedMesh {
    pub mesh: MeshStruct,
    pub data: Vec<u8>,
}
