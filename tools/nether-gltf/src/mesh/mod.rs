//! Mesh packer (processed geometry -> interleaved buffers)

mod blob;
mod packing;
mod types;

pub use blob::BufferBlob;
pub use packing::pack_mesh;
pub use types::{
    BufferRange, IndexBuffer, MeshStruct, MorphStruct, MorphTargetViews, PackedMesh, SubMesh,
    SubMeshMorph, VertexBundle, VertexElement,
};
