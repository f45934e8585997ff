//! glTF document model and container loading
//!
//! A [`Document`] is the parsed JSON plus every buffer, fully loaded. It is
//! immutable once built; all later stages only read from it.

mod loader;
pub mod schema;
mod wire;

pub use loader::{
    load_document, parse_glb, parse_gltf_json, read_gltf, resolve_uri, BufferSource, GltfFile,
    GLB_CHUNK_BIN, GLB_CHUNK_JSON, GLB_HEADER_LEN, GLB_MAGIC, GLB_VERSION,
};
pub use schema::Gltf;
pub use wire::{AccessorType, ComponentType, Interpolation, PrimitiveMode};

use std::path::Path;

use crate::error::{ConvertError, Result};
use schema::{Accessor, Animation, BufferView, Material, Mesh, Node, Skin};

/// Parsed glTF JSON plus resolved buffer bytes
#[derive(Debug, Clone, Default)]
pub struct Document {
    gltf: Gltf,
    buffers: Vec<Vec<u8>>,
}

impl Document {
    pub fn new(gltf: Gltf, buffers: Vec<Vec<u8>>) -> Self {
        Self { gltf, buffers }
    }

    /// Parse from memory, detecting GLB by its magic number
    ///
    /// External buffer URIs are resolved against `base_dir`.
    pub fn from_slice(data: &[u8], base_dir: &Path) -> Result<Self> {
        let is_glb = data.len() >= 4 && data[..4] == GLB_MAGIC.to_le_bytes();
        let file = if is_glb {
            parse_glb(data, base_dir)?
        } else {
            parse_gltf_json(data, base_dir)?
        };
        file.into_document()
    }

    pub fn gltf(&self) -> &Gltf {
        &self.gltf
    }

    pub fn buffer(&self, index: usize) -> Result<&[u8]> {
        self.buffers
            .get(index)
            .map(Vec::as_slice)
            .ok_or_else(|| ConvertError::out_of_range("buffer", index))
    }

    pub fn accessor(&self, index: usize) -> Result<&Accessor> {
        self.gltf
            .accessors
            .get(index)
            .ok_or_else(|| ConvertError::out_of_range("accessor", index))
    }

    pub fn buffer_view(&self, index: usize) -> Result<&BufferView> {
        self.gltf
            .buffer_views
            .get(index)
            .ok_or_else(|| ConvertError::out_of_range("buffer view", index))
    }

    pub fn node(&self, index: usize) -> Result<&Node> {
        self.gltf
            .nodes
            .get(index)
            .ok_or_else(|| ConvertError::out_of_range("node", index))
    }

    pub fn mesh(&self, index: usize) -> Result<&Mesh> {
        self.gltf
            .meshes
            .get(index)
            .ok_or_else(|| ConvertError::out_of_range("mesh", index))
    }

    pub fn skin(&self, index: usize) -> Result<&Skin> {
        self.gltf
            .skins
            .get(index)
            .ok_or_else(|| ConvertError::out_of_range("skin", index))
    }

    pub fn animation(&self, index: usize) -> Result<&Animation> {
        self.gltf
            .animations
            .get(index)
            .ok_or_else(|| ConvertError::out_of_range("animation", index))
    }

    pub fn material(&self, index: usize) -> Result<&Material> {
        self.gltf
            .materials
            .get(index)
            .ok_or_else(|| ConvertError::out_of_range("material", index))
    }

    /// Bytes covered by a buffer view
    pub fn view_bytes(&self, index: usize) -> Result<&[u8]> {
        let view = self.buffer_view(index)?;
        let buffer = self.buffer(view.buffer)?;
        view.byte_offset
            .checked_add(view.byte_length)
            .and_then(|end| buffer.get(view.byte_offset..end))
            .ok_or(ConvertError::AccessorOutOfBounds {
                buffer: view.buffer,
                offset: view.byte_offset,
                size: view.byte_length,
                length: buffer.len(),
            })
    }
}
