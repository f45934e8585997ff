//! Per-primitive geometry extraction
//!
//! Turns every glTF mesh into a [`ProcessedMesh`]: one [`Geometry`] per
//! primitive with decoded indices, vertex attributes (tightly packed, in their
//! glTF storage type), morph displacements, bounds and joint palettes.

pub mod draco;
mod extract;
pub mod ops;
mod skinning;

pub use draco::{DracoAttributeRequest, DracoDecoder, DracoOutput, DracoRequest};
pub use extract::{process_mesh, ExtractContext};
pub use ops::{triangle_list, DefaultGeometryOps, GeometryOps};

use serde::{Serialize, Serializer};
use std::fmt;

use crate::accessor::{normalize_component, read_component};
use crate::document::{ComponentType, PrimitiveMode};

/// Canonical vertex attribute semantic
///
/// The variant order is the interleave order used by the mesh packer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Semantic {
    Position,
    Normal,
    Tangent,
    Color(u32),
    TexCoord(u32),
    Joints(u32),
    Weights(u32),
    /// Application specific (`_FOO`) or unknown, kept verbatim
    Custom(String),
}

impl Semantic {
    pub fn parse(name: &str) -> Self {
        match name {
            "POSITION" => return Self::Position,
            "NORMAL" => return Self::Normal,
            "TANGENT" => return Self::Tangent,
            _ => {}
        }
        let indexed = |prefix: &str| {
            name.strip_prefix(prefix)
                .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|n| n.parse::<u32>().ok())
        };
        if let Some(n) = indexed("COLOR_") {
            Self::Color(n)
        } else if let Some(n) = indexed("TEXCOORD_") {
            Self::TexCoord(n)
        } else if let Some(n) = indexed("JOINTS_") {
            Self::Joints(n)
        } else if let Some(n) = indexed("WEIGHTS_") {
            Self::Weights(n)
        } else {
            Self::Custom(name.to_string())
        }
    }

    /// Set index (`n` of `TEXCOORD_n`), 0 for unindexed semantics
    pub fn set_index(&self) -> u32 {
        match self {
            Self::Color(n) | Self::TexCoord(n) | Self::Joints(n) | Self::Weights(n) => *n,
            _ => 0,
        }
    }
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position => f.write_str("POSITION"),
            Self::Normal => f.write_str("NORMAL"),
            Self::Tangent => f.write_str("TANGENT"),
            Self::Color(n) => write!(f, "COLOR_{n}"),
            Self::TexCoord(n) => write!(f, "TEXCOORD_{n}"),
            Self::Joints(n) => write!(f, "JOINTS_{n}"),
            Self::Weights(n) => write!(f, "WEIGHTS_{n}"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

impl Serialize for Semantic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Storage format of one vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexFormat {
    pub component_type: ComponentType,
    pub components: usize,
    pub normalized: bool,
}

impl VertexFormat {
    pub const fn f32(components: usize) -> Self {
        Self {
            component_type: ComponentType::F32,
            components,
            normalized: false,
        }
    }

    /// Bytes per vertex
    pub fn size(&self) -> usize {
        self.component_type.size() * self.components
    }
}

/// One vertex stream of a geometry
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttribute {
    pub semantic: Semantic,
    pub format: VertexFormat,
    /// Tightly packed little-endian data
    pub data: Vec<u8>,
    /// Per morph target displacements, `components` floats per vertex
    pub morphs: Option<Vec<Vec<f32>>>,
}

impl VertexAttribute {
    pub fn from_f32(semantic: Semantic, components: usize, values: &[f32]) -> Self {
        Self {
            semantic,
            format: VertexFormat::f32(components),
            data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            morphs: None,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.format.size().max(1)
    }

    /// Component values cast to f32, normalized when the format says so
    pub fn to_f32(&self) -> Vec<f32> {
        let ty = self.format.component_type;
        self.data
            .chunks_exact(ty.size())
            .map(|c| {
                let value = read_component(c, ty);
                if self.format.normalized {
                    normalize_component(value, ty) as f32
                } else {
                    value as f32
                }
            })
            .collect()
    }

    /// Component values as integers (joint ids)
    pub fn to_u32(&self) -> Vec<u32> {
        let ty = self.format.component_type;
        self.data
            .chunks_exact(ty.size())
            .map(|c| read_component(c, ty) as u32)
            .collect()
    }
}

/// Index buffer of a geometry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indices {
    /// glTF storage type: U8, U16 or U32
    pub format: ComponentType,
    pub values: Vec<u32>,
}

/// One primitive after extraction
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub primitive_mode: PrimitiveMode,
    pub vertex_count: usize,
    pub indices: Option<Indices>,
    /// Sorted by semantic
    pub attributes: Vec<VertexAttribute>,
    /// Entry of [`ProcessedMesh::joint_maps`] this geometry's joints index into
    pub joint_map_index: Option<usize>,
}

impl Geometry {
    pub fn attribute(&self, semantic: &Semantic) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| &a.semantic == semantic)
    }

    pub fn attribute_mut(&mut self, semantic: &Semantic) -> Option<&mut VertexAttribute> {
        self.attributes.iter_mut().find(|a| &a.semantic == semantic)
    }

    pub fn remove_attribute(&mut self, semantic: &Semantic) -> Option<VertexAttribute> {
        let index = self.attributes.iter().position(|a| &a.semantic == semantic)?;
        Some(self.attributes.remove(index))
    }

    /// Insert or replace, keeping semantic order
    pub fn set_attribute(&mut self, attribute: VertexAttribute) {
        match self
            .attributes
            .binary_search_by(|a| a.semantic.cmp(&attribute.semantic))
        {
            Ok(index) => self.attributes[index] = attribute,
            Err(index) => self.attributes.insert(index, attribute),
        }
    }

    pub fn morph_target_count(&self) -> usize {
        self.attributes
            .iter()
            .filter_map(|a| a.morphs.as_ref().map(Vec::len))
            .max()
            .unwrap_or(0)
    }

    pub fn has_morphs(&self) -> bool {
        self.morph_target_count() > 0
    }
}

/// Every primitive of one glTF mesh, extracted
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessedMesh {
    pub geometries: Vec<Geometry>,
    pub material_indices: Vec<Option<usize>>,
    /// Compact joint palettes (original skin joint indices)
    pub joint_maps: Vec<Vec<u32>>,
    pub min_position: [f64; 3],
    pub max_position: [f64; 3],
    /// From `extras.targetNames`
    pub target_names: Option<Vec<String>>,
}

impl ProcessedMesh {
    /// Morph target count of the first geometry carrying morph data
    pub fn morph_target_count(&self) -> usize {
        self.geometries
            .iter()
            .map(Geometry::morph_target_count)
            .find(|&n| n > 0)
            .unwrap_or(0)
    }
}
