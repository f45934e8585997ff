//! nether-gltf library
//!
//! Converts glTF 2.0 documents (JSON or GLB) into engine-agnostic mesh,
//! skeleton, animation, scene and material descriptions.
//!
//! ```no_run
//! use nether_gltf::{load_document, ConverterOptions, GltfConverter};
//!
//! # fn main() -> nether_gltf::Result<()> {
//! let document = load_document("hero.glb".as_ref())?;
//! let converter = GltfConverter::new(document, ConverterOptions::default())?;
//! let mesh = converter.create_mesh(0)?;
//! println!("{} primitives", mesh.mesh.primitives.len());
//! # Ok(())
//! # }
//! ```

pub mod accessor;
pub mod animation;
pub mod config;
pub mod converter;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod formats;
pub mod geometry;
pub mod hierarchy;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod skeleton;

#[cfg(test)]
mod test_util;

// Re-export the types most callers need
pub use animation::{AnimationClip, JointTrack, TrsTrack, WeightTrack};
pub use config::{AttributePolicy, ConverterOptions};
pub use converter::{ConverterBuilder, GltfConverter};
pub use diagnostics::{Diagnostic, DiagnosticKind, LogLevel, Logger, RecordingLogger, TracingLogger};
pub use document::{load_document, parse_glb, parse_gltf_json, read_gltf, Document};
pub use error::{ConformanceViolation, ConvertError, Result, UnrecognizedValue};
pub use geometry::{DracoDecoder, GeometryOps, ProcessedMesh};
pub use hierarchy::Hierarchy;
pub use material::MaterialDesc;
pub use mesh::{BufferBlob, MeshStruct, PackedMesh};
pub use scene::SceneGraph;
pub use skeleton::SkeletonStruct;
