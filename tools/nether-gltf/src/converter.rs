//! Conversion session over one loaded document
//!
//! Everything cross-referenced between sub-assets (parent and skin-root
//! tables, socket mappings, processed geometry) is derived once when the
//! converter is built. The `create_*` calls only read that state, so they can
//! be made in any order.

use crate::animation::{synthesize_animation, AnimationClip};
use crate::config::ConverterOptions;
use crate::diagnostics::{DiagnosticKind, Logger, LoggerExt, TracingLogger};
use crate::document::schema::SUPPORTED_EXTENSIONS;
use crate::document::Document;
use crate::error::{ConvertError, Result};
use crate::geometry::{process_mesh, DefaultGeometryOps, DracoDecoder, ExtractContext, GeometryOps, ProcessedMesh};
use crate::hierarchy::Hierarchy;
use crate::material::{build_material, MaterialDesc};
use crate::mesh::{pack_mesh, PackedMesh};
use crate::scene::{build_scene, SceneGraph};
use crate::skeleton::{build_skeleton, SkeletonStruct};

/// Collaborators and options for a [`GltfConverter`]
pub struct ConverterBuilder {
    options: ConverterOptions,
    logger: Box<dyn Logger>,
    ops: Box<dyn GeometryOps>,
    draco: Option<Box<dyn DracoDecoder>>,
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self {
            options: ConverterOptions::default(),
            logger: Box::new(TracingLogger),
            ops: Box::new(DefaultGeometryOps),
            draco: None,
        }
    }
}

impl ConverterBuilder {
    pub fn options(mut self, options: ConverterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    pub fn geometry_ops(mut self, ops: impl GeometryOps + 'static) -> Self {
        self.ops = Box::new(ops);
        self
    }

    pub fn draco_decoder(mut self, decoder: impl DracoDecoder + 'static) -> Self {
        self.draco = Some(Box::new(decoder));
        self
    }

    /// Validate options, resolve the hierarchy and extract every mesh
    pub fn build(self, document: Document) -> Result<GltfConverter> {
        self.options.validate()?;
        let logger = self.logger.as_ref();

        check_extensions(&document, logger);

        let hierarchy = Hierarchy::build(&document, self.options.promote_single_root_node, logger)?;

        let ctx = ExtractContext {
            document: &document,
            options: &self.options,
            logger,
            ops: self.ops.as_ref(),
            draco: self.draco.as_deref(),
        };
        let meshes = (0..document.gltf().meshes.len())
            .map(|index| process_mesh(&ctx, index))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            nodes = hierarchy.node_count(),
            meshes = meshes.len(),
            sockets = hierarchy.sockets().len(),
            "converter ready"
        );

        Ok(GltfConverter {
            document,
            options: self.options,
            logger: self.logger,
            hierarchy,
            meshes,
        })
    }
}

fn check_extensions(document: &Document, logger: &dyn Logger) {
    let gltf = document.gltf();
    let supported = |name: &str| SUPPORTED_EXTENSIONS.contains(&name);

    for name in &gltf.extensions_required {
        if !supported(name.as_str()) {
            logger.error(
                Some(DiagnosticKind::UnsupportedExtension),
                format!("required extension {name} is not supported"),
            );
        }
    }
    for name in &gltf.extensions_used {
        if !supported(name.as_str()) && !gltf.extensions_required.contains(name) {
            logger.warn(
                DiagnosticKind::UnsupportedExtension,
                format!("extension {name} is not supported and will be ignored"),
            );
        }
    }
}

/// A glTF document with its derived state, ready to produce sub-assets
pub struct GltfConverter {
    document: Document,
    options: ConverterOptions,
    logger: Box<dyn Logger>,
    hierarchy: Hierarchy,
    meshes: Vec<ProcessedMesh>,
}

impl GltfConverter {
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::default()
    }

    /// Build with default collaborators, logging through `tracing`
    pub fn new(document: Document, options: ConverterOptions) -> Result<Self> {
        Self::builder().options(options).build(document)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn processed_mesh(&self, index: usize) -> Result<&ProcessedMesh> {
        self.meshes
            .get(index)
            .ok_or_else(|| ConvertError::out_of_range("mesh", index))
    }

    pub fn create_mesh(&self, index: usize) -> Result<PackedMesh> {
        let processed = self.processed_mesh(index)?;
        let weights = self.document.mesh(index)?.weights.as_deref();
        Ok(pack_mesh(processed, &self.options, weights))
    }

    pub fn create_skeleton(&self, index: usize) -> Result<SkeletonStruct> {
        build_skeleton(&self.document, &self.hierarchy, index)
    }

    pub fn create_animation(&self, index: usize) -> Result<AnimationClip> {
        synthesize_animation(
            &self.document,
            &self.hierarchy,
            &self.meshes,
            index,
            self.options.animation_sample_rate,
            self.logger.as_ref(),
        )
    }

    pub fn create_scene(&self, index: usize) -> Result<SceneGraph> {
        build_scene(&self.document, &self.hierarchy, index)
    }

    pub fn create_material(&self, index: usize) -> Result<MaterialDesc> {
        build_material(&self.document, index, self.logger.as_ref())
    }
}
