//! Vertex, index and morph buffer layout

use std::borrow::Cow;

use super::blob::BufferBlob;
use super::types::{
    BufferRange, IndexBuffer, MeshStruct, MorphStruct, MorphTargetViews, PackedMesh, SubMesh,
    SubMeshMorph, VertexBundle, VertexElement,
};
use crate::config::ConverterOptions;
use crate::document::ComponentType;
use crate::geometry::{Geometry, Indices, ProcessedMesh, Semantic, VertexAttribute};

/// Vertex bundles and morph buffers start on 4-byte boundaries
const DATA_ALIGNMENT: usize = 4;

/// Lay out every geometry of a mesh into one combined buffer
///
/// Layout per geometry: interleaved vertex bundle, then its index buffer.
/// Morph displacement buffers follow all geometries. `default_weights` comes
/// from the glTF mesh and is padded with zeros to the target count.
pub fn pack_mesh(
    processed: &ProcessedMesh,
    options: &ConverterOptions,
    default_weights: Option<&[f32]>,
) -> PackedMesh {
    let mut blob = BufferBlob::new();
    let mut primitives = Vec::with_capacity(processed.geometries.len());
    let mut vertex_bundles = Vec::with_capacity(processed.geometries.len());

    for (i, geometry) in processed.geometries.iter().enumerate() {
        vertex_bundles.push(pack_vertices(&mut blob, geometry, options));
        primitives.push(SubMesh {
            primitive_mode: geometry.primitive_mode,
            vertex_bundle: vertex_bundles.len() - 1,
            indices: geometry.indices.as_ref().map(|i| pack_indices(&mut blob, i)),
            material: processed.material_indices.get(i).copied().flatten(),
            joint_map_index: geometry.joint_map_index,
        });
    }

    let target_count = processed.morph_target_count();
    let morph = (target_count > 0).then(|| {
        let mut weights = default_weights.unwrap_or_default().to_vec();
        weights.resize(target_count, 0.0);
        MorphStruct {
            sub_meshes: processed
                .geometries
                .iter()
                .map(|g| pack_morphs(&mut blob, g))
                .collect(),
            weights,
            target_names: processed.target_names.clone(),
        }
    });

    PackedMesh {
        mesh: MeshStruct {
            primitives,
            vertex_bundles,
            min_position: processed.min_position,
            max_position: processed.max_position,
            joint_maps: processed.joint_maps.clone(),
            morph,
        },
        data: blob.combined(),
    }
}

/// Attributes to interleave, including requested synthesized channels
fn vertex_attributes<'a>(geometry: &'a Geometry, options: &ConverterOptions) -> Vec<Cow<'a, VertexAttribute>> {
    let mut attributes: Vec<Cow<'_, VertexAttribute>> =
        geometry.attributes.iter().map(Cow::Borrowed).collect();
    let count = geometry.vertex_count;

    let has_color = attributes.iter().any(|a| matches!(a.semantic, Semantic::Color(_)));
    if options.add_vertex_color && !has_color {
        attributes.push(Cow::Owned(VertexAttribute::from_f32(
            Semantic::Color(0),
            4,
            &vec![1.0; count * 4],
        )));
    }
    if options.add_second_uv && geometry.attribute(&Semantic::TexCoord(1)).is_none() {
        attributes.push(Cow::Owned(VertexAttribute::from_f32(
            Semantic::TexCoord(1),
            2,
            &vec![0.0; count * 2],
        )));
    }
    attributes.sort_by(|a, b| a.semantic.cmp(&b.semantic));
    attributes
}

fn pack_vertices(blob: &mut BufferBlob, geometry: &Geometry, options: &ConverterOptions) -> VertexBundle {
    let attributes = vertex_attributes(geometry, options);

    let mut elements = Vec::with_capacity(attributes.len());
    let mut stride = 0;
    for attribute in &attributes {
        elements.push(VertexElement {
            semantic: attribute.semantic.clone(),
            format: attribute.format,
            offset: stride,
        });
        stride += attribute.format.size();
    }

    let count = geometry.vertex_count;
    let mut data = vec![0u8; stride * count];
    for (attribute, element) in attributes.iter().zip(&elements) {
        let size = element.format.size();
        for (vertex, src) in attribute.data.chunks_exact(size).take(count).enumerate() {
            let at = vertex * stride + element.offset;
            data[at..at + size].copy_from_slice(src);
        }
    }

    blob.set_next_alignment(DATA_ALIGNMENT);
    let length = data.len();
    let offset = blob.add_buffer(data);
    VertexBundle {
        view: BufferRange {
            offset,
            length,
            stride,
            count,
        },
        attributes: elements,
    }
}

fn pack_indices(blob: &mut BufferBlob, indices: &Indices) -> IndexBuffer {
    // No 8-bit index type downstream
    let format = match indices.format {
        ComponentType::U32 => ComponentType::U32,
        _ => ComponentType::U16,
    };
    let data: Vec<u8> = match format {
        ComponentType::U32 => indices.values.iter().flat_map(|i| i.to_le_bytes()).collect(),
        _ => indices
            .values
            .iter()
            .flat_map(|&i| (i as u16).to_le_bytes())
            .collect(),
    };

    let stride = format.size();
    blob.set_next_alignment(stride);
    let length = data.len();
    let offset = blob.add_buffer(data);
    IndexBuffer {
        view: BufferRange {
            offset,
            length,
            stride,
            count: indices.values.len(),
        },
        format,
    }
}

fn pack_morphs(blob: &mut BufferBlob, geometry: &Geometry) -> Option<SubMeshMorph> {
    let morphed: Vec<&VertexAttribute> = geometry
        .attributes
        .iter()
        .filter(|a| a.morphs.as_ref().is_some_and(|m| !m.is_empty()))
        .collect();
    if morphed.is_empty() {
        return None;
    }

    let target_count = geometry.morph_target_count();
    let mut targets: Vec<MorphTargetViews> = (0..target_count)
        .map(|_| MorphTargetViews {
            displacements: Vec::with_capacity(morphed.len()),
        })
        .collect();

    for attribute in &morphed {
        let stride = attribute.format.components * std::mem::size_of::<f32>();
        let displacements = attribute.morphs.as_deref().unwrap_or_default();
        for (target, views) in targets.iter_mut().enumerate() {
            let values = displacements.get(target).map(Vec::as_slice).unwrap_or_default();
            let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();

            blob.set_next_alignment(DATA_ALIGNMENT);
            let length = data.len();
            let offset = blob.add_buffer(data);
            views.displacements.push(BufferRange {
                offset,
                length,
                stride,
                count: geometry.vertex_count,
            });
        }
    }

    Some(SubMeshMorph {
        attributes: morphed.iter().map(|a| a.semantic.clone()).collect(),
        targets,
    })
}
