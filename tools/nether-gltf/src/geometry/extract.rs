//! Primitive decoding and attribute policies

use glam::{Vec2, Vec3};

use super::draco::{DracoAttributeRequest, DracoDecoder, DracoRequest};
use super::ops::{triangle_list, GeometryOps};
use super::skinning::split_joint_palettes;
use super::{Geometry, Indices, ProcessedMesh, Semantic, VertexAttribute, VertexFormat};
use crate::accessor::{
    read_accessor_f32, read_accessor_into_array, read_accessor_raw, read_accessor_u32,
    write_component,
};
use crate::config::{AttributePolicy, ConverterOptions};
use crate::diagnostics::{DiagnosticKind, Logger, LoggerExt};
use crate::document::schema::{Accessor, DracoExtension, Primitive};
use crate::document::{ComponentType, Document};
use crate::error::{ConformanceViolation, ConvertError, Result};

/// Everything mesh extraction reads from
#[derive(Clone, Copy)]
pub struct ExtractContext<'a> {
    pub document: &'a Document,
    pub options: &'a ConverterOptions,
    pub logger: &'a dyn Logger,
    pub ops: &'a dyn GeometryOps,
    pub draco: Option<&'a dyn DracoDecoder>,
}

type Bounds = ([f64; 3], [f64; 3]);

/// Extract every primitive of a glTF mesh
pub fn process_mesh(ctx: &ExtractContext<'_>, mesh_index: usize) -> Result<ProcessedMesh> {
    let mesh = ctx.document.mesh(mesh_index)?;

    if let Some((first, rest)) = mesh.primitives.split_first() {
        let expected = first.targets.len();
        if let Some(other) = rest.iter().find(|p| p.targets.len() != expected) {
            return Err(ConvertError::InconsistentMorphTargets {
                mesh: mesh_index,
                expected,
                actual: other.targets.len(),
            });
        }
    }

    let mut processed = ProcessedMesh {
        target_names: mesh.extras.as_ref().and_then(|e| e.target_names.clone()),
        ..Default::default()
    };
    let mut bounds: Option<Bounds> = None;

    for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
        let (geometry, (min, max)) = extract_primitive(ctx, mesh_index, primitive_index, primitive)?;
        bounds = Some(match bounds {
            None => (min, max),
            Some((lo, hi)) => (
                std::array::from_fn(|i| lo[i].min(min[i])),
                std::array::from_fn(|i| hi[i].max(max[i])),
            ),
        });
        processed.geometries.push(geometry);
        processed.material_indices.push(primitive.material);
    }

    if let Some((min, max)) = bounds.filter(|(min, max)| (0..3).all(|i| min[i] <= max[i])) {
        processed.min_position = min;
        processed.max_position = max;
    }

    if !ctx.options.disable_mesh_split {
        split_joint_palettes(&mut processed);
    }

    Ok(processed)
}

fn extract_primitive(
    ctx: &ExtractContext<'_>,
    mesh_index: usize,
    primitive_index: usize,
    primitive: &Primitive,
) -> Result<(Geometry, Bounds)> {
    let document = ctx.document;
    let label = format!("mesh {mesh_index} primitive {primitive_index}");

    let position_index = *primitive
        .attributes
        .get("POSITION")
        .ok_or(ConvertError::MissingPosition {
            mesh: mesh_index,
            primitive: primitive_index,
        })?;
    let position_accessor = document.accessor(position_index)?;
    let vertex_count = position_accessor.count;

    let (indices, mut attributes) = match &primitive.extensions.draco {
        Some(extension) => decode_draco(ctx, primitive, extension, vertex_count)?,
        None => {
            let attributes = primitive
                .attributes
                .iter()
                .map(|(name, &index)| read_attribute(document, name, index))
                .collect::<Result<Vec<_>>>()?;
            (read_indices(document, primitive)?, attributes)
        }
    };
    attributes.sort_by(|a, b| a.semantic.cmp(&b.semantic));

    for attribute in &attributes {
        if attribute.vertex_count() != vertex_count {
            return Err(ConformanceViolation::AttributeCountMismatch {
                attribute: attribute.semantic.to_string(),
                expected: vertex_count,
                actual: attribute.vertex_count(),
            }
            .into());
        }
    }

    read_morph_targets(ctx, primitive, &mut attributes, &label)?;

    let mut geometry = Geometry {
        primitive_mode: primitive.mode,
        vertex_count,
        indices,
        attributes,
        joint_map_index: None,
    };

    let bounds = position_bounds(position_accessor, &geometry);

    apply_normal_policy(ctx, &mut geometry, &label);
    apply_tangent_policy(ctx, &mut geometry, &label);
    reduce_joint_influences(ctx.ops, &mut geometry);

    Ok((geometry, bounds))
}

fn read_attribute(document: &Document, name: &str, accessor_index: usize) -> Result<VertexAttribute> {
    let accessor = document.accessor(accessor_index)?;
    Ok(VertexAttribute {
        semantic: Semantic::parse(name),
        format: accessor_format(accessor),
        data: read_accessor_raw(document, accessor)?,
        morphs: None,
    })
}

fn accessor_format(accessor: &Accessor) -> VertexFormat {
    VertexFormat {
        component_type: accessor.component_type,
        components: accessor.accessor_type.components(),
        normalized: accessor.normalized,
    }
}

fn read_indices(document: &Document, primitive: &Primitive) -> Result<Option<Indices>> {
    primitive
        .indices
        .map(|index| {
            let accessor = document.accessor(index)?;
            Ok(Indices {
                format: accessor.component_type,
                values: read_accessor_u32(document, accessor)?,
            })
        })
        .transpose()
}

fn decode_draco(
    ctx: &ExtractContext<'_>,
    primitive: &Primitive,
    extension: &DracoExtension,
    vertex_count: usize,
) -> Result<(Option<Indices>, Vec<VertexAttribute>)> {
    let decoder = ctx.draco.ok_or(ConvertError::MissingDracoDecoder)?;
    let document = ctx.document;

    let mut attributes = Vec::new();
    let mut requests = Vec::new();
    let mut normalized = Vec::new();
    for (name, &accessor_index) in &primitive.attributes {
        let accessor = document.accessor(accessor_index)?;
        match extension.attributes.get(name) {
            Some(&unique_id) => {
                requests.push(DracoAttributeRequest {
                    semantic: Semantic::parse(name),
                    unique_id,
                    component_type: accessor.component_type,
                    components: accessor.accessor_type.components(),
                });
                normalized.push(accessor.normalized);
            }
            // Attributes left out of the extension are stored uncompressed
            None => attributes.push(read_attribute(document, name, accessor_index)?),
        }
    }

    let index_format = primitive
        .indices
        .map(|index| document.accessor(index).map(|a| a.component_type))
        .transpose()?;

    let request = DracoRequest {
        data: document.view_bytes(extension.buffer_view)?,
        attributes: requests,
        index_format,
    };
    let output = decoder.decode(&request)?;
    output.validate(&request)?;
    if output.vertex_count != vertex_count {
        return Err(ConvertError::Draco(format!(
            "decoded {} vertices, POSITION accessor declares {}",
            output.vertex_count, vertex_count
        )));
    }

    for ((wanted, normalized), data) in request
        .attributes
        .into_iter()
        .zip(normalized)
        .zip(output.attributes)
    {
        attributes.push(VertexAttribute {
            semantic: wanted.semantic,
            format: VertexFormat {
                component_type: wanted.component_type,
                components: wanted.components,
                normalized,
            },
            data,
            morphs: None,
        });
    }

    let indices = output
        .indices
        .zip(index_format)
        .map(|(values, format)| Indices { format, values });

    Ok((indices, attributes))
}

fn read_morph_targets(
    ctx: &ExtractContext<'_>,
    primitive: &Primitive,
    attributes: &mut [VertexAttribute],
    label: &str,
) -> Result<()> {
    let Some(first) = primitive.targets.first() else {
        return Ok(());
    };
    for (target, set) in primitive.targets.iter().enumerate().skip(1) {
        if !set.keys().eq(first.keys()) {
            return Err(ConformanceViolation::MorphAttributeSetMismatch { target }.into());
        }
    }

    let mut all_zero = true;
    for name in first.keys() {
        let semantic = Semantic::parse(name);
        let base = attributes
            .iter_mut()
            .find(|a| a.semantic == semantic)
            .ok_or_else(|| ConformanceViolation::MorphWithoutBase(name.clone()))?;
        let expected = base.vertex_count() * base.format.components;

        let mut morphs = Vec::with_capacity(primitive.targets.len());
        for (target, set) in primitive.targets.iter().enumerate() {
            let accessor = ctx.document.accessor(set[name])?;
            let values = if accessor.normalized {
                read_accessor_into_array(ctx.document, accessor)?
            } else {
                read_accessor_f32(ctx.document, accessor)?
            };
            if values.len() != expected {
                return Err(ConformanceViolation::MorphLengthMismatch {
                    attribute: name.clone(),
                    target,
                    expected,
                    actual: values.len(),
                }
                .into());
            }
            all_zero &= values.iter().all(|&v| v == 0.0);
            morphs.push(values);
        }
        base.morphs = Some(morphs);
    }

    if all_zero {
        ctx.logger.warn(
            DiagnosticKind::EmptyMorph,
            format!("{label}: every morph target displacement is zero"),
        );
    }
    Ok(())
}

/// Declared accessor bounds when present, computed from the data otherwise
///
/// Declared FLOAT bounds are rounded to single precision; other component
/// types are used as written.
fn position_bounds(accessor: &Accessor, geometry: &Geometry) -> Bounds {
    if let (Some(min), Some(max)) = (&accessor.min, &accessor.max) {
        if min.len() >= 3 && max.len() >= 3 {
            let round = |v: f64| {
                if accessor.component_type.is_float() {
                    v as f32 as f64
                } else {
                    v
                }
            };
            return (
                std::array::from_fn(|i| round(min[i])),
                std::array::from_fn(|i| round(max[i])),
            );
        }
    }

    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    if let Some(positions) = geometry.attribute(&Semantic::Position) {
        for p in positions.to_f32().chunks_exact(3) {
            for i in 0..3 {
                min[i] = min[i].min(p[i] as f64);
                max[i] = max[i].max(p[i] as f64);
            }
        }
    }
    (min, max)
}

fn vec3s(attribute: &VertexAttribute) -> Vec<Vec3> {
    attribute
        .to_f32()
        .chunks_exact(attribute.format.components)
        .map(|c| Vec3::new(c[0], c.get(1).copied().unwrap_or(0.0), c.get(2).copied().unwrap_or(0.0)))
        .collect()
}

fn vec2s(attribute: &VertexAttribute) -> Vec<Vec2> {
    attribute
        .to_f32()
        .chunks_exact(attribute.format.components)
        .map(|c| Vec2::new(c[0], c.get(1).copied().unwrap_or(0.0)))
        .collect()
}

fn geometry_triangles(geometry: &Geometry) -> Vec<[u32; 3]> {
    triangle_list(
        geometry.primitive_mode,
        geometry.indices.as_ref().map(|i| i.values.as_slice()),
        geometry.vertex_count,
    )
}

fn apply_normal_policy(ctx: &ExtractContext<'_>, geometry: &mut Geometry, label: &str) {
    let recompute = match ctx.options.normals {
        AttributePolicy::Exclude => {
            geometry.remove_attribute(&Semantic::Normal);
            false
        }
        AttributePolicy::Require => geometry.attribute(&Semantic::Normal).is_none(),
        AttributePolicy::Recalculate => true,
    };

    if recompute {
        if !geometry.primitive_mode.is_triangles() {
            ctx.logger.debug(format!(
                "{label}: no normals calculated for {:?} primitives",
                geometry.primitive_mode
            ));
        } else if let Some(positions) = geometry.attribute(&Semantic::Position) {
            let normals = ctx
                .ops
                .compute_normals(&vec3s(positions), &geometry_triangles(geometry));
            let values: Vec<f32> = normals.iter().flat_map(|n| n.to_array()).collect();
            let mut attribute = VertexAttribute::from_f32(Semantic::Normal, 3, &values);
            attribute.morphs = geometry
                .attribute(&Semantic::Normal)
                .and_then(|a| a.morphs.clone());
            geometry.set_attribute(attribute);
        }
    }

    // Morph normals are never recomputed, only dropped
    if ctx.options.morph_normals == AttributePolicy::Exclude {
        if let Some(normal) = geometry.attribute_mut(&Semantic::Normal) {
            normal.morphs = None;
        }
    }
}

fn apply_tangent_policy(ctx: &ExtractContext<'_>, geometry: &mut Geometry, label: &str) {
    let recompute = match ctx.options.tangents {
        AttributePolicy::Exclude => {
            geometry.remove_attribute(&Semantic::Tangent);
            false
        }
        AttributePolicy::Require => geometry.attribute(&Semantic::Tangent).is_none(),
        AttributePolicy::Recalculate => true,
    };
    if !recompute {
        return;
    }
    if !geometry.primitive_mode.is_triangles() {
        ctx.logger.debug(format!(
            "{label}: no tangents calculated for {:?} primitives",
            geometry.primitive_mode
        ));
        return;
    }

    let (Some(positions), Some(normals), Some(uvs)) = (
        geometry.attribute(&Semantic::Position),
        geometry.attribute(&Semantic::Normal),
        geometry.attribute(&Semantic::TexCoord(0)),
    ) else {
        ctx.logger.warn(
            DiagnosticKind::FailedToCalculateTangents,
            format!("{label}: tangents need NORMAL and TEXCOORD_0, skipping"),
        );
        return;
    };

    let tangents = ctx.ops.compute_tangents(
        &vec3s(positions),
        &vec3s(normals),
        &vec2s(uvs),
        &geometry_triangles(geometry),
    );
    let values: Vec<f32> = tangents.iter().flat_map(|t| t.to_array()).collect();
    let mut attribute = VertexAttribute::from_f32(Semantic::Tangent, 4, &values);
    attribute.morphs = geometry
        .attribute(&Semantic::Tangent)
        .and_then(|a| a.morphs.clone());
    geometry.set_attribute(attribute);
}

/// Fold extra `JOINTS_n`/`WEIGHTS_n` sets into the four strongest influences
fn reduce_joint_influences(ops: &dyn GeometryOps, geometry: &mut Geometry) {
    let sets: Vec<u32> = geometry
        .attributes
        .iter()
        .filter_map(|a| match a.semantic {
            Semantic::Joints(n) => Some(n),
            _ => None,
        })
        .collect();
    if sets.len() <= 1 {
        return;
    }

    let mut influences = vec![Vec::new(); geometry.vertex_count];
    for &set in &sets {
        let (Some(joints), Some(weights)) = (
            geometry.attribute(&Semantic::Joints(set)),
            geometry.attribute(&Semantic::Weights(set)),
        ) else {
            continue;
        };
        let components = joints.format.components;
        let joint_ids = joints.to_u32();
        let joint_weights = weights.to_f32();
        for (vertex, list) in influences.iter_mut().enumerate() {
            for c in 0..components {
                let at = vertex * components + c;
                if let (Some(&j), Some(&w)) = (joint_ids.get(at), joint_weights.get(at)) {
                    list.push((j, w));
                }
            }
        }
    }

    let reduced = ops.reduce_joint_influences(&influences);
    for set in sets {
        geometry.remove_attribute(&Semantic::Joints(set));
        geometry.remove_attribute(&Semantic::Weights(set));
    }

    let mut joint_data = vec![0u8; reduced.len() * 4 * ComponentType::U16.size()];
    let mut weight_values = Vec::with_capacity(reduced.len() * 4);
    for (vertex, influences) in reduced.iter().enumerate() {
        for (c, &(joint, weight)) in influences.iter().enumerate() {
            write_component(&mut joint_data[(vertex * 4 + c) * 2..], ComponentType::U16, joint as f64);
            weight_values.push(weight);
        }
    }
    geometry.set_attribute(VertexAttribute {
        semantic: Semantic::Joints(0),
        format: VertexFormat {
            component_type: ComponentType::U16,
            components: 4,
            normalized: false,
        },
        data: joint_data,
        morphs: None,
    });
    geometry.set_attribute(VertexAttribute::from_f32(Semantic::Weights(0), 4, &weight_values));
}
