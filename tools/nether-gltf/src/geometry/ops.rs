//! Geometry math consumed by the extractor
//!
//! The extractor only talks to [`GeometryOps`]; [`DefaultGeometryOps`] is the
//! stock implementation.

use glam::{Vec2, Vec3, Vec4};

use crate::document::PrimitiveMode;

/// Maximum joint influences kept per vertex
pub const MAX_INFLUENCES: usize = 4;

/// Normal/tangent recomputation and joint-influence reduction
pub trait GeometryOps {
    /// One unit normal per position
    fn compute_normals(&self, positions: &[Vec3], triangles: &[[u32; 3]]) -> Vec<Vec3>;

    /// One tangent per position, handedness in `w`
    fn compute_tangents(
        &self,
        positions: &[Vec3],
        normals: &[Vec3],
        uvs: &[Vec2],
        triangles: &[[u32; 3]],
    ) -> Vec<Vec4>;

    /// Keep the strongest [`MAX_INFLUENCES`] `(joint, weight)` pairs per vertex
    fn reduce_joint_influences(&self, influences: &[Vec<(u32, f32)>]) -> Vec<[(u32, f32); MAX_INFLUENCES]>;
}

/// Area-weighted normals, per-triangle UV tangent frames
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGeometryOps;

fn triangle_in_range(tri: &[u32; 3], len: usize) -> bool {
    tri.iter().all(|&i| (i as usize) < len)
}

impl GeometryOps for DefaultGeometryOps {
    fn compute_normals(&self, positions: &[Vec3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; positions.len()];
        for tri in triangles.iter().filter(|t| triangle_in_range(t, positions.len())) {
            let [a, b, c] = tri.map(|i| i as usize);
            // Unnormalized cross product weights by triangle area
            let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        normals
            .into_iter()
            .map(|n| {
                let n = n.normalize_or_zero();
                if n == Vec3::ZERO {
                    Vec3::Z
                } else {
                    n
                }
            })
            .collect()
    }

    fn compute_tangents(
        &self,
        positions: &[Vec3],
        normals: &[Vec3],
        uvs: &[Vec2],
        triangles: &[[u32; 3]],
    ) -> Vec<Vec4> {
        let len = positions.len().min(normals.len()).min(uvs.len());
        let mut tan1 = vec![Vec3::ZERO; positions.len()];
        let mut tan2 = vec![Vec3::ZERO; positions.len()];

        for tri in triangles.iter().filter(|t| triangle_in_range(t, len)) {
            let [a, b, c] = tri.map(|i| i as usize);
            let e1 = positions[b] - positions[a];
            let e2 = positions[c] - positions[a];
            let d1 = uvs[b] - uvs[a];
            let d2 = uvs[c] - uvs[a];

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let sdir = (e1 * d2.y - e2 * d1.y) * r;
            let tdir = (e2 * d1.x - e1 * d2.x) * r;
            for v in [a, b, c] {
                tan1[v] += sdir;
                tan2[v] += tdir;
            }
        }

        (0..positions.len())
            .map(|v| {
                let n = normals.get(v).copied().unwrap_or(Vec3::Z);
                let t = tan1[v];
                // Gram-Schmidt
                let mut tangent = (t - n * n.dot(t)).normalize_or_zero();
                if tangent == Vec3::ZERO {
                    tangent = n.any_orthonormal_vector();
                }
                let w = if n.cross(tangent).dot(tan2[v]) < 0.0 {
                    -1.0
                } else {
                    1.0
                };
                tangent.extend(w)
            })
            .collect()
    }

    fn reduce_joint_influences(&self, influences: &[Vec<(u32, f32)>]) -> Vec<[(u32, f32); MAX_INFLUENCES]> {
        influences
            .iter()
            .map(|vertex| {
                let mut sorted = vertex.clone();
                sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

                let mut out = [(0u32, 0.0f32); MAX_INFLUENCES];
                for (slot, influence) in out.iter_mut().zip(sorted) {
                    *slot = influence;
                }
                let sum: f32 = out.iter().map(|(_, w)| w).sum();
                if sum > 0.0 {
                    for (_, w) in &mut out {
                        *w /= sum;
                    }
                }
                out
            })
            .collect()
    }
}

/// Triangle list for a primitive, triangulating strips and fans
///
/// Without indices the vertices are used in order. Point and line modes
/// produce no triangles.
pub fn triangle_list(mode: PrimitiveMode, indices: Option<&[u32]>, vertex_count: usize) -> Vec<[u32; 3]> {
    let sequential: Vec<u32>;
    let idx = match indices {
        Some(values) => values,
        None => {
            sequential = (0..vertex_count as u32).collect();
            &sequential
        }
    };

    match mode {
        PrimitiveMode::Triangles => idx.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
        PrimitiveMode::TriangleStrip => (0..idx.len().saturating_sub(2))
            .map(|i| {
                if i % 2 == 0 {
                    [idx[i], idx[i + 1], idx[i + 2]]
                } else {
                    [idx[i], idx[i + 2], idx[i + 1]]
                }
            })
            .collect(),
        PrimitiveMode::TriangleFan => (1..idx.len().saturating_sub(1))
            .map(|i| [idx[0], idx[i], idx[i + 1]])
            .collect(),
        PrimitiveMode::Points
        | PrimitiveMode::Lines
        | PrimitiveMode::LineLoop
        | PrimitiveMode::LineStrip => Vec::new(),
    }
}
