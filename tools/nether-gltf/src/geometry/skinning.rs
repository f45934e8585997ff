//! Per-geometry joint palettes

use hashbrown::HashMap;

use super::{ProcessedMesh, Semantic};
use crate::accessor::write_component;

/// Remap every geometry's `JOINTS_0` onto a compact palette of the joints it
/// actually references
///
/// Palettes are sorted skin joint indices. Geometries referencing the same
/// set share one entry of `joint_maps`.
pub(super) fn split_joint_palettes(mesh: &mut ProcessedMesh) {
    for geometry in &mut mesh.geometries {
        let Some(joints) = geometry.attribute_mut(&Semantic::Joints(0)) else {
            continue;
        };

        let ids = joints.to_u32();
        let mut palette = ids.clone();
        palette.sort_unstable();
        palette.dedup();
        let local: HashMap<u32, usize> = palette.iter().enumerate().map(|(i, &j)| (j, i)).collect();

        let ty = joints.format.component_type;
        for (chunk, id) in joints.data.chunks_exact_mut(ty.size()).zip(&ids) {
            write_component(chunk, ty, local[id] as f64);
        }

        let index = match mesh.joint_maps.iter().position(|existing| *existing == palette) {
            Some(index) => index,
            None => {
                mesh.joint_maps.push(palette);
                mesh.joint_maps.len() - 1
            }
        };
        geometry.joint_map_index = Some(index);
    }
}
