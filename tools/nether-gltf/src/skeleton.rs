//! Skeleton builder (glTF skin -> joint paths + bind poses)

use glam::Mat4;
use serde::Serialize;

use crate::accessor::read_accessor_f32;
use crate::document::{AccessorType, ComponentType, Document};
use crate::error::{ConvertError, Result};
use crate::hierarchy::Hierarchy;

/// Joint paths and their inverse bind matrices
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkeletonStruct {
    /// Socket-mapped node paths, in skin joint order
    pub joints: Vec<String>,
    /// Column-major inverse bind matrices, one per joint
    pub bindposes: Vec<[f32; 16]>,
}

/// Build the skeleton for one skin
///
/// A skin without `inverseBindMatrices` binds every joint with identity.
pub fn build_skeleton(document: &Document, hierarchy: &Hierarchy, skin_index: usize) -> Result<SkeletonStruct> {
    let skin = document.skin(skin_index)?;

    let joints = skin
        .joints
        .iter()
        .map(|&joint| {
            if joint >= hierarchy.node_count() {
                return Err(ConvertError::out_of_range("node", joint));
            }
            Ok(hierarchy.mapped_path(joint))
        })
        .collect::<Result<Vec<_>>>()?;

    let bindposes = match skin.inverse_bind_matrices {
        None => vec![Mat4::IDENTITY.to_cols_array(); joints.len()],
        Some(index) => {
            let accessor = document.accessor(index)?;
            if accessor.component_type != ComponentType::F32
                || accessor.accessor_type != AccessorType::Mat4
                || accessor.count < joints.len()
            {
                return Err(ConvertError::InvalidBindMatrices { skin: skin_index });
            }
            read_accessor_f32(document, accessor)?
                .chunks_exact(16)
                .take(joints.len())
                .map(|m| {
                    let mut matrix = [0.0; 16];
                    matrix.copy_from_slice(m);
                    matrix
                })
                .collect()
        }
    };

    Ok(SkeletonStruct { joints, bindposes })
}
