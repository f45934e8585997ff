//! Mesh, skeleton and animation data for the skinned test asset.

use std::f32::consts::TAU;

/// Bone count for the test skeleton
pub const BONE_COUNT: usize = 3;
/// Keyframe count for the test animation
pub const FRAME_COUNT: usize = 30;
/// Height of one bone segment
pub const SEGMENT_HEIGHT: f32 = 1.0;

const RING_SIDES: usize = 4;
const HALF_WIDTH: f32 = 0.15;

pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub joints: Vec<[u8; 4]>,
    pub weights: Vec<[f32; 4]>,
    pub indices: Vec<u16>,
}

pub struct AnimationData {
    pub times: Vec<f32>,
    /// Root bone bob, one key per frame
    pub root_translations: Vec<[f32; 3]>,
    /// Per bone, one key per frame
    pub rotations: Vec<Vec<[f32; 4]>>,
}

/// Square column of `BONE_COUNT` segments; ring `r` is bound to bone `min(r, BONE_COUNT - 1)`
pub fn create_mesh_data() -> MeshData {
    let mut mesh = MeshData {
        positions: Vec::new(),
        normals: Vec::new(),
        uvs: Vec::new(),
        joints: Vec::new(),
        weights: Vec::new(),
        indices: Vec::new(),
    };

    for ring in 0..=BONE_COUNT {
        let y = ring as f32 * SEGMENT_HEIGHT;
        let bone = ring.min(BONE_COUNT - 1) as u8;
        for side in 0..RING_SIDES {
            let angle = side as f32 / RING_SIDES as f32 * TAU;
            let (sin, cos) = angle.sin_cos();
            mesh.positions.push([cos * HALF_WIDTH, y, sin * HALF_WIDTH]);
            mesh.normals.push([cos, 0.0, sin]);
            mesh.uvs.push([
                side as f32 / RING_SIDES as f32,
                ring as f32 / BONE_COUNT as f32,
            ]);
            mesh.joints.push([bone, 0, 0, 0]);
            mesh.weights.push([1.0, 0.0, 0.0, 0.0]);
        }
    }

    for ring in 0..BONE_COUNT {
        let base = (ring * RING_SIDES) as u16;
        let next = base + RING_SIDES as u16;
        for side in 0..RING_SIDES as u16 {
            let side_next = (side + 1) % RING_SIDES as u16;
            mesh.indices.extend_from_slice(&[
                base + side,
                next + side,
                base + side_next,
                base + side_next,
                next + side,
                next + side_next,
            ]);
        }
    }

    mesh
}

/// Inverse bind matrices (column-major) for bones stacked along +Y
pub fn create_inverse_bind_matrices() -> Vec<[f32; 16]> {
    (0..BONE_COUNT)
        .map(|bone| {
            let mut m = [0.0f32; 16];
            m[0] = 1.0;
            m[5] = 1.0;
            m[10] = 1.0;
            m[15] = 1.0;
            m[13] = -(bone as f32 * SEGMENT_HEIGHT);
            m
        })
        .collect()
}

/// One wave cycle over `FRAME_COUNT` keys at 30 fps
pub fn create_animation() -> AnimationData {
    let times: Vec<f32> = (0..FRAME_COUNT).map(|f| f as f32 / 30.0).collect();
    let phase = |f: usize| f as f32 / FRAME_COUNT as f32 * TAU;

    let root_translations = (0..FRAME_COUNT)
        .map(|f| [0.0, phase(f).sin() * 0.1, 0.0])
        .collect();

    let rotations = (0..BONE_COUNT)
        .map(|bone| {
            (0..FRAME_COUNT)
                .map(|f| {
                    let half = (phase(f) + bone as f32).sin() * 0.25 * 0.5;
                    [0.0, 0.0, half.sin(), half.cos()]
                })
                .collect()
        })
        .collect();

    AnimationData {
        times,
        root_translations,
        rotations,
    }
}
