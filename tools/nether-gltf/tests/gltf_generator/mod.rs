//! Programmatic GLB generation for integration tests.
//!
//! The skinned asset is a square column bound to a 3-bone chain:
//!
//! ```text
//! Armature
//! ├── Body   (mesh 0, skin 0)
//! └── Root
//!     └── Spine
//!         └── Head
//! ```
//!
//! `Body` is a skinned mesh with a non-scene parent, so unless `Armature` is
//! promoted the importer moves everything under `Armature` into a socket.

// Each test binary uses a different subset
#![allow(dead_code)]

mod binary_packing;
mod mesh_data;
mod partial_trs;

pub use binary_packing::{BufferBuilder, FLOAT, UNSIGNED_BYTE, UNSIGNED_SHORT};
pub use mesh_data::{BONE_COUNT, FRAME_COUNT, SEGMENT_HEIGHT};
pub use partial_trs::generate_partial_trs_glb;

use serde_json::{json, Value};

use mesh_data::{create_animation, create_inverse_bind_matrices, create_mesh_data};

/// Node indices of the skinned asset
pub const ARMATURE: usize = 0;
pub const BODY: usize = 1;
pub const ROOT: usize = 2;
pub const SPINE: usize = 3;
pub const HEAD: usize = 4;

/// Pack the skinned column into `buffer` and return the glTF root without animations
pub fn skinned_root(buffer: &mut BufferBuilder) -> Value {
    let mesh = create_mesh_data();
    let position = buffer.vec3(&mesh.positions);
    let normal = buffer.vec3(&mesh.normals);
    let uv = buffer.vec2(&mesh.uvs);
    let joints = buffer.joints(&mesh.joints);
    let weights = buffer.vec4(&mesh.weights);
    let indices = buffer.indices(&mesh.indices);
    let ibm = buffer.mat4(&create_inverse_bind_matrices());

    json!({
        "asset": {"version": "2.0", "generator": "nether-gltf test generator"},
        "scene": 0,
        "scenes": [{"name": "Scene", "nodes": [ARMATURE]}],
        "nodes": [
            {"name": "Armature", "children": [BODY, ROOT]},
            {"name": "Body", "mesh": 0, "skin": 0},
            {"name": "Root", "children": [SPINE]},
            {"name": "Spine", "children": [HEAD], "translation": [0.0, SEGMENT_HEIGHT, 0.0]},
            {"name": "Head", "translation": [0.0, SEGMENT_HEIGHT, 0.0]}
        ],
        "meshes": [{
            "name": "Column",
            "primitives": [{
                "attributes": {
                    "POSITION": position,
                    "NORMAL": normal,
                    "TEXCOORD_0": uv,
                    "JOINTS_0": joints,
                    "WEIGHTS_0": weights
                },
                "indices": indices,
                "material": 0
            }]
        }],
        "materials": [{"name": "Column", "pbrMetallicRoughness": {"baseColorFactor": [0.8, 0.8, 0.8, 1.0]}}],
        "skins": [{"name": "Rig", "joints": [ROOT, SPINE, HEAD], "inverseBindMatrices": ibm}]
    })
}

/// Generate the skinned column with a `FRAME_COUNT`-key wave animation
///
/// `Root` bobs up and down; every bone rotates about Z.
pub fn generate_skinned_glb() -> Vec<u8> {
    let mut buffer = BufferBuilder::new();
    let mut root = skinned_root(&mut buffer);

    let animation = create_animation();
    let times = buffer.scalars(&animation.times);
    let mut samplers = Vec::new();
    let mut channels = Vec::new();

    let translation = buffer.vec3(&animation.root_translations);
    samplers.push(json!({"input": times, "output": translation}));
    channels.push(json!({"sampler": 0, "target": {"node": ROOT, "path": "translation"}}));

    for (bone, keys) in animation.rotations.iter().enumerate() {
        let output = buffer.vec4(keys);
        channels.push(json!({
            "sampler": samplers.len(),
            "target": {"node": ROOT + bone, "path": "rotation"}
        }));
        samplers.push(json!({"input": times, "output": output, "interpolation": "LINEAR"}));
    }

    root["animations"] = json!([{"name": "Wave", "samplers": samplers, "channels": channels}]);
    finish_glb(root, buffer)
}

/// Attach the packed buffer's views and accessors to `root` and build a GLB
pub fn finish_glb(root: Value, buffer: BufferBuilder) -> Vec<u8> {
    buffer.into_glb(root)
}
