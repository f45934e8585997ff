//! Partial TRS animation test generator.
//!
//! `Spine` only has a rotation channel. Its translation must come from the
//! node's rest pose ([0, 1, 0]) rather than defaulting to zero.

use serde_json::json;

use super::{finish_glb, skinned_root, BufferBuilder, HEAD, ROOT, SEGMENT_HEIGHT, SPINE};

const KEY_COUNT: usize = 10;

pub fn generate_partial_trs_glb() -> Vec<u8> {
    let mut buffer = BufferBuilder::new();
    let mut root = skinned_root(&mut buffer);

    let times: Vec<f32> = (0..KEY_COUNT)
        .map(|k| k as f32 / (KEY_COUNT - 1) as f32)
        .collect();
    let rotations: Vec<[f32; 4]> = times
        .iter()
        .map(|t| {
            let half = (t * std::f32::consts::TAU).sin() * 0.3 * 0.5;
            [0.0, 0.0, half.sin(), half.cos()]
        })
        .collect();

    let input = buffer.scalars(&times);
    let rotation = buffer.vec4(&rotations);
    let root_translation = buffer.vec3(&vec![[0.0, 0.0, 0.0]; KEY_COUNT]);
    let head_translation = buffer.vec3(&vec![[0.0, SEGMENT_HEIGHT, 0.0]; KEY_COUNT]);
    let unit_scale = buffer.vec3(&vec![[1.0, 1.0, 1.0]; KEY_COUNT]);

    let samplers = json!([
        {"input": input, "output": root_translation},
        {"input": input, "output": rotation},
        {"input": input, "output": unit_scale},
        {"input": input, "output": head_translation}
    ]);
    let channels = json!([
        {"sampler": 0, "target": {"node": ROOT, "path": "translation"}},
        {"sampler": 1, "target": {"node": ROOT, "path": "rotation"}},
        {"sampler": 2, "target": {"node": ROOT, "path": "scale"}},
        {"sampler": 1, "target": {"node": SPINE, "path": "rotation"}},
        {"sampler": 3, "target": {"node": HEAD, "path": "translation"}},
        {"sampler": 1, "target": {"node": HEAD, "path": "rotation"}},
        {"sampler": 2, "target": {"node": HEAD, "path": "scale"}}
    ]);

    root["animations"] = json!([{"name": "Partial", "samplers": samplers, "channels": channels}]);
    finish_glb(root, buffer)
}
