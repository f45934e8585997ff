//! Small in-memory document builder for unit tests

use serde_json::{json, Value};

use crate::document::{Document, Gltf};

/// Accumulates one binary buffer plus accessors/views over it
#[derive(Default)]
pub(crate) struct DocBuilder {
    buffer: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl DocBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&mut self, bytes: &[u8]) -> usize {
        while self.buffer.len() % 4 != 0 {
            self.buffer.push(0);
        }
        self.views.push(json!({
            "buffer": 0,
            "byteOffset": self.buffer.len(),
            "byteLength": bytes.len(),
        }));
        self.buffer.extend_from_slice(bytes);
        self.views.len() - 1
    }

    /// Accessor over a fresh view; `extra` is merged into the accessor object
    pub fn accessor(&mut self, component_type: u32, ty: &str, count: usize, bytes: &[u8], extra: Value) -> usize {
        let view = self.view(bytes);
        let mut accessor = json!({
            "bufferView": view,
            "componentType": component_type,
            "count": count,
            "type": ty,
        });
        if let (Some(target), Value::Object(extra)) = (accessor.as_object_mut(), extra) {
            target.extend(extra);
        }
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    pub fn f32s(&mut self, ty: &str, values: &[f32]) -> usize {
        let components = components(ty);
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.accessor(5126, ty, values.len() / components, &bytes, json!({}))
    }

    /// VEC3 float positions with declared bounds
    pub fn positions(&mut self, values: &[[f32; 3]]) -> usize {
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for p in values {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        let bytes: Vec<u8> = values.iter().flatten().flat_map(|v| v.to_le_bytes()).collect();
        self.accessor(5126, "VEC3", values.len(), &bytes, json!({"min": min, "max": max}))
    }

    pub fn u16s(&mut self, ty: &str, values: &[u16]) -> usize {
        let components = components(ty);
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.accessor(5123, ty, values.len() / components, &bytes, json!({}))
    }

    pub fn u8s(&mut self, ty: &str, values: &[u8]) -> usize {
        let components = components(ty);
        self.accessor(5121, ty, values.len() / components, values, json!({}))
    }

    /// Finish with the remaining top-level properties (nodes, meshes, ...)
    pub fn build(self, rest: Value) -> Document {
        let mut root = json!({
            "asset": {"version": "2.0"},
            "accessors": self.accessors,
            "bufferViews": self.views,
            "buffers": [{"byteLength": self.buffer.len()}],
        });
        if let (Some(target), Value::Object(rest)) = (root.as_object_mut(), rest) {
            target.extend(rest);
        }
        let gltf: Gltf = serde_json::from_value(root).expect("test document should deserialize");
        Document::new(gltf, vec![self.buffer])
    }
}

fn components(ty: &str) -> usize {
    match ty {
        "SCALAR" => 1,
        "VEC2" => 2,
        "VEC3" => 3,
        "VEC4" | "MAT2" => 4,
        "MAT3" => 9,
        "MAT4" => 16,
        other => panic!("unknown accessor type {other}"),
    }
}
