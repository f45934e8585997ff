//! Binary buffer packing and GLB framing for generated documents.

use serde_json::{json, Value};

pub const FLOAT: u32 = 5126;
pub const UNSIGNED_SHORT: u32 = 5123;
pub const UNSIGNED_BYTE: u32 = 5121;

/// One binary buffer plus the bufferViews and accessors addressing it
#[derive(Default)]
pub struct BufferBuilder {
    data: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl BufferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Align to 4 bytes (required for float data)
    fn align_buffer(&mut self) {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
    }

    /// Append bytes as a new bufferView
    pub fn view(&mut self, bytes: &[u8]) -> usize {
        self.align_buffer();
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        self.views.push(json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": bytes.len()
        }));
        self.views.len() - 1
    }

    /// Add an accessor; `extra` is merged into the accessor object
    pub fn accessor(
        &mut self,
        view: Option<usize>,
        component_type: u32,
        ty: &str,
        count: usize,
        extra: Value,
    ) -> usize {
        let mut accessor = json!({
            "componentType": component_type,
            "type": ty,
            "count": count
        });
        if let Some(view) = view {
            accessor["bufferView"] = json!(view);
        }
        if let (Value::Object(map), Value::Object(extra)) = (&mut accessor, extra) {
            map.extend(extra);
        }
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    pub fn scalars(&mut self, values: &[f32]) -> usize {
        let view = self.view(bytemuck::cast_slice(values));
        let min = values.iter().copied().fold(f32::INFINITY, f32::min);
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        self.accessor(
            Some(view),
            FLOAT,
            "SCALAR",
            values.len(),
            json!({"min": [min], "max": [max]}),
        )
    }

    pub fn vec2(&mut self, values: &[[f32; 2]]) -> usize {
        let view = self.view(bytemuck::cast_slice(values));
        self.accessor(Some(view), FLOAT, "VEC2", values.len(), json!({}))
    }

    /// VEC3 floats with min/max bounds, as POSITION requires
    pub fn vec3(&mut self, values: &[[f32; 3]]) -> usize {
        let view = self.view(bytemuck::cast_slice(values));
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for v in values {
            for i in 0..3 {
                min[i] = min[i].min(v[i]);
                max[i] = max[i].max(v[i]);
            }
        }
        self.accessor(
            Some(view),
            FLOAT,
            "VEC3",
            values.len(),
            json!({"min": min, "max": max}),
        )
    }

    pub fn vec4(&mut self, values: &[[f32; 4]]) -> usize {
        let view = self.view(bytemuck::cast_slice(values));
        self.accessor(Some(view), FLOAT, "VEC4", values.len(), json!({}))
    }

    pub fn joints(&mut self, values: &[[u8; 4]]) -> usize {
        let view = self.view(bytemuck::cast_slice(values));
        self.accessor(Some(view), UNSIGNED_BYTE, "VEC4", values.len(), json!({}))
    }

    pub fn mat4(&mut self, values: &[[f32; 16]]) -> usize {
        let view = self.view(bytemuck::cast_slice(values));
        self.accessor(Some(view), FLOAT, "MAT4", values.len(), json!({}))
    }

    pub fn indices(&mut self, values: &[u16]) -> usize {
        let view = self.view(bytemuck::cast_slice(values));
        self.accessor(Some(view), UNSIGNED_SHORT, "SCALAR", values.len(), json!({}))
    }

    /// Wrap `root` and the packed buffer into a GLB container
    ///
    /// The root's `buffers`, `bufferViews` and `accessors` are replaced by the
    /// ones built here.
    pub fn into_glb(mut self, mut root: Value) -> Vec<u8> {
        self.align_buffer();
        root["buffers"] = json!([{"byteLength": self.data.len()}]);
        root["bufferViews"] = Value::Array(self.views);
        root["accessors"] = Value::Array(self.accessors);

        let json = serde_json::to_vec(&root).expect("Failed to serialize JSON");
        let chunks = [
            glb_chunk(CHUNK_JSON, &json, b' '),
            glb_chunk(CHUNK_BIN, &self.data, 0),
        ];
        let total_length = 12 + chunks.iter().map(Vec::len).sum::<usize>();

        let mut glb = Vec::with_capacity(total_length);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total_length as u32).to_le_bytes());
        for chunk in &chunks {
            glb.extend_from_slice(chunk);
        }
        glb
    }
}

const CHUNK_JSON: u32 = 0x4E4F534A;
const CHUNK_BIN: u32 = 0x004E4942;

/// Length, type and payload, padded to 4 bytes with `pad`
fn glb_chunk(kind: u32, payload: &[u8], pad: u8) -> Vec<u8> {
    let padded = payload.len().next_multiple_of(4);
    let mut chunk = Vec::with_capacity(8 + padded);
    chunk.extend_from_slice(&(padded as u32).to_le_bytes());
    chunk.extend_from_slice(&kind.to_le_bytes());
    chunk.extend_from_slice(payload);
    chunk.resize(8 + padded, pad);
    chunk
}
