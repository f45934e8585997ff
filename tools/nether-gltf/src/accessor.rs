//! Binary accessor codec
//!
//! Reads typed, strided accessor data out of document buffers into caller
//! owned byte arrays, converting between component types on the way. All
//! multi-byte values are little-endian on both sides.

use crate::document::schema::{Accessor, Sparse};
use crate::document::{ComponentType, Document};
use crate::error::{ConvertError, Result};

/// Read one component from the start of `bytes`
///
/// `bytes` must hold at least `ty.size()` bytes.
pub fn read_component(bytes: &[u8], ty: ComponentType) -> f64 {
    match ty {
        ComponentType::I8 => bytes[0] as i8 as f64,
        ComponentType::U8 => bytes[0] as f64,
        ComponentType::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
        ComponentType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
        ComponentType::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        ComponentType::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
    }
}

/// Write one component to the start of `out`, casting `value` to `ty`
///
/// `out` must hold at least `ty.size()` bytes.
pub fn write_component(out: &mut [u8], ty: ComponentType, value: f64) {
    match ty {
        ComponentType::I8 => out[0] = (value as i8) as u8,
        ComponentType::U8 => out[0] = value as u8,
        ComponentType::I16 => out[..2].copy_from_slice(&(value as i16).to_le_bytes()),
        ComponentType::U16 => out[..2].copy_from_slice(&(value as u16).to_le_bytes()),
        ComponentType::U32 => out[..4].copy_from_slice(&(value as u32).to_le_bytes()),
        ComponentType::F32 => out[..4].copy_from_slice(&(value as f32).to_le_bytes()),
    }
}

/// Where consecutive elements live in a byte array
#[derive(Debug, Clone, Copy)]
struct Layout {
    offset: usize,
    stride: usize,
    component_type: ComponentType,
}

impl Layout {
    /// Only called for indices already proven in range
    fn element_start(&self, index: usize) -> usize {
        self.offset + index * self.stride
    }

    /// One past the last byte of `count` elements of `element_size`
    fn end(&self, count: usize, element_size: usize) -> Option<usize> {
        match count {
            0 => Some(self.offset),
            _ => (count - 1)
                .checked_mul(self.stride)?
                .checked_add(self.offset)?
                .checked_add(element_size),
        }
    }
}

/// Largest zero-filled output produced for an accessor without a buffer view
pub const MAX_UNBACKED_BYTES: usize = 1 << 30;

/// Decode `accessor` into `output`
///
/// Each of the `accessor.count` elements is written as
/// `accessor_type.components()` values of `output_type`, `output_stride`
/// bytes apart (tightly packed when 0). Without a buffer view the dense read
/// is skipped and `output` keeps whatever the caller put there, which should
/// be zeros. Sparse overrides are applied afterwards either way.
pub fn read_accessor(
    document: &Document,
    accessor: &Accessor,
    output: &mut [u8],
    output_type: ComponentType,
    output_stride: usize,
) -> Result<()> {
    let components = accessor.accessor_type.components();
    let out_element = components * output_type.size();
    let out = Layout {
        offset: 0,
        stride: if output_stride == 0 {
            out_element
        } else {
            output_stride
        },
        component_type: output_type,
    };

    let needed = out.end(accessor.count, out_element).unwrap_or(usize::MAX);
    if output.len() < needed {
        return Err(ConvertError::OutputTooSmall {
            needed,
            actual: output.len(),
        });
    }

    if let Some((buffer, input)) = dense_source(document, accessor)? {
        for i in 0..accessor.count {
            copy_element(buffer, input, i, output, out, i, components);
        }
    }

    if let Some(sparse) = &accessor.sparse {
        apply_sparse_deviation(document, accessor, sparse, output, output_type, out.stride)?;
    }

    Ok(())
}

/// Bounds-checked buffer and layout of the dense part of `accessor`
fn dense_source<'a>(document: &'a Document, accessor: &Accessor) -> Result<Option<(&'a [u8], Layout)>> {
    let Some(view_index) = accessor.buffer_view else {
        return Ok(None);
    };
    let view = document.buffer_view(view_index)?;
    let buffer = document.buffer(view.buffer)?;
    let in_element = accessor.accessor_type.components() * accessor.component_type.size();
    let input = Layout {
        offset: view.byte_offset.saturating_add(accessor.byte_offset),
        stride: view.byte_stride.unwrap_or(in_element),
        component_type: accessor.component_type,
    };
    check_bounds(buffer, view.buffer, input, in_element, accessor.count)?;
    Ok(Some((buffer, input)))
}

/// Overwrite the elements named by a sparse accessor's index list
///
/// `output` holds the dense read laid out with `output_stride`. Each listed
/// element is fully replaced by the matching entry of the sparse values.
pub fn apply_sparse_deviation(
    document: &Document,
    accessor: &Accessor,
    sparse: &Sparse,
    output: &mut [u8],
    output_type: ComponentType,
    output_stride: usize,
) -> Result<()> {
    let components = accessor.accessor_type.components();

    let index_type = sparse.indices.component_type;
    let index_view = document.buffer_view(sparse.indices.buffer_view)?;
    let index_buffer = document.buffer(index_view.buffer)?;
    let indices = Layout {
        offset: index_view.byte_offset.saturating_add(sparse.indices.byte_offset),
        stride: index_type.size(),
        component_type: index_type,
    };
    check_bounds(index_buffer, index_view.buffer, indices, index_type.size(), sparse.count)?;

    let value_element = components * accessor.component_type.size();
    let value_view = document.buffer_view(sparse.values.buffer_view)?;
    let value_buffer = document.buffer(value_view.buffer)?;
    let values = Layout {
        offset: value_view.byte_offset.saturating_add(sparse.values.byte_offset),
        stride: value_element,
        component_type: accessor.component_type,
    };
    check_bounds(value_buffer, value_view.buffer, values, value_element, sparse.count)?;

    let out = Layout {
        offset: 0,
        stride: output_stride,
        component_type: output_type,
    };

    for j in 0..sparse.count {
        let target = read_component(&index_buffer[indices.element_start(j)..], index_type) as usize;
        if target >= accessor.count {
            return Err(ConvertError::SparseIndexOutOfRange {
                index: target,
                count: accessor.count,
            });
        }
        copy_element(value_buffer, values, j, output, out, target, components);
    }

    Ok(())
}

fn check_bounds(
    buffer: &[u8],
    buffer_index: usize,
    layout: Layout,
    element_size: usize,
    count: usize,
) -> Result<()> {
    match layout.end(count, element_size) {
        Some(end) if end <= buffer.len() => Ok(()),
        end => Err(ConvertError::AccessorOutOfBounds {
            buffer: buffer_index,
            offset: end.map_or(usize::MAX, |end| end - element_size),
            size: element_size,
            length: buffer.len(),
        }),
    }
}

fn copy_element(
    src: &[u8],
    src_layout: Layout,
    src_index: usize,
    dst: &mut [u8],
    dst_layout: Layout,
    dst_index: usize,
    components: usize,
) {
    let src_size = src_layout.component_type.size();
    let dst_size = dst_layout.component_type.size();
    let src_start = src_layout.element_start(src_index);
    let dst_start = dst_layout.element_start(dst_index);

    // Same storage: move bytes untouched so float payloads survive
    if src_layout.component_type == dst_layout.component_type {
        let len = components * src_size;
        dst[dst_start..dst_start + len].copy_from_slice(&src[src_start..src_start + len]);
        return;
    }

    for c in 0..components {
        let value = read_component(&src[src_start + c * src_size..], src_layout.component_type);
        write_component(
            &mut dst[dst_start + c * dst_size..],
            dst_layout.component_type,
            value,
        );
    }
}

/// Zeroed output for a tightly packed decode of `accessor` as `ty`
///
/// The source is bounds-checked first, so a bogus `count` fails here instead
/// of reaching the allocator.
fn output_for(document: &Document, accessor: &Accessor, ty: ComponentType) -> Result<Vec<u8>> {
    let backed = dense_source(document, accessor)?.is_some();
    let bytes = accessor
        .count
        .checked_mul(accessor.accessor_type.components() * ty.size())
        .filter(|&bytes| backed || bytes <= MAX_UNBACKED_BYTES)
        .ok_or(ConvertError::AccessorTooLarge {
            count: accessor.count,
        })?;
    Ok(vec![0u8; bytes])
}

/// Tightly packed bytes in the accessor's own component type
pub fn read_accessor_raw(document: &Document, accessor: &Accessor) -> Result<Vec<u8>> {
    let mut out = output_for(document, accessor, accessor.component_type)?;
    read_accessor(document, accessor, &mut out, accessor.component_type, 0)?;
    Ok(out)
}

/// Component values cast to f32, without normalization
pub fn read_accessor_f32(document: &Document, accessor: &Accessor) -> Result<Vec<f32>> {
    let mut out = output_for(document, accessor, ComponentType::F32)?;
    read_accessor(document, accessor, &mut out, ComponentType::F32, 0)?;
    Ok(out
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Component values cast to u32 (indices, joint ids)
pub fn read_accessor_u32(document: &Document, accessor: &Accessor) -> Result<Vec<u32>> {
    let mut out = output_for(document, accessor, ComponentType::U32)?;
    read_accessor(document, accessor, &mut out, ComponentType::U32, 0)?;
    Ok(out
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Decode to floats, normalizing integer storage
///
/// Signed types map to `[-1, 1]` (divided by their largest positive value,
/// clamped at -1), unsigned types to `[0, 1]`. Used for animation sampler
/// outputs.
pub fn read_accessor_into_array(document: &Document, accessor: &Accessor) -> Result<Vec<f32>> {
    let ty = accessor.component_type;
    let raw = read_accessor_raw(document, accessor)?;
    Ok(match ty {
        ComponentType::F32 => raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        _ => raw
            .chunks_exact(ty.size())
            .map(|c| normalize_component(read_component(c, ty), ty) as f32)
            .collect(),
    })
}

/// Map a raw integer component to its normalized float value
pub(crate) fn normalize_component(value: f64, ty: ComponentType) -> f64 {
    match ty {
        ComponentType::I8 => (value / i8::MAX as f64).max(-1.0),
        ComponentType::U8 => value / u8::MAX as f64,
        ComponentType::I16 => (value / i16::MAX as f64).max(-1.0),
        ComponentType::U16 => value / u16::MAX as f64,
        ComponentType::U32 => value / u32::MAX as f64,
        ComponentType::F32 => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Gltf;
    use serde_json::json;

    fn document(accessors: serde_json::Value, views: serde_json::Value, buffer: Vec<u8>) -> Document {
        let gltf: Gltf = serde_json::from_value(json!({
            "asset": {"version": "2.0"},
            "accessors": accessors,
            "bufferViews": views,
            "buffers": [{"byteLength": buffer.len()}],
        }))
        .unwrap();
        Document::new(gltf, vec![buffer])
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_float_round_trip_is_exact() {
        let values = [
            1.5f32,
            -2.25,
            3.0e-7,
            f32::MAX,
            f32::MIN_POSITIVE,
            0.1,
            -0.0,
            123456.79,
            f32::MIN,
        ];
        let doc = document(
            json!([{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}]),
            json!([{"buffer": 0, "byteLength": 36}]),
            f32_bytes(&values),
        );
        let decoded = read_accessor_into_array(&doc, doc.accessor(0).unwrap()).unwrap();
        assert_eq!(decoded.len(), values.len());
        for (a, b) in decoded.iter().zip(values.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_nan_payloads_survive() {
        let bits = [0x7F80_0001u32, 0xFF80_1234, 0x7FC0_0000, 0x3F80_0000];
        let buffer: Vec<u8> = bits.iter().flat_map(|b| b.to_le_bytes()).collect();
        let doc = document(
            json!([{"bufferView": 0, "componentType": 5126, "count": 2, "type": "VEC2"}]),
            json!([{"buffer": 0, "byteLength": 16}]),
            buffer.clone(),
        );
        let accessor = doc.accessor(0).unwrap();

        let normalized = read_accessor_into_array(&doc, accessor).unwrap();
        assert_eq!(normalized.iter().map(|v| v.to_bits()).collect::<Vec<_>>(), bits);
        let plain = read_accessor_f32(&doc, accessor).unwrap();
        assert_eq!(plain.iter().map(|v| v.to_bits()).collect::<Vec<_>>(), bits);

        // Interleaved destination, padding untouched
        let mut out = vec![0xAAu8; 24];
        read_accessor(&doc, accessor, &mut out, ComponentType::F32, 12).unwrap();
        assert_eq!(&out[..8], &buffer[..8]);
        assert_eq!(&out[8..12], &[0xAA; 4]);
        assert_eq!(&out[12..20], &buffer[8..]);
    }

    #[test]
    fn test_huge_count_is_an_error() {
        let doc = document(
            json!([{"bufferView": 0, "componentType": 5126, "count": (1u64 << 62), "type": "SCALAR"}]),
            json!([{"buffer": 0, "byteLength": 4}]),
            f32_bytes(&[1.0]),
        );
        let accessor = doc.accessor(0).unwrap();
        assert!(matches!(
            read_accessor_f32(&doc, accessor),
            Err(ConvertError::AccessorOutOfBounds { buffer: 0, .. })
        ));
        assert!(matches!(
            read_accessor_raw(&doc, accessor),
            Err(ConvertError::AccessorOutOfBounds { buffer: 0, .. })
        ));

        // Large but representable, still past the buffer end
        let doc = document(
            json!([{"bufferView": 0, "componentType": 5126, "count": (1u64 << 28), "type": "VEC4"}]),
            json!([{"buffer": 0, "byteLength": 4}]),
            f32_bytes(&[1.0]),
        );
        assert!(matches!(
            read_accessor_u32(&doc, doc.accessor(0).unwrap()),
            Err(ConvertError::AccessorOutOfBounds { buffer: 0, .. })
        ));
    }

    #[test]
    fn test_huge_count_without_view() {
        let doc = document(
            json!([{"componentType": 5126, "count": (1u64 << 40), "type": "MAT4"}]),
            json!([]),
            vec![],
        );
        assert!(matches!(
            read_accessor_f32(&doc, doc.accessor(0).unwrap()),
            Err(ConvertError::AccessorTooLarge { count }) if count == 1 << 40
        ));
    }

    #[test]
    fn test_offset_overflow_is_an_error() {
        let doc = document(
            json!([{"bufferView": 0, "byteOffset": usize::MAX, "componentType": 5121, "count": 1, "type": "SCALAR"}]),
            json!([{"buffer": 0, "byteOffset": 8, "byteLength": 1}]),
            vec![0; 4],
        );
        assert!(matches!(
            read_accessor_raw(&doc, doc.accessor(0).unwrap()),
            Err(ConvertError::AccessorOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_strided_view() {
        // u16 scalars interleaved with two junk bytes each
        let doc = document(
            json!([{"bufferView": 0, "byteOffset": 2, "componentType": 5123, "count": 2, "type": "SCALAR"}]),
            json!([{"buffer": 0, "byteOffset": 1, "byteLength": 9, "byteStride": 4}]),
            vec![0xEE, 0xEE, 0xEE, 7, 0, 0xEE, 0xEE, 9, 1, 0xEE],
        );
        let values = read_accessor_u32(&doc, doc.accessor(0).unwrap()).unwrap();
        assert_eq!(values, vec![7, 0x0109]);
    }

    #[test]
    fn test_output_stride_leaves_padding() {
        let doc = document(
            json!([{"bufferView": 0, "componentType": 5121, "count": 2, "type": "VEC2"}]),
            json!([{"buffer": 0, "byteLength": 4}]),
            vec![1, 2, 3, 4],
        );
        let mut out = vec![0xAAu8; 12];
        read_accessor(&doc, doc.accessor(0).unwrap(), &mut out, ComponentType::U16, 6).unwrap();
        assert_eq!(out, vec![1, 0, 2, 0, 0xAA, 0xAA, 3, 0, 4, 0, 0xAA, 0xAA]);
    }

    #[test]
    fn test_missing_buffer_view_is_noop() {
        let doc = document(
            json!([{"componentType": 5126, "count": 2, "type": "SCALAR"}]),
            json!([]),
            vec![],
        );
        let mut out = vec![0xAAu8; 8];
        read_accessor(&doc, doc.accessor(0).unwrap(), &mut out, ComponentType::F32, 0).unwrap();
        assert_eq!(out, vec![0xAA; 8]);
    }

    #[test]
    fn test_sparse_override() {
        let mut buffer = f32_bytes(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        buffer.extend_from_slice(&[1, 3, 0, 0]);
        buffer.extend_from_slice(&f32_bytes(&[10.0, 30.0]));
        let doc = document(
            json!([{
                "bufferView": 0, "componentType": 5126, "count": 5, "type": "SCALAR",
                "sparse": {
                    "count": 2,
                    "indices": {"bufferView": 1, "componentType": 5121},
                    "values": {"bufferView": 2}
                }
            }]),
            json!([
                {"buffer": 0, "byteLength": 20},
                {"buffer": 0, "byteOffset": 20, "byteLength": 2},
                {"buffer": 0, "byteOffset": 24, "byteLength": 8}
            ]),
            buffer,
        );
        let values = read_accessor_f32(&doc, doc.accessor(0).unwrap()).unwrap();
        assert_eq!(values, vec![0.0, 10.0, 2.0, 30.0, 4.0]);
    }

    #[test]
    fn test_sparse_without_dense_base() {
        let mut buffer = vec![2u8, 0];
        buffer.extend_from_slice(&f32_bytes(&[5.0, 6.0]));
        let doc = document(
            json!([{
                "componentType": 5126, "count": 3, "type": "VEC2",
                "sparse": {
                    "count": 1,
                    "indices": {"bufferView": 0, "componentType": 5123},
                    "values": {"bufferView": 1}
                }
            }]),
            json!([
                {"buffer": 0, "byteLength": 2},
                {"buffer": 0, "byteOffset": 2, "byteLength": 8}
            ]),
            buffer,
        );
        let values = read_accessor_f32(&doc, doc.accessor(0).unwrap()).unwrap();
        assert_eq!(values, vec![0.0, 0.0, 0.0, 0.0, 5.0, 6.0]);
    }

    #[test]
    fn test_sparse_index_out_of_range() {
        let mut buffer = f32_bytes(&[0.0, 1.0]);
        buffer.extend_from_slice(&[2, 0, 0, 0]);
        buffer.extend_from_slice(&f32_bytes(&[9.0]));
        let doc = document(
            json!([{
                "bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR",
                "sparse": {
                    "count": 1,
                    "indices": {"bufferView": 1, "componentType": 5121},
                    "values": {"bufferView": 2}
                }
            }]),
            json!([
                {"buffer": 0, "byteLength": 8},
                {"buffer": 0, "byteOffset": 8, "byteLength": 1},
                {"buffer": 0, "byteOffset": 12, "byteLength": 4}
            ]),
            buffer,
        );
        let err = read_accessor_f32(&doc, doc.accessor(0).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::SparseIndexOutOfRange { index: 2, count: 2 }
        ));
    }

    #[test]
    fn test_normalized_integers() {
        let doc = document(
            json!([
                {"bufferView": 0, "componentType": 5120, "count": 4, "type": "SCALAR"},
                {"bufferView": 1, "componentType": 5121, "count": 3, "type": "SCALAR"},
                {"bufferView": 2, "componentType": 5123, "count": 2, "type": "SCALAR"}
            ]),
            json!([
                {"buffer": 0, "byteLength": 4},
                {"buffer": 0, "byteOffset": 4, "byteLength": 3},
                {"buffer": 0, "byteOffset": 8, "byteLength": 4}
            ]),
            vec![0x80, 0x81, 0, 0x7F, 0, 255, 51, 0, 0, 0, 0xFF, 0xFF],
        );

        let signed = read_accessor_into_array(&doc, doc.accessor(0).unwrap()).unwrap();
        assert_eq!(signed, vec![-1.0, -1.0, 0.0, 1.0]);

        let unsigned = read_accessor_into_array(&doc, doc.accessor(1).unwrap()).unwrap();
        assert_eq!(unsigned[0], 0.0);
        assert_eq!(unsigned[1], 1.0);
        assert!((unsigned[2] - 0.2).abs() < 1e-6);

        let shorts = read_accessor_into_array(&doc, doc.accessor(2).unwrap()).unwrap();
        assert_eq!(shorts, vec![0.0, 1.0]);
    }

    #[test]
    fn test_read_past_buffer_end() {
        let doc = document(
            json!([{"bufferView": 0, "componentType": 5126, "count": 4, "type": "SCALAR"}]),
            json!([{"buffer": 0, "byteLength": 12}]),
            f32_bytes(&[1.0, 2.0, 3.0]),
        );
        let err = read_accessor_f32(&doc, doc.accessor(0).unwrap()).unwrap_err();
        assert!(matches!(err, ConvertError::AccessorOutOfBounds { buffer: 0, .. }));
    }

    #[test]
    fn test_output_too_small() {
        let doc = document(
            json!([{"bufferView": 0, "componentType": 5126, "count": 3, "type": "SCALAR"}]),
            json!([{"buffer": 0, "byteLength": 12}]),
            f32_bytes(&[1.0, 2.0, 3.0]),
        );
        let mut out = vec![0u8; 8];
        let err =
            read_accessor(&doc, doc.accessor(0).unwrap(), &mut out, ComponentType::F32, 0).unwrap_err();
        assert!(matches!(err, ConvertError::OutputTooSmall { needed: 12, actual: 8 }));
    }

    #[test]
    fn test_component_dispatch() {
        let mut out = [0u8; 4];
        for (ty, value) in [
            (ComponentType::I8, -5.0),
            (ComponentType::U8, 200.0),
            (ComponentType::I16, -30000.0),
            (ComponentType::U16, 60000.0),
            (ComponentType::U32, 4_000_000_000.0),
            (ComponentType::F32, -0.5),
        ] {
            write_component(&mut out, ty, value);
            assert_eq!(read_component(&out, ty), value);
        }
    }
}
