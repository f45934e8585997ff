//! Container loading: `.gltf` JSON and `.glb` binary, plus buffer URI resolution

use base64::Engine;
use std::path::{Path, PathBuf};

use super::schema::Gltf;
use crate::error::{ConvertError, Result};

/// GLB magic ("glTF" little-endian)
pub const GLB_MAGIC: u32 = 0x4654_6C67;
pub const GLB_VERSION: u32 = 2;
pub const GLB_HEADER_LEN: usize = 12;
pub const GLB_CHUNK_JSON: u32 = 0x4E4F_534A;
pub const GLB_CHUNK_BIN: u32 = 0x004E_4942;

const ACCEPTED_BUFFER_MEDIA_TYPES: &[&str] = &["application/octet-stream", "application/gltf-buffer"];

/// Where the bytes of one glTF buffer come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferSource {
    /// Data URI or GLB binary chunk, already in memory
    Embedded(Vec<u8>),
    /// External file, resolved against the document directory
    External(PathBuf),
    /// No URI and no GLB chunk
    Empty,
}

/// Parsed container before external buffers are read
#[derive(Debug, Clone)]
pub struct GltfFile {
    pub gltf: Gltf,
    pub buffers: Vec<BufferSource>,
}

/// Read a `.gltf` or `.glb` file, choosing the parser by extension
pub fn read_gltf(path: &Path) -> Result<GltfFile> {
    let data = std::fs::read(path).map_err(|e| ConvertError::io(path, e))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

    let is_glb = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("glb"));

    if is_glb {
        parse_glb(&data, base_dir)
    } else {
        parse_gltf_json(&data, base_dir)
    }
}

/// Parse a JSON glTF document and resolve its buffer URIs
pub fn parse_gltf_json(data: &[u8], base_dir: &Path) -> Result<GltfFile> {
    let gltf: Gltf = serde_json::from_slice(data)?;
    let buffers = resolve_buffers(&gltf, None, base_dir)?;
    Ok(GltfFile { gltf, buffers })
}

/// Parse a GLB container
pub fn parse_glb(data: &[u8], base_dir: &Path) -> Result<GltfFile> {
    if data.len() < GLB_HEADER_LEN {
        return Err(ConvertError::BadGlb(format!(
            "file is {} bytes, shorter than the {} byte header",
            data.len(),
            GLB_HEADER_LEN
        )));
    }

    let magic = read_u32(data, 0);
    if magic != GLB_MAGIC {
        return Err(ConvertError::BadGlb(format!("bad magic 0x{magic:08X}")));
    }
    let version = read_u32(data, 4);
    if version != GLB_VERSION {
        return Err(ConvertError::BadGlb(format!("unsupported version {version}")));
    }
    let length = read_u32(data, 8) as usize;
    if length != data.len() {
        return Err(ConvertError::BadGlb(format!(
            "header declares {} bytes, got {}",
            length,
            data.len()
        )));
    }

    let mut offset = GLB_HEADER_LEN;
    let mut chunk_index = 0usize;
    let mut json: Option<&[u8]> = None;
    let mut bin: Option<&[u8]> = None;

    while offset < length {
        if offset + 8 > length {
            return Err(ConvertError::BadGlb(format!(
                "truncated header for chunk {chunk_index}"
            )));
        }
        let chunk_length = read_u32(data, offset) as usize;
        let chunk_type = read_u32(data, offset + 4);
        let body_start = offset + 8;
        let body_end = body_start
            .checked_add(chunk_length)
            .filter(|&end| end <= length)
            .ok_or_else(|| {
                ConvertError::BadGlb(format!("chunk {chunk_index} runs past the end of the file"))
            })?;
        let body = &data[body_start..body_end];

        if chunk_index == 0 {
            if chunk_type != GLB_CHUNK_JSON {
                return Err(ConvertError::BadGlb(format!(
                    "first chunk must be JSON, found type 0x{chunk_type:08X}"
                )));
            }
            json = Some(body);
        } else if chunk_type == GLB_CHUNK_BIN && bin.is_none() {
            bin = Some(body);
        }

        offset = body_end;
        chunk_index += 1;
    }

    let json = json.ok_or_else(|| ConvertError::BadGlb("missing JSON chunk".into()))?;
    let text = std::str::from_utf8(json)
        .map_err(|e| ConvertError::BadGlb(format!("JSON chunk is not UTF-8: {e}")))?;
    let gltf: Gltf = serde_json::from_str(text)?;
    let buffers = resolve_buffers(&gltf, bin, base_dir)?;

    Ok(GltfFile { gltf, buffers })
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn resolve_buffers(gltf: &Gltf, glb_bin: Option<&[u8]>, base_dir: &Path) -> Result<Vec<BufferSource>> {
    gltf.buffers
        .iter()
        .enumerate()
        .map(|(index, buffer)| match buffer.uri.as_deref() {
            Some(uri) => resolve_uri(uri, base_dir),
            None => Ok(match (index, glb_bin) {
                (0, Some(bin)) => BufferSource::Embedded(bin.to_vec()),
                _ => BufferSource::Empty,
            }),
        })
        .collect()
}

/// Resolve one buffer URI: decode a data URI in place, or produce a file path
pub fn resolve_uri(uri: &str, base_dir: &Path) -> Result<BufferSource> {
    if let Some(rest) = uri.strip_prefix("data:") {
        return decode_data_uri(rest).map(BufferSource::Embedded);
    }
    if uri.contains("://") {
        return Err(ConvertError::UnsupportedUri(uri.to_string()));
    }
    Ok(BufferSource::External(base_dir.join(percent_decode(uri))))
}

/// Decode the part of a data URI after `data:`
fn decode_data_uri(rest: &str) -> Result<Vec<u8>> {
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ConvertError::UnsupportedDataUri("missing ',' separator".into()))?;

    let mut params = header.split(';');
    let media_type = params.next().unwrap_or_default();
    if !ACCEPTED_BUFFER_MEDIA_TYPES.contains(&media_type) {
        return Err(ConvertError::UnsupportedDataUri(format!(
            "media type '{media_type}' is not a buffer type"
        )));
    }
    if !params.any(|p| p == "base64") {
        return Err(ConvertError::UnsupportedDataUri(
            "only base64 data URIs are supported".into(),
        ));
    }

    Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
}

fn percent_decode(uri: &str) -> String {
    let bytes = uri.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(b) = hex {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

impl GltfFile {
    /// Read every external buffer, producing an immutable [`super::Document`]
    pub fn into_document(self) -> Result<super::Document> {
        let buffers = self
            .buffers
            .into_iter()
            .map(|source| match source {
                BufferSource::Embedded(bytes) => Ok(bytes),
                BufferSource::External(path) => {
                    std::fs::read(&path).map_err(|e| ConvertError::io(path, e))
                }
                BufferSource::Empty => Ok(Vec::new()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(super::Document::new(self.gltf, buffers))
    }
}

/// Load a document and all its buffers from disk
pub fn load_document(path: &Path) -> Result<super::Document> {
    read_gltf(path)?.into_document()
}
