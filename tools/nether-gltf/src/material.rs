//! Material description (glTF material -> flat PBR parameters)
//!
//! Only the data needed to pick shader inputs downstream. Values the runtime
//! cannot represent fall back to defaults with a diagnostic.

use serde::Serialize;

use crate::diagnostics::{DiagnosticKind, Logger, LoggerExt};
use crate::document::schema::{TextureInfo, EXT_MATERIALS_UNLIT};
use crate::document::Document;
use crate::error::{ConvertError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlphaMode {
    Opaque,
    Mask,
    Blend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Nearest,
    Linear,
}

/// Resolved sampler state; mipmap selection folds into `mip_filter`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplerDesc {
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mip_filter: Option<Filter>,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            mip_filter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureSlot {
    /// Material input, e.g. `baseColor` or `normal`
    pub slot: &'static str,
    pub texture: usize,
    pub image: Option<usize>,
    pub tex_coord: u32,
    pub sampler: SamplerDesc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDesc {
    pub name: String,
    pub alpha_mode: AlphaMode,
    /// Only meaningful for [`AlphaMode::Mask`]
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    pub unlit: bool,
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: [f32; 3],
    pub textures: Vec<TextureSlot>,
}

pub fn build_material(document: &Document, index: usize, logger: &dyn Logger) -> Result<MaterialDesc> {
    let material = document.material(index)?;
    let name = material
        .name
        .clone()
        .unwrap_or_else(|| format!("material_{index}"));

    let alpha_mode = match material.alpha_mode.as_deref() {
        None | Some("OPAQUE") => AlphaMode::Opaque,
        Some("MASK") => AlphaMode::Mask,
        Some("BLEND") => AlphaMode::Blend,
        Some(other) => {
            logger.warn(
                DiagnosticKind::UnsupportedAlphaMode,
                format!("material '{name}': alpha mode '{other}' is not supported, using OPAQUE"),
            );
            AlphaMode::Opaque
        }
    };

    let pbr = material.pbr_metallic_roughness.clone().unwrap_or_default();
    let mut textures = Vec::new();
    let slots = [
        ("baseColor", pbr.base_color_texture.as_ref()),
        ("metallicRoughness", pbr.metallic_roughness_texture.as_ref()),
        ("normal", material.normal_texture.as_ref()),
        ("occlusion", material.occlusion_texture.as_ref()),
        ("emissive", material.emissive_texture.as_ref()),
    ];
    for (slot, info) in slots {
        if let Some(info) = info {
            textures.push(texture_slot(document, slot, info, &name, logger)?);
        }
    }

    Ok(MaterialDesc {
        alpha_mode,
        alpha_cutoff: material.alpha_cutoff.unwrap_or(0.5),
        double_sided: material.double_sided,
        unlit: material.extensions.contains_key(EXT_MATERIALS_UNLIT),
        base_color_factor: pbr.base_color_factor.unwrap_or([1.0; 4]),
        metallic_factor: pbr.metallic_factor.unwrap_or(1.0),
        roughness_factor: pbr.roughness_factor.unwrap_or(1.0),
        emissive_factor: material.emissive_factor.unwrap_or([0.0; 3]),
        textures,
        name,
    })
}

fn texture_slot(
    document: &Document,
    slot: &'static str,
    info: &TextureInfo,
    material: &str,
    logger: &dyn Logger,
) -> Result<TextureSlot> {
    let gltf = document.gltf();
    let texture = gltf
        .textures
        .get(info.index)
        .ok_or_else(|| ConvertError::out_of_range("texture", info.index))?;

    let sampler = match texture.sampler {
        None => SamplerDesc::default(),
        Some(index) => {
            let raw = gltf
                .samplers
                .get(index)
                .ok_or_else(|| ConvertError::out_of_range("sampler", index))?;
            let context = format!("material '{material}' {slot} texture");
            let (min_filter, mip_filter) = raw
                .min_filter
                .map(|v| min_filter(v, &context, logger))
                .unwrap_or((Filter::Linear, None));
            SamplerDesc {
                wrap_s: raw.wrap_s.map_or(WrapMode::Repeat, |v| wrap_mode(v, &context, logger)),
                wrap_t: raw.wrap_t.map_or(WrapMode::Repeat, |v| wrap_mode(v, &context, logger)),
                min_filter,
                mag_filter: raw.mag_filter.map_or(Filter::Linear, |v| mag_filter(v, &context, logger)),
                mip_filter,
            }
        }
    };

    Ok(TextureSlot {
        slot,
        texture: info.index,
        image: texture.source,
        tex_coord: info.tex_coord,
        sampler,
    })
}

fn unsupported(logger: &dyn Logger, context: &str, what: &str, value: u32, fallback: &str) {
    logger.warn(
        DiagnosticKind::UnsupportedTextureParameter,
        format!("{context}: {what} {value} is not supported, using {fallback}"),
    );
}

fn wrap_mode(value: u32, context: &str, logger: &dyn Logger) -> WrapMode {
    match value {
        10497 => WrapMode::Repeat,
        33071 => WrapMode::ClampToEdge,
        33648 => WrapMode::MirroredRepeat,
        other => {
            unsupported(logger, context, "wrap mode", other, "REPEAT");
            WrapMode::Repeat
        }
    }
}

fn mag_filter(value: u32, context: &str, logger: &dyn Logger) -> Filter {
    match value {
        9728 => Filter::Nearest,
        9729 => Filter::Linear,
        other => {
            unsupported(logger, context, "mag filter", other, "LINEAR");
            Filter::Linear
        }
    }
}

fn min_filter(value: u32, context: &str, logger: &dyn Logger) -> (Filter, Option<Filter>) {
    match value {
        9728 => (Filter::Nearest, None),
        9729 => (Filter::Linear, None),
        9984 => (Filter::Nearest, Some(Filter::Nearest)),
        9985 => (Filter::Linear, Some(Filter::Nearest)),
        9986 => (Filter::Nearest, Some(Filter::Linear)),
        9987 => (Filter::Linear, Some(Filter::Linear)),
        other => {
            unsupported(logger, context, "min filter", other, "LINEAR");
            (Filter::Linear, None)
        }
    }
}
