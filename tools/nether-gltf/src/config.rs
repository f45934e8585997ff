//! Converter options
//!
//! Every recognised key with its default lives here. Options are usually read
//! from a TOML file:
//!
//! ```toml
//! promote_single_root_node = true
//! normals = "recalculate"
//! tangents = "exclude"
//! disable_mesh_split = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConvertError, Result};

/// Default sample rate for animation clips (frames per second)
pub const DEFAULT_SAMPLE_RATE: f32 = 30.0;

/// What to do with a derivable vertex attribute (normals, tangents, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributePolicy {
    /// Keep the authored data, compute it only when missing
    Require,
    /// Always recompute, discarding authored data
    Recalculate,
    /// Strip the attribute
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterOptions {
    /// Treat a lone, un-animated, non-joint scene root as the prefab root
    pub promote_single_root_node: bool,
    pub normals: AttributePolicy,
    pub tangents: AttributePolicy,
    /// Only `exclude` has an effect: morph normals are never recomputed
    pub morph_normals: AttributePolicy,
    /// Keep original skin joint indices instead of compact per-geometry palettes
    pub disable_mesh_split: bool,
    /// Synthesize a constant white COLOR_0 when a geometry has none
    pub add_vertex_color: bool,
    /// Synthesize a zero-filled TEXCOORD_1 when a geometry has none
    pub add_second_uv: bool,
    pub animation_sample_rate: f32,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            promote_single_root_node: false,
            normals: AttributePolicy::Require,
            tangents: AttributePolicy::Require,
            morph_normals: AttributePolicy::Exclude,
            disable_mesh_split: false,
            add_vertex_color: false,
            add_second_uv: false,
            animation_sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl ConverterOptions {
    /// Parse and validate options from TOML text
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let options: Self =
            toml::from_str(s).map_err(|e| ConvertError::InvalidOptions(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.animation_sample_rate.is_finite() && self.animation_sample_rate > 0.0) {
            return Err(ConvertError::InvalidOptions(format!(
                "animation_sample_rate must be a positive number, got {}",
                self.animation_sample_rate
            )));
        }
        Ok(())
    }
}
