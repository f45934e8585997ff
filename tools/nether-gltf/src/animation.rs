//! Animation track synthesizer (glTF animation -> TRS and morph weight tracks)
//!
//! Every channel becomes a keyframe curve addressed by the (socket-mapped)
//! path of its target node. Properties no channel touches get constant curves
//! from the node's rest pose.

use glam::{Quat, Vec3};
use hashbrown::HashMap;
use serde::Serialize;

use crate::accessor::{read_accessor_f32, read_accessor_into_array};
use crate::diagnostics::{DiagnosticKind, Logger, LoggerExt};
use crate::document::{Document, Interpolation};
use crate::error::{ConvertError, Result};
use crate::geometry::ProcessedMesh;
use crate::hierarchy::{node_trs, Hierarchy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrsProperty {
    Translation,
    Rotation,
    Scale,
}

impl TrsProperty {
    fn from_channel_path(path: &str) -> Option<Self> {
        match path {
            "translation" => Some(Self::Translation),
            "rotation" => Some(Self::Rotation),
            "scale" => Some(Self::Scale),
            _ => None,
        }
    }

    pub fn components(self) -> usize {
        match self {
            Self::Rotation => 4,
            Self::Translation | Self::Scale => 3,
        }
    }
}

/// Keyframes of one TRS property
///
/// `values` holds `components` floats per key, or `3 * components` for
/// CUBICSPLINE (in-tangent, value, out-tangent). Rotations are xyzw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrsTrack {
    pub property: TrsProperty,
    pub interpolation: Interpolation,
    pub times: Vec<f32>,
    pub values: Vec<f32>,
}

impl TrsTrack {
    /// Sample the track at `time`, clamping outside the key range
    pub fn evaluate(&self, time: f32) -> Vec<f32> {
        let spherical = self.property == TrsProperty::Rotation;
        let mut value = sample(
            self.interpolation,
            &self.times,
            &self.values,
            self.property.components(),
            time,
            spherical,
        );
        if spherical {
            value = Quat::from_slice(&value).normalize().to_array().to_vec();
        }
        value
    }
}

/// Either a constant rest-pose value or animated keyframes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    Constant(Vec<f32>),
    Keyframes(TrsTrack),
}

impl Curve {
    pub fn evaluate(&self, time: f32) -> Vec<f32> {
        match self {
            Self::Constant(value) => value.clone(),
            Self::Keyframes(track) => track.evaluate(time),
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Keyframes(_))
    }
}

/// Translation/rotation/scale curves of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointTrack {
    pub path: String,
    pub translation: Curve,
    pub rotation: Curve,
    pub scale: Curve,
}

impl JointTrack {
    fn rest(path: String, (translation, rotation, scale): (Vec3, Quat, Vec3)) -> Self {
        Self {
            path,
            translation: Curve::Constant(translation.to_array().to_vec()),
            rotation: Curve::Constant(rotation.to_array().to_vec()),
            scale: Curve::Constant(scale.to_array().to_vec()),
        }
    }

    fn curve_mut(&mut self, property: TrsProperty) -> &mut Curve {
        match property {
            TrsProperty::Translation => &mut self.translation,
            TrsProperty::Rotation => &mut self.rotation,
            TrsProperty::Scale => &mut self.scale,
        }
    }

    pub fn evaluate(&self, time: f32) -> (Vec3, Quat, Vec3) {
        (
            Vec3::from_slice(&self.translation.evaluate(time)),
            Quat::from_slice(&self.rotation.evaluate(time)),
            Vec3::from_slice(&self.scale.evaluate(time)),
        )
    }
}

/// Keyframes of one morph target weight
///
/// `path` addresses every morph weight of the mesh at that node; `target`
/// picks the weight this track drives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightTrack {
    pub path: String,
    pub target: usize,
    pub interpolation: Interpolation,
    pub times: Vec<f32>,
    pub values: Vec<f32>,
}

impl WeightTrack {
    pub fn evaluate(&self, time: f32) -> f32 {
        sample(self.interpolation, &self.times, &self.values, 1, time, false)
            .first()
            .copied()
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationClip {
    pub name: String,
    /// Seconds
    pub duration: f32,
    /// Frames per second
    pub sample_rate: f32,
    pub joint_tracks: Vec<JointTrack>,
    pub weight_tracks: Vec<WeightTrack>,
}

impl AnimationClip {
    /// Frames needed to cover the whole clip at its sample rate
    pub fn frame_count(&self) -> usize {
        (self.duration * self.sample_rate).ceil() as usize + 1
    }

    pub fn animated_joint_count(&self) -> usize {
        self.joint_tracks
            .iter()
            .filter(|t| t.translation.is_animated() || t.rotation.is_animated() || t.scale.is_animated())
            .count()
    }
}

/// Build the clip for one glTF animation
///
/// `meshes` is the processed geometry of every glTF mesh, indexed like the
/// document's meshes; it decides how many weight tracks a `weights` channel
/// expands into.
pub fn synthesize_animation(
    document: &Document,
    hierarchy: &Hierarchy,
    meshes: &[ProcessedMesh],
    index: usize,
    sample_rate: f32,
    logger: &dyn Logger,
) -> Result<AnimationClip> {
    let animation = document.animation(index)?;
    let name = animation
        .name
        .clone()
        .unwrap_or_else(|| format!("animation_{index}"));

    let mut joint_tracks: Vec<JointTrack> = Vec::new();
    let mut by_node: HashMap<usize, usize> = HashMap::new();
    for node in 0..hierarchy.node_count() {
        if hierarchy.is_promoted(node) {
            continue;
        }
        by_node.insert(node, joint_tracks.len());
        joint_tracks.push(JointTrack::rest(
            hierarchy.mapped_path(node),
            node_trs(document.node(node)?),
        ));
    }

    let mut weight_tracks = Vec::new();
    let mut duration = 0.0f32;

    for (channel_index, channel) in animation.channels.iter().enumerate() {
        let Some(node) = channel.target.node else {
            continue;
        };
        document.node(node)?;
        let sampler = animation
            .samplers
            .get(channel.sampler)
            .ok_or_else(|| ConvertError::out_of_range("animation sampler", channel.sampler))?;

        let input = document.accessor(sampler.input)?;
        let times = read_accessor_f32(document, input)?;
        let end = input
            .max
            .as_ref()
            .and_then(|m| m.first())
            .map(|&m| m as f32)
            .or_else(|| times.last().copied())
            .unwrap_or(0.0);
        duration = duration.max(end);

        let interpolation = match Interpolation::from_wire(sampler.interpolation.as_deref()) {
            Ok(interpolation) => interpolation,
            Err(e) => {
                logger.debug(format!("{name}: channel {channel_index} dropped, {e}"));
                continue;
            }
        };

        if channel.target.path == "weights" {
            let values = read_accessor_into_array(document, document.accessor(sampler.output)?)?;
            let Some(target_count) = morph_target_count(document, meshes, node) else {
                logger.debug(format!(
                    "{name}: channel {channel_index} animates weights of node {node} which has no morph targets"
                ));
                continue;
            };
            let path = hierarchy.mapped_path(node);
            weight_tracks.extend(expand_weights(&path, interpolation, &times, &values, target_count));
            continue;
        }

        let Some(property) = TrsProperty::from_channel_path(&channel.target.path) else {
            logger.warn(
                DiagnosticKind::UnsupportedChannelPath,
                format!(
                    "{name}: channel {channel_index} targets unsupported path '{}'",
                    channel.target.path
                ),
            );
            continue;
        };
        let Some(&slot) = by_node.get(&node) else {
            logger.debug(format!("{name}: channel {channel_index} targets the promoted root"));
            continue;
        };

        let values = read_accessor_into_array(document, document.accessor(sampler.output)?)?;
        *joint_tracks[slot].curve_mut(property) = Curve::Keyframes(TrsTrack {
            property,
            interpolation,
            times,
            values,
        });
    }

    Ok(AnimationClip {
        name,
        duration,
        sample_rate,
        joint_tracks,
        weight_tracks,
    })
}

/// Morph target count of the mesh on `node`, from the first sub-mesh carrying morph data
fn morph_target_count(document: &Document, meshes: &[ProcessedMesh], node: usize) -> Option<usize> {
    let mesh = document.node(node).ok()?.mesh?;
    Some(meshes.get(mesh)?.morph_target_count()).filter(|&n| n > 0)
}

/// Split an interleaved weights output into one track per morph target
fn expand_weights(
    path: &str,
    interpolation: Interpolation,
    times: &[f32],
    values: &[f32],
    target_count: usize,
) -> Vec<WeightTrack> {
    // Cubic keys store in-tangents, values and out-tangents as three blocks
    let blocks = match interpolation {
        Interpolation::CubicSpline => 3,
        _ => 1,
    };
    let key_size = target_count * blocks;

    (0..target_count)
        .map(|target| WeightTrack {
            path: path.to_string(),
            target,
            interpolation,
            times: times.to_vec(),
            values: values
                .chunks_exact(key_size)
                .flat_map(|key| (0..blocks).map(move |b| key[b * target_count + target]))
                .collect(),
        })
        .collect()
}

/// Index of the last key at or before `time`
fn key_index(times: &[f32], time: f32) -> usize {
    times.partition_point(|&t| t <= time).saturating_sub(1)
}

fn sample(
    interpolation: Interpolation,
    times: &[f32],
    values: &[f32],
    components: usize,
    time: f32,
    spherical: bool,
) -> Vec<f32> {
    let cubic = interpolation == Interpolation::CubicSpline;
    let stride = if cubic { components * 3 } else { components };
    let keys = times.len().min(values.len() / stride.max(1));
    if keys == 0 {
        return vec![0.0; components];
    }

    // Value of key k (skipping the in-tangent for cubic keys)
    let value = |k: usize| -> &[f32] {
        let start = k * stride + if cubic { components } else { 0 };
        &values[start..start + components]
    };

    if time <= times[0] {
        return value(0).to_vec();
    }
    let k = key_index(&times[..keys], time);
    if k + 1 >= keys {
        return value(keys - 1).to_vec();
    }

    let t0 = times[k];
    let t1 = times[k + 1];
    let dt = t1 - t0;
    let s = if dt > 0.0 { ((time - t0) / dt).clamp(0.0, 1.0) } else { 0.0 };

    match interpolation {
        Interpolation::Step => value(k).to_vec(),
        Interpolation::Linear if spherical => Quat::from_slice(value(k))
            .slerp(Quat::from_slice(value(k + 1)), s)
            .to_array()
            .to_vec(),
        Interpolation::Linear => value(k)
            .iter()
            .zip(value(k + 1))
            .map(|(a, b)| a + (b - a) * s)
            .collect(),
        Interpolation::CubicSpline => {
            let out_tangent = &values[k * stride + 2 * components..k * stride + 3 * components];
            let in_tangent = &values[(k + 1) * stride..(k + 1) * stride + components];
            let (s2, s3) = (s * s, s * s * s);
            let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
            let h10 = s3 - 2.0 * s2 + s;
            let h01 = -2.0 * s3 + 3.0 * s2;
            let h11 = s3 - s2;
            (0..components)
                .map(|c| {
                    h00 * value(k)[c]
                        + h10 * dt * out_tangent[c]
                        + h01 * value(k + 1)[c]
                        + h11 * dt * in_tangent[c]
                })
                .collect()
        }
    }
}
