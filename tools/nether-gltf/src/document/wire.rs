//! Typed views of the numeric/string enums glTF stores on the wire

use serde::{Deserialize, Serialize};

use crate::error::UnrecognizedValue;

/// Storage type of one accessor component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn from_wire(value: u32) -> Result<Self, UnrecognizedValue> {
        match value {
            5120 => Ok(Self::I8),
            5121 => Ok(Self::U8),
            5122 => Ok(Self::I16),
            5123 => Ok(Self::U16),
            5125 => Ok(Self::U32),
            5126 => Ok(Self::F32),
            other => Err(UnrecognizedValue::new("component type", other)),
        }
    }

    pub fn to_wire(self) -> u32 {
        match self {
            Self::I8 => 5120,
            Self::U8 => 5121,
            Self::I16 => 5122,
            Self::U16 => 5123,
            Self::U32 => 5125,
            Self::F32 => 5126,
        }
    }

    /// Bytes per component
    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }

    pub fn is_float(self) -> bool {
        self == Self::F32
    }
}

impl TryFrom<u32> for ComponentType {
    type Error = UnrecognizedValue;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_wire(value)
    }
}

impl From<ComponentType> for u32 {
    fn from(value: ComponentType) -> Self {
        value.to_wire()
    }
}

/// Element shape of an accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl AccessorType {
    pub fn from_wire(value: &str) -> Result<Self, UnrecognizedValue> {
        match value {
            "SCALAR" => Ok(Self::Scalar),
            "VEC2" => Ok(Self::Vec2),
            "VEC3" => Ok(Self::Vec3),
            "VEC4" => Ok(Self::Vec4),
            "MAT2" => Ok(Self::Mat2),
            "MAT3" => Ok(Self::Mat3),
            "MAT4" => Ok(Self::Mat4),
            other => Err(UnrecognizedValue::new("accessor type", other)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "SCALAR",
            Self::Vec2 => "VEC2",
            Self::Vec3 => "VEC3",
            Self::Vec4 => "VEC4",
            Self::Mat2 => "MAT2",
            Self::Mat3 => "MAT3",
            Self::Mat4 => "MAT4",
        }
    }

    /// Components per element
    pub fn components(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }
}

impl TryFrom<String> for AccessorType {
    type Error = UnrecognizedValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_wire(&value)
    }
}

impl From<AccessorType> for String {
    fn from(value: AccessorType) -> Self {
        value.as_str().to_string()
    }
}

/// Topology of a mesh primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    pub fn from_wire(value: u32) -> Result<Self, UnrecognizedValue> {
        match value {
            0 => Ok(Self::Points),
            1 => Ok(Self::Lines),
            2 => Ok(Self::LineLoop),
            3 => Ok(Self::LineStrip),
            4 => Ok(Self::Triangles),
            5 => Ok(Self::TriangleStrip),
            6 => Ok(Self::TriangleFan),
            other => Err(UnrecognizedValue::new("primitive mode", other)),
        }
    }

    pub fn to_wire(self) -> u32 {
        match self {
            Self::Points => 0,
            Self::Lines => 1,
            Self::LineLoop => 2,
            Self::LineStrip => 3,
            Self::Triangles => 4,
            Self::TriangleStrip => 5,
            Self::TriangleFan => 6,
        }
    }

    pub fn is_triangles(self) -> bool {
        matches!(
            self,
            Self::Triangles | Self::TriangleStrip | Self::TriangleFan
        )
    }
}

impl TryFrom<u32> for PrimitiveMode {
    type Error = UnrecognizedValue;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_wire(value)
    }
}

impl From<PrimitiveMode> for u32 {
    fn from(value: PrimitiveMode) -> Self {
        value.to_wire()
    }
}

/// Keyframe interpolation of an animation sampler
///
/// Kept as a string in the schema: an unknown value drops the channel rather
/// than failing the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Interpolation {
    Step,
    Linear,
    #[serde(rename = "CUBICSPLINE")]
    CubicSpline,
}

impl Interpolation {
    /// `None` on the wire means LINEAR
    pub fn from_wire(value: Option<&str>) -> Result<Self, UnrecognizedValue> {
        match value {
            None | Some("LINEAR") => Ok(Self::Linear),
            Some("STEP") => Ok(Self::Step),
            Some("CUBICSPLINE") => Ok(Self::CubicSpline),
            Some(other) => Err(UnrecognizedValue::new("interpolation", other)),
        }
    }
}
