//! Fatal conversion errors
//!
//! Anything in here aborts the whole conversion. Recoverable conditions go
//! through [`crate::diagnostics`] instead.

use std::path::PathBuf;

/// Result alias used throughout the importer
pub type Result<T> = std::result::Result<T, ConvertError>;

/// A wire value (component type, primitive mode, ...) outside the known set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind} value {value}")]
pub struct UnrecognizedValue {
    /// What was being decoded (e.g. "component type")
    pub kind: &'static str,
    /// The offending value, rendered as text
    pub value: String,
}

impl UnrecognizedValue {
    pub(crate) fn new(kind: &'static str, value: impl ToString) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// A contract the glTF 2.0 format itself mandates was broken by the document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConformanceViolation {
    /// A morph target array does not match its base attribute
    #[error(
        "morph target {target} of attribute {attribute} has {actual} components, expected {expected}"
    )]
    MorphLengthMismatch {
        attribute: String,
        target: usize,
        expected: usize,
        actual: usize,
    },

    /// A morph target supplies a different attribute set than target 0
    #[error("morph target {target} does not supply the same attributes as target 0")]
    MorphAttributeSetMismatch { target: usize },

    /// A morph target displaces an attribute the primitive does not have
    #[error("morph target displaces attribute {0} which the primitive does not define")]
    MorphWithoutBase(String),

    /// A node is listed as the child of more than one parent
    #[error("node {node} has more than one parent ({first} and {second})")]
    MultipleParents {
        node: usize,
        first: usize,
        second: usize,
    },

    /// The node hierarchy contains a cycle
    #[error("node hierarchy contains a cycle through node {0}")]
    Cycle(usize),

    /// Vertex attributes of one primitive disagree on the vertex count
    #[error("attribute {attribute} has {actual} elements, POSITION has {expected}")]
    AttributeCountMismatch {
        attribute: String,
        expected: usize,
        actual: usize,
    },
}

/// Fatal errors raised while loading or converting a glTF document
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("bad GLB format: {0}")]
    BadGlb(String),

    #[error("failed to parse glTF JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported data URI: {0}")]
    UnsupportedDataUri(String),

    #[error("unsupported buffer URI: {0}")]
    UnsupportedUri(String),

    #[error("failed to decode base64 buffer: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Unrecognized(#[from] UnrecognizedValue),

    #[error("{kind} index {index} is out of range")]
    IndexOutOfRange { kind: &'static str, index: usize },

    #[error("accessor read at byte {offset} (+{size}) runs past the end of buffer {buffer} ({length} bytes)")]
    AccessorOutOfBounds {
        buffer: usize,
        offset: usize,
        size: usize,
        length: usize,
    },

    #[error("accessor count {count} is too large to decode")]
    AccessorTooLarge { count: usize },

    #[error("output buffer holds {actual} bytes, accessor decode needs {needed}")]
    OutputTooSmall { needed: usize, actual: usize },

    #[error("sparse index {index} exceeds accessor count {count}")]
    SparseIndexOutOfRange { index: usize, count: usize },

    #[error("mesh {mesh} primitive {primitive} has no POSITION attribute")]
    MissingPosition { mesh: usize, primitive: usize },

    #[error("skin {skin}: inverse bind matrices must be FLOAT MAT4 with one matrix per joint")]
    InvalidBindMatrices { skin: usize },

    #[error("mesh {mesh}: primitives disagree on morph target count ({expected} vs {actual})")]
    InconsistentMorphTargets {
        mesh: usize,
        expected: usize,
        actual: usize,
    },

    #[error("primitive uses KHR_draco_mesh_compression but no Draco decoder is configured")]
    MissingDracoDecoder,

    #[error("Draco decoding failed: {0}")]
    Draco(String),

    #[error("invalid converter options: {0}")]
    InvalidOptions(String),

    #[error("glTF conformance violation: {0}")]
    Conformance(#[from] ConformanceViolation),
}

impl ConvertError {
    pub(crate) fn out_of_range(kind: &'static str, index: usize) -> Self {
        Self::IndexOutOfRange { kind, index }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
