//! `KHR_draco_mesh_compression` decoder contract
//!
//! Decompression itself is delegated; the extractor describes what it wants
//! back and validates what it gets.

use super::Semantic;
use crate::document::ComponentType;
use crate::error::{ConvertError, Result};

/// One attribute the decoder must produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DracoAttributeRequest {
    pub semantic: Semantic,
    /// Draco unique attribute id from the extension object
    pub unique_id: u32,
    /// Storage type the output must be written in
    pub component_type: ComponentType,
    pub components: usize,
}

/// A compressed primitive to decode
#[derive(Debug, Clone)]
pub struct DracoRequest<'a> {
    /// Bytes of the extension's buffer view
    pub data: &'a [u8],
    pub attributes: Vec<DracoAttributeRequest>,
    /// Storage type of the indices, if the primitive is indexed
    pub index_format: Option<ComponentType>,
}

/// Decoded primitive
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DracoOutput {
    pub vertex_count: usize,
    pub indices: Option<Vec<u32>>,
    /// Tightly packed little-endian data, in request order
    pub attributes: Vec<Vec<u8>>,
}

pub trait DracoDecoder {
    fn decode(&self, request: &DracoRequest<'_>) -> Result<DracoOutput>;
}

impl<F> DracoDecoder for F
where
    F: Fn(&DracoRequest<'_>) -> Result<DracoOutput>,
{
    fn decode(&self, request: &DracoRequest<'_>) -> Result<DracoOutput> {
        self(request)
    }
}

impl DracoOutput {
    /// Check the output has the shape the request asked for
    pub fn validate(&self, request: &DracoRequest<'_>) -> Result<()> {
        if self.attributes.len() != request.attributes.len() {
            return Err(ConvertError::Draco(format!(
                "decoder returned {} attributes, {} requested",
                self.attributes.len(),
                request.attributes.len()
            )));
        }
        for (data, wanted) in self.attributes.iter().zip(&request.attributes) {
            let expected = self.vertex_count * wanted.components * wanted.component_type.size();
            if data.len() != expected {
                return Err(ConvertError::Draco(format!(
                    "attribute {} decoded to {} bytes, expected {}",
                    wanted.semantic,
                    data.len(),
                    expected
                )));
            }
        }
        if request.index_format.is_some() != self.indices.is_some() {
            return Err(ConvertError::Draco(
                "decoder index output does not match the primitive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DracoRequest<'static> {
        DracoRequest {
            data: &[],
            attributes: vec![DracoAttributeRequest {
                semantic: Semantic::Position,
                unique_id: 0,
                component_type: ComponentType::F32,
                components: 3,
            }],
            index_format: Some(ComponentType::U16),
        }
    }

    struct ZeroDecoder;

    impl DracoDecoder for ZeroDecoder {
        fn decode(&self, request: &DracoRequest<'_>) -> Result<DracoOutput> {
            Ok(DracoOutput {
                vertex_count: 1,
                indices: Some(vec![0, 0, 0]),
                attributes: request
                    .attributes
                    .iter()
                    .map(|a| vec![0; a.components * a.component_type.size()])
                    .collect(),
            })
        }
    }

    #[test]
    fn test_decoder_output_validated() {
        let req = request();
        let output = ZeroDecoder.decode(&req).unwrap();
        assert!(output.validate(&req).is_ok());
    }

    #[test]
    fn test_short_attribute_rejected() {
        let output = DracoOutput {
            vertex_count: 2,
            indices: Some(vec![]),
            attributes: vec![vec![0; 12]],
        };
        assert!(matches!(output.validate(&request()), Err(ConvertError::Draco(_))));
    }
}
