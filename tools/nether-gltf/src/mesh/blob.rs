//! Alignment-aware byte accumulator

/// One recorded piece of a [`BufferBlob`]
#[derive(Debug, Clone)]
enum Chunk {
    Data(Vec<u8>),
    Padding(usize),
}

/// Growable list of byte chunks and zero paddings, combined on demand
///
/// `len()` is always the sum of every recorded chunk and padding.
#[derive(Debug, Clone, Default)]
pub struct BufferBlob {
    chunks: Vec<Chunk>,
    length: usize,
}

impl BufferBlob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pad with zeros so the next buffer starts at a multiple of `align`
    ///
    /// Nothing is recorded when the length is already aligned.
    pub fn set_next_alignment(&mut self, align: usize) {
        if align <= 1 {
            return;
        }
        let remainder = self.length % align;
        if remainder != 0 {
            let padding = align - remainder;
            self.chunks.push(Chunk::Padding(padding));
            self.length += padding;
        }
    }

    /// Append a buffer, returning the offset it was placed at
    pub fn add_buffer(&mut self, data: impl Into<Vec<u8>>) -> usize {
        let data = data.into();
        let offset = self.length;
        self.length += data.len();
        self.chunks.push(Chunk::Data(data));
        offset
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Concatenate every chunk in recording order
    pub fn combined(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length);
        for chunk in &self.chunks {
            match chunk {
                Chunk::Data(data) => out.extend_from_slice(data),
                Chunk::Padding(n) => out.resize(out.len() + n, 0),
            }
        }
        out
    }
}
