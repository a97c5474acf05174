//! Embedding Summarization
//!
//! Encodes buffered samples through an external embedding backbone and
//! reduces the resulting N x D matrix into summary statistics whose shape
//! is independent of N.

mod backbone;
mod onnx;
mod summary;

pub use backbone::{encode_in_chunks, Backbone, HashingImageBackbone, HashingTextBackbone};
pub use onnx::OnnxImageBackbone;
pub use summary::{EmbeddingSummarizer, EmbeddingSummary};

use thiserror::Error;

/// Errors raised by an embedding backbone
#[derive(Debug, Error)]
pub enum BackboneError {
    /// Backbone could not be constructed or loaded
    #[error("backbone unavailable: {0}")]
    Unavailable(String),

    /// Inference failed on a batch of samples
    #[error("inference failed: {0}")]
    Inference(String),

    /// Backbone produced an output incompatible with its declared dimension
    #[error("unexpected output shape: expected {expected}, got {actual}")]
    OutputShape { expected: String, actual: String },
}

/// Errors reducing an embedding matrix
#[derive(Debug, Clone, Error)]
pub enum SummaryError {
    /// No embedding rows survived encoding
    #[error("no embeddings to summarize")]
    Empty,

    /// Encoded chunks disagree on the embedding dimension
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}
