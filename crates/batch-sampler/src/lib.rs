//! Batch Sampling and Buffering
//!
//! Provides the dataset collaborator contract (`BatchSource`), per-modality
//! batch types, and bounded sample buffering for metafeature extraction.

mod batch;
mod buffer;
mod source;

pub use batch::{ImageBatch, Label, RowBatch, SampleBatch, TextBatch};
pub use buffer::{BufferStats, SampleBuffer};
pub use source::{BatchSource, InMemoryImageSource, InMemoryRowSource, InMemoryTextSource};

use thiserror::Error;

/// Errors constructing a batch source
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Label vector does not align with the sample vector
    #[error("label count {labels} does not match sample count {samples}")]
    LabelLenMismatch { samples: usize, labels: usize },

    /// Batch size of zero can never yield a batch
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
}
