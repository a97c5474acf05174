//! Extraction Error Types

use thiserror::Error;

/// Fatal extraction errors.
///
/// Everything else (single-stage failures, backbone trouble, undefined
/// statistics) is absorbed into the record as absent data and never raised.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The dataset collaborator yielded no samples at all
    #[error("dataset produced no samples")]
    EmptyDataset,
}
