//! General Meta-Feature Battery
//!
//! Runs a fixed, versioned collection of general-purpose meta-feature
//! algorithms against a numeric matrix representation of a dataset. The
//! battery composition is deterministic for a version, independent of
//! dataset content; downstream consumers rely on the key set for feature
//! alignment across datasets.

mod algorithms;
mod battery;

pub use battery::{Battery, MfeInput, MfeReport, LATEST_BATTERY_VERSION};

use thiserror::Error;

/// Errors constructing battery input
#[derive(Debug, Clone, Error)]
pub enum MfeError {
    /// Class id vector does not align with the matrix rows
    #[error("label count {labels} does not match row count {rows}")]
    LabelLenMismatch { rows: usize, labels: usize },

    /// No battery registered under the requested version
    #[error("unknown battery version {0}")]
    UnknownVersion(u32),
}
