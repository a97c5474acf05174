//! Battery Composition and Execution

use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::{Algorithm, BATTERY_V1};
use crate::MfeError;

/// Newest battery version this crate knows
pub const LATEST_BATTERY_VERSION: u32 = 1;

/// Numeric representation a modality adapter feeds into the battery
#[derive(Debug, Clone)]
pub struct MfeInput {
    /// Rows are samples, columns are numeric attributes
    pub matrix: Array2<f64>,
    /// Class id per row, when the dataset is labeled
    pub labels: Option<Vec<usize>>,
}

impl MfeInput {
    pub fn new(matrix: Array2<f64>, labels: Option<Vec<usize>>) -> Result<Self, MfeError> {
        if let Some(labels) = &labels {
            if labels.len() != matrix.nrows() {
                return Err(MfeError::LabelLenMismatch {
                    rows: matrix.nrows(),
                    labels: labels.len(),
                });
            }
        }
        Ok(Self { matrix, labels })
    }

    /// Unlabeled input
    pub fn unlabeled(matrix: Array2<f64>) -> Self {
        Self {
            matrix,
            labels: None,
        }
    }
}

/// Result of one battery run.
///
/// `values` holds computed meta-features under namespaced keys; `skipped`
/// names every algorithm that did not produce a value and why. Their key
/// sets always partition the battery's key universe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MfeReport {
    /// Battery version that produced the report
    pub version: u32,
    /// Computed meta-feature values
    pub values: BTreeMap<String, f64>,
    /// Algorithm name to skip reason
    pub skipped: BTreeMap<String, String>,
}

impl MfeReport {
    /// Report with no computed values
    pub fn empty(version: u32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }
}

/// A fixed, versioned battery of meta-feature algorithms
pub struct Battery {
    version: u32,
    algorithms: &'static [Algorithm],
}

impl Battery {
    /// Battery under the given version
    pub fn new(version: u32) -> Result<Self, MfeError> {
        match version {
            1 => Ok(Self {
                version: 1,
                algorithms: BATTERY_V1,
            }),
            other => Err(MfeError::UnknownVersion(other)),
        }
    }

    /// Current battery
    pub fn latest() -> Self {
        Self {
            version: LATEST_BATTERY_VERSION,
            algorithms: BATTERY_V1,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Full key universe of this battery, in declaration order
    pub fn keys(&self) -> Vec<&'static str> {
        self.algorithms.iter().map(|a| a.name).collect()
    }

    /// Run every applicable algorithm against the input
    pub fn run(&self, input: &MfeInput) -> MfeReport {
        let mut report = MfeReport::empty(self.version);

        for algorithm in self.algorithms {
            if algorithm.needs_labels && input.labels.is_none() {
                report
                    .skipped
                    .insert(algorithm.name.to_string(), "requires labels".to_string());
                continue;
            }
            if input.matrix.ncols() < algorithm.min_columns {
                report.skipped.insert(
                    algorithm.name.to_string(),
                    format!("requires at least {} columns", algorithm.min_columns),
                );
                continue;
            }
            if input.matrix.nrows() < algorithm.min_rows {
                report.skipped.insert(
                    algorithm.name.to_string(),
                    format!("requires at least {} rows", algorithm.min_rows),
                );
                continue;
            }

            match (algorithm.run)(input) {
                Some(value) if value.is_finite() => {
                    report.values.insert(algorithm.name.to_string(), value);
                }
                _ => {
                    report.skipped.insert(
                        algorithm.name.to_string(),
                        "undefined on the buffered sample".to_string(),
                    );
                }
            }
        }

        debug!(
            version = self.version,
            computed = report.values.len(),
            skipped = report.skipped.len(),
            "battery run complete"
        );
        report
    }
}
