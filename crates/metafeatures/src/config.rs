//! Extraction configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::record::ExtractionMode;

/// Extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Extraction mode (testing caps hard, full caps loosely)
    pub mode: ExtractionMode,

    /// Sample cap in testing mode
    pub testing_sample_cap: usize,

    /// Batch cap in testing mode
    pub testing_batch_cap: usize,

    /// Sample cap in full mode
    pub full_sample_cap: usize,

    /// General metafeature battery version
    pub battery_version: u32,

    /// Singular values kept in the embedding summary
    pub embedding_top_k: usize,

    /// Samples per backbone encode call
    pub embedding_chunk_size: usize,

    /// Most distinct labels still reported as a class distribution
    pub class_cardinality_cap: usize,

    /// Most distinct values an integral column may hold and stay categorical
    pub categorical_cardinality_cap: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::Full,
            testing_sample_cap: 32,
            testing_batch_cap: 2,
            full_sample_cap: 4096,
            battery_version: 1,
            embedding_top_k: 8,
            embedding_chunk_size: 16,
            class_cardinality_cap: 32,
            categorical_cardinality_cap: 20,
        }
    }
}

impl ExtractionConfig {
    /// Fast, sample-capped configuration for validation runs
    pub fn testing() -> Self {
        Self {
            mode: ExtractionMode::Testing,
            ..Default::default()
        }
    }

    /// Representative-sample configuration
    pub fn full() -> Self {
        Self::default()
    }

    /// Load from a file, with `METAFEATURES__`-prefixed environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("METAFEATURES").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Sample cap for the configured mode
    pub fn sample_cap(&self) -> usize {
        match self.mode {
            ExtractionMode::Testing => self.testing_sample_cap,
            ExtractionMode::Full => self.full_sample_cap,
        }
    }

    /// Batch cap for the configured mode
    pub fn batch_cap(&self) -> Option<usize> {
        match self.mode {
            ExtractionMode::Testing => Some(self.testing_batch_cap),
            ExtractionMode::Full => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testing_mode_caps() {
        let config = ExtractionConfig::testing();
        assert_eq!(config.sample_cap(), 32);
        assert_eq!(config.batch_cap(), Some(2));
    }

    #[test]
    fn test_full_mode_caps() {
        let config = ExtractionConfig::full();
        assert_eq!(config.sample_cap(), 4096);
        assert_eq!(config.batch_cap(), None);
    }
}
