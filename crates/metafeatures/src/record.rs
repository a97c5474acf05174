//! Metafeature record and provenance

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use embedding_summary::EmbeddingSummary;
use mfe_battery::MfeReport;
use stat_features::ColumnFeatures;

use crate::properties::PropertySet;

/// Data type category of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Image,
    Tabular,
    Text,
}

impl Modality {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Image => "image",
            Modality::Tabular => "tabular",
            Modality::Text => "text",
        }
    }
}

/// Extraction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Bounded, fast path for validation runs
    Testing,
    /// Representative sample up to the configured cap
    Full,
}

/// One extractor stage absorbed as absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    /// Stage name (`statistics`, `mfe`, `embedding`, `features`)
    pub stage: String,
    /// Human-readable reason
    pub reason: String,
}

/// Provenance of one extraction call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    /// Record identity
    pub record_id: Uuid,
    /// Modality that produced the record
    pub modality: Modality,
    /// Mode the extraction ran under
    pub mode: ExtractionMode,
    /// Battery version behind the `mfe` section
    pub battery_version: u32,
    /// When the record was assembled
    pub extracted_at: DateTime<Utc>,
    /// Batches pulled from the dataset collaborator
    pub batches_drawn: usize,
    /// True when a sample cap cut the dataset off
    pub truncated: bool,
    /// Stages absorbed as absent rather than failing the call
    pub degraded: Vec<StageFailure>,
}

/// Per-column statistical descriptors for a tabular dataset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnFeatureSet {
    /// `column_<index>` to descriptor
    pub columns: BTreeMap<String, ColumnFeatures>,
}

/// The unified metafeature record.
///
/// An immutable snapshot, fully populated before being returned. Image and
/// text records carry `properties`, `mfe` and (when a backbone is
/// configured) `embedding`; tabular records carry `properties`, `mfe` and
/// `features`, never `embedding`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetafeatureRecord {
    pub provenance: Provenance,
    pub properties: PropertySet,
    pub mfe: MfeReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<ColumnFeatureSet>,
}

impl MetafeatureRecord {
    /// Flatten to a single numeric map for cross-dataset tabulation.
    ///
    /// Undefined statistics and skipped algorithms are dropped, not
    /// emitted as sentinels.
    pub fn to_flat_map(&self) -> BTreeMap<String, f64> {
        let mut flat = BTreeMap::new();

        flat.insert(
            "properties.sample_count".to_string(),
            self.properties.sample_count as f64,
        );
        for (key, value) in &self.properties.statistics {
            if let Some(value) = value {
                flat.insert(format!("properties.{key}"), *value);
            }
        }

        for (key, value) in &self.mfe.values {
            flat.insert(format!("mfe.{key}"), *value);
        }

        if let Some(embedding) = &self.embedding {
            flat.insert("embedding.dimension".to_string(), embedding.dimension as f64);
            flat.insert(
                "embedding.sample_count".to_string(),
                embedding.sample_count as f64,
            );
            let mean_norm = embedding.mean.iter().map(|v| v * v).sum::<f64>().sqrt();
            flat.insert("embedding.mean_norm".to_string(), mean_norm);
            if !embedding.variance.is_empty() {
                let variance_mean =
                    embedding.variance.iter().sum::<f64>() / embedding.variance.len() as f64;
                flat.insert("embedding.variance_mean".to_string(), variance_mean);
            }
            for (i, sv) in embedding.singular_values.iter().enumerate() {
                flat.insert(format!("embedding.singular_value_{i}"), *sv);
            }
        }

        if let Some(features) = &self.features {
            for (column, descriptor) in &features.columns {
                for (key, value) in descriptor.flatten() {
                    if let Some(value) = value {
                        flat.insert(format!("features.{column}.{key}"), value);
                    }
                }
            }
        }

        flat
    }
}
