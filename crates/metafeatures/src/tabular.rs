//! Tabular Modality Adapter

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use ndarray::Array2;
use tracing::debug;
use uuid::Uuid;

use batch_sampler::{BatchSource, Label, RowBatch, SampleBuffer};
use mfe_battery::{Battery, MfeInput, MfeReport};
use stat_features::{column_major, mean_abs_correlation, ColumnFeatures};

use crate::adapter::factorize;
use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::properties::{
    class_distribution, infer_column_types, ModalityProperties, PropertySet, TabularProperties,
};
use crate::record::{ColumnFeatureSet, MetafeatureRecord, Modality, Provenance};
use crate::schema;
use crate::stage;

/// Extracts one `MetafeatureRecord` from a tabular dataset.
///
/// Tabular records carry per-column `features` instead of an embedding
/// section; there is no generic tabular backbone.
pub struct TabularAdapter {
    source: Box<dyn BatchSource<Batch = RowBatch>>,
    config: ExtractionConfig,
}

impl TabularAdapter {
    pub fn new(
        source: impl BatchSource<Batch = RowBatch> + 'static,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            source: Box::new(source),
            config,
        }
    }

    /// Run the full extraction, consuming the adapter
    pub async fn extract(mut self) -> Result<MetafeatureRecord, ExtractError> {
        let buffer = SampleBuffer::fill(
            self.source.as_mut(),
            self.config.sample_cap(),
            self.config.batch_cap(),
        );
        if buffer.is_empty() {
            return Err(ExtractError::EmptyDataset);
        }

        let (rows, labels, buffer_stats) = buffer.into_parts();
        debug!(
            rows = rows.len(),
            batches = buffer_stats.batches_drawn,
            "tabular sample buffered"
        );
        let rows = Arc::new(rows);
        let labels = Arc::new(labels);

        let categorical_cap = self.config.categorical_cardinality_cap;
        let battery_version = self.config.battery_version;
        let class_cap = self.config.class_cardinality_cap;

        let features_task = stage::run("features", {
            let rows = rows.clone();
            move || {
                let columns = column_major(&rows);
                let mut map = BTreeMap::new();
                for (i, column) in columns.iter().enumerate() {
                    map.insert(
                        format!("column_{i}"),
                        ColumnFeatures::compute(column, categorical_cap),
                    );
                }
                Ok(ColumnFeatureSet { columns: map })
            }
        });

        let statistics_task = stage::run("statistics", {
            let rows = rows.clone();
            move || Ok(dataset_statistics(&rows))
        });

        let mfe_task = stage::run("mfe", {
            let rows = rows.clone();
            let labels = labels.clone();
            move || {
                let battery = Battery::new(battery_version).map_err(|e| e.to_string())?;
                let input = mfe_input(&rows, labels.as_deref(), class_cap)?;
                Ok(battery.run(&input))
            }
        });

        let (features_r, statistics_r, mfe_r) =
            tokio::join!(features_task, statistics_task, mfe_task);

        let mut degraded = Vec::new();
        let features = features_r.unwrap_or_else(|failure| {
            degraded.push(failure);
            ColumnFeatureSet::default()
        });
        let statistics = statistics_r.unwrap_or_else(|failure| {
            degraded.push(failure);
            empty_statistics()
        });
        let mfe = mfe_r.unwrap_or_else(|failure| {
            degraded.push(failure);
            MfeReport::empty(battery_version)
        });

        let columns = column_major(&rows);
        let properties = PropertySet {
            sample_count: rows.len(),
            class_distribution: class_distribution(labels.as_deref(), class_cap),
            detail: ModalityProperties::Tabular(TabularProperties {
                feature_count: columns.len(),
                column_types: infer_column_types(&columns, categorical_cap),
            }),
            statistics,
        };

        Ok(MetafeatureRecord {
            provenance: Provenance {
                record_id: Uuid::new_v4(),
                modality: Modality::Tabular,
                mode: self.config.mode,
                battery_version,
                extracted_at: Utc::now(),
                batches_drawn: buffer_stats.batches_drawn,
                truncated: buffer_stats.truncated,
                degraded,
            },
            properties,
            mfe,
            embedding: None,
            features: Some(features),
        })
    }
}

/// Dataset-level statistical block (fixed keys)
fn dataset_statistics(rows: &[Vec<f64>]) -> BTreeMap<String, Option<f64>> {
    let columns = column_major(rows);

    let total_cells: usize = columns.iter().map(Vec::len).sum();
    let missing_cells: usize = columns
        .iter()
        .flat_map(|c| c.iter())
        .filter(|v| !v.is_finite())
        .count();
    let missing_cell_rate = if total_cells > 0 {
        Some(missing_cells as f64 / total_cells as f64)
    } else {
        None
    };

    let mut map = BTreeMap::new();
    map.insert("cor_mean".to_string(), mean_abs_correlation(&columns));
    map.insert("missing_cell_rate".to_string(), missing_cell_rate);
    map
}

fn empty_statistics() -> BTreeMap<String, Option<f64>> {
    schema::TABULAR_STATISTICAL_KEYS
        .iter()
        .map(|k| (k.to_string(), None))
        .collect()
}

/// Battery input: buffered rows with missing cells imputed by column mean
fn mfe_input(
    rows: &[Vec<f64>],
    labels: Option<&[Label]>,
    class_cap: usize,
) -> Result<MfeInput, String> {
    let columns = column_major(rows);
    let nrows = rows.len();
    let ncols = columns.len();

    let mut matrix = Array2::zeros((nrows, ncols));
    for (c, column) in columns.iter().enumerate() {
        let finite: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
        let column_mean = if finite.is_empty() {
            0.0
        } else {
            finite.iter().sum::<f64>() / finite.len() as f64
        };
        for (r, &value) in column.iter().enumerate() {
            matrix[(r, c)] = if value.is_finite() { value } else { column_mean };
        }
    }

    let class_ids = labels.and_then(|l| factorize(l, class_cap));
    MfeInput::new(matrix, class_ids).map_err(|e| e.to_string())
}
