//! Text Modality Adapter

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use ndarray::Array2;
use tracing::debug;
use uuid::Uuid;

use batch_sampler::{BatchSource, SampleBuffer, TextBatch};
use embedding_summary::{encode_in_chunks, Backbone, EmbeddingSummarizer};
use mfe_battery::{Battery, MfeInput, MfeReport};
use stat_features::{tokenize, TextStatistics};

use crate::adapter::factorize;
use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::properties::{class_distribution, text_properties, ModalityProperties, PropertySet};
use crate::record::{MetafeatureRecord, Modality, Provenance};
use crate::stage;

/// Extracts one `MetafeatureRecord` from a text dataset.
pub struct TextAdapter {
    source: Box<dyn BatchSource<Batch = TextBatch>>,
    backbone: Option<Arc<dyn Backbone<String>>>,
    config: ExtractionConfig,
}

impl TextAdapter {
    pub fn new(
        source: impl BatchSource<Batch = TextBatch> + 'static,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            source: Box::new(source),
            backbone: None,
            config,
        }
    }

    /// Attach a language embedding backbone
    pub fn with_backbone(mut self, backbone: Arc<dyn Backbone<String>>) -> Self {
        self.backbone = Some(backbone);
        self
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

        let (texts, labels, buffer_stats) = buffer.into_parts();
        debug!(
            documents = texts.len(),
            batches = buffer_stats.batches_drawn,
            "text sample buffered"
        );
        let texts = Arc::new(texts);
        let labels = Arc::new(labels);

        let battery_version = self.config.battery_version;
        let class_cap = self.config.class_cardinality_cap;

        let statistics_task = stage::run("statistics", {
            let texts = texts.clone();
            move || Ok(TextStatistics::compute(&texts))
        });

        let mfe_task = stage::run("mfe", {
            let texts = texts.clone();
            let labels = labels.clone();
            move || {
                let battery = Battery::new(battery_version).map_err(|e| e.to_string())?;
                let matrix = descriptor_matrix(&texts);
                let class_ids = labels.as_deref().and_then(|l| factorize(l, class_cap));
                let input = MfeInput::new(matrix, class_ids).map_err(|e| e.to_string())?;
                Ok(battery.run(&input))
            }
        });

        let backbone = self.backbone.clone();
        let top_k = self.config.embedding_top_k;
        let chunk_size = self.config.embedding_chunk_size;
        let embedding_task = async {
            match backbone {
                Some(backbone) => {
                    let texts = texts.clone();
                    Some(
                        stage::run("embedding", move || {
                            let (chunks, dropped) =
                                encode_in_chunks(backbone.as_ref(), &texts, chunk_size);
                            if chunks.is_empty() {
                                return Err(format!(
                                    "backbone failed on all {dropped} samples"
                                ));
                            }
                            EmbeddingSummarizer::new(top_k)
                                .summarize(&chunks)
                                .map_err(|e| e.to_string())
                        })
                        .await,
                    )
                }
                None => None,
            }
        };

        let (statistics_r, mfe_r, embedding_r) =
            tokio::join!(statistics_task, mfe_task, embedding_task);

        let mut degraded = Vec::new();
        let statistics = statistics_r.unwrap_or_else(|failure| {
            degraded.push(failure);
            TextStatistics::default()
        });
        let mfe = mfe_r.unwrap_or_else(|failure| {
            degraded.push(failure);
            MfeReport::empty(battery_version)
        });
        let embedding = match embedding_r {
            Some(Ok(summary)) => Some(summary),
            Some(Err(failure)) => {
                degraded.push(failure);
                None
            }
            None => None,
        };

        let properties = PropertySet {
            sample_count: texts.len(),
            class_distribution: class_distribution(labels.as_deref(), class_cap),
            detail: ModalityProperties::Text(text_properties(&texts)),
            statistics: statistics.flatten(),
        };

        Ok(MetafeatureRecord {
            provenance: Provenance {
                record_id: Uuid::new_v4(),
                modality: Modality::Text,
                mode: self.config.mode,
                battery_version,
                extracted_at: Utc::now(),
                batches_drawn: buffer_stats.batches_drawn,
                truncated: buffer_stats.truncated,
                degraded,
            },
            properties,
            mfe,
            embedding,
            features: None,
        })
    }
}

/// Battery input: one descriptor row per document
fn descriptor_matrix(texts: &[String]) -> Array2<f64> {
    let mut matrix = Array2::zeros((texts.len(), 6));

    for (r, text) in texts.iter().enumerate() {
        let chars: Vec<char> = text.chars().collect();
        let tokens = tokenize(text);

        let char_len = chars.len() as f64;
        let token_count = tokens.len() as f64;
        let mean_token_len = if tokens.is_empty() {
            0.0
        } else {
            tokens.iter().map(|t| t.chars().count() as f64).sum::<f64>() / token_count
        };
        let unique: HashSet<&String> = tokens.iter().collect();
        let unique_ratio = if tokens.is_empty() {
            0.0
        } else {
            unique.len() as f64 / token_count
        };
        let digit_ratio = if chars.is_empty() {
            0.0
        } else {
            chars.iter().filter(|c| c.is_ascii_digit()).count() as f64 / char_len
        };
        let upper_ratio = if chars.is_empty() {
            0.0
        } else {
            chars.iter().filter(|c| c.is_uppercase()).count() as f64 / char_len
        };

        matrix[(r, 0)] = char_len;
        matrix[(r, 1)] = token_count;
        matrix[(r, 2)] = mean_token_len;
        matrix[(r, 3)] = unique_ratio;
        matrix[(r, 4)] = digit_ratio;
        matrix[(r, 5)] = upper_ratio;
    }

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use batch_sampler::{InMemoryTextSource, Label};
    use embedding_summary::HashingTextBackbone;

    use crate::schema;

    fn corpus(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| {
                format!(
                    "Document {i} talks about {} and number {}",
                    if i % 2 == 0 { "storage engines" } else { "model training" },
                    i * 17
                )
            })
            .collect()
    }

    fn labeled_source(n: usize, batch: usize) -> InMemoryTextSource {
        let labels: Vec<Label> = (0..n)
            .map(|i| {
                Label::Text(if i % 2 == 0 { "systems" } else { "ml" }.to_string())
            })
            .collect();
        InMemoryTextSource::with_labels(corpus(n), Some(labels), batch).unwrap()
    }

    #[tokio::test]
    async fn test_record_matches_text_schema() {
        let adapter = TextAdapter::new(labeled_source(10, 4), ExtractionConfig::testing())
            .with_backbone(Arc::new(HashingTextBackbone::new(32)));
        let record = adapter.extract().await.unwrap();

        schema::validate(&record).unwrap();
        assert!(record.embedding.is_some());
        assert!(record.features.is_none());
        assert!(record.provenance.degraded.is_empty());
    }

    #[tokio::test]
    async fn test_class_distribution_from_string_labels() {
        let adapter = TextAdapter::new(labeled_source(10, 5), ExtractionConfig::testing());
        let record = adapter.extract().await.unwrap();

        let dist = record.properties.class_distribution.as_ref().unwrap();
        assert_eq!(dist["systems"], 5);
        assert_eq!(dist["ml"], 5);
        assert!(record.mfe.values.contains_key("info.class_entropy"));
    }

    #[tokio::test]
    async fn test_sequence_length_statistics_present() {
        let adapter = TextAdapter::new(labeled_source(8, 4), ExtractionConfig::testing());
        let record = adapter.extract().await.unwrap();

        let stats = &record.properties.statistics;
        assert!(stats["seq_len_mean"].unwrap() > 0.0);
        assert!(stats["vocabulary_size"].unwrap() > 0.0);
        assert!(stats["token_entropy"].unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_empty_dataset_is_fatal() {
        let source = InMemoryTextSource::new(Vec::new(), 4).unwrap();
        let err = TextAdapter::new(source, ExtractionConfig::testing())
            .extract()
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::EmptyDataset));
    }

    #[tokio::test]
    async fn test_embedding_dimension_is_backbone_fixed() {
        let adapter = TextAdapter::new(labeled_source(6, 3), ExtractionConfig::testing())
            .with_backbone(Arc::new(HashingTextBackbone::new(24)));
        let record = adapter.extract().await.unwrap();

        let embedding = record.embedding.unwrap();
        assert_eq!(embedding.dimension, 24);
        assert_eq!(embedding.mean.len(), 24);
    }

    #[tokio::test]
    async fn test_full_mode_buffers_whole_small_corpus() {
        let adapter = TextAdapter::new(labeled_source(20, 6), ExtractionConfig::full());
        let record = adapter.extract().await.unwrap();

        assert_eq!(record.properties.sample_count, 20);
        assert!(!record.provenance.truncated);
    }
}
