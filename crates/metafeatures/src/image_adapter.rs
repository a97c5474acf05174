//! Image Modality Adapter

use std::sync::Arc;

use chrono::Utc;
use image::DynamicImage;
use ndarray::Array2;
use tracing::debug;
use uuid::Uuid;

use batch_sampler::{BatchSource, ImageBatch, SampleBuffer};
use embedding_summary::{encode_in_chunks, Backbone, EmbeddingSummarizer};
use mfe_battery::{Battery, MfeInput, MfeReport};
use stat_features::ImageStatistics;

use crate::adapter::factorize;
use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::properties::{class_distribution, image_properties, ModalityProperties, PropertySet};
use crate::record::{MetafeatureRecord, Modality, Provenance};
use crate::stage;

/// Thumbnail edge for the battery's per-image descriptor rows
const MFE_THUMBNAIL_EDGE: u32 = 32;

/// Extracts one `MetafeatureRecord` from an image dataset.
///
/// The embedding backbone is an external collaborator; without one the
/// record simply omits its `embedding` section.
pub struct ImageAdapter {
    source: Box<dyn BatchSource<Batch = ImageBatch>>,
    backbone: Option<Arc<dyn Backbone<DynamicImage>>>,
    config: ExtractionConfig,
}

impl ImageAdapter {
    pub fn new(
        source: impl BatchSource<Batch = ImageBatch> + 'static,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            source: Box::new(source),
            backbone: None,
            config,
        }
    }

    /// Attach a vision embedding backbone
    pub fn with_backbone(mut self, backbone: Arc<dyn Backbone<DynamicImage>>) -> Self {
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

        let (images, labels, buffer_stats) = buffer.into_parts();
        debug!(
            images = images.len(),
            batches = buffer_stats.batches_drawn,
            "image sample buffered"
        );
        let images = Arc::new(images);
        let labels = Arc::new(labels);

        let battery_version = self.config.battery_version;
        let class_cap = self.config.class_cardinality_cap;

        let statistics_task = stage::run("statistics", {
            let images = images.clone();
            move || Ok(ImageStatistics::compute(&images))
        });

        let mfe_task = stage::run("mfe", {
            let images = images.clone();
            let labels = labels.clone();
            move || {
                let battery = Battery::new(battery_version).map_err(|e| e.to_string())?;
                let matrix = descriptor_matrix(&images);
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
                    let images = images.clone();
                    Some(
                        stage::run("embedding", move || {
                            let (chunks, dropped) =
                                encode_in_chunks(backbone.as_ref(), &images, chunk_size);
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
            ImageStatistics::default()
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
            sample_count: images.len(),
            class_distribution: class_distribution(labels.as_deref(), class_cap),
            detail: ModalityProperties::Image(image_properties(&images)),
            statistics: statistics.flatten(),
        };

        Ok(MetafeatureRecord {
            provenance: Provenance {
                record_id: Uuid::new_v4(),
                modality: Modality::Image,
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

/// Battery input: one descriptor row per image
fn descriptor_matrix(images: &[DynamicImage]) -> Array2<f64> {
    let mut matrix = Array2::zeros((images.len(), 8));

    for (r, image) in images.iter().enumerate() {
        let thumb = image.thumbnail(MFE_THUMBNAIL_EDGE, MFE_THUMBNAIL_EDGE);

        let gray = thumb.to_luma8();
        let n = gray.pixels().len().max(1) as f64;
        let gray_sum: f64 = gray.pixels().map(|p| p.0[0] as f64 / 255.0).sum();
        let gray_mean = gray_sum / n;
        let gray_var = gray
            .pixels()
            .map(|p| {
                let v = p.0[0] as f64 / 255.0 - gray_mean;
                v * v
            })
            .sum::<f64>()
            / n;

        let rgb = thumb.to_rgb8();
        let mut channel_sum = [0.0f64; 3];
        for pixel in rgb.pixels() {
            for c in 0..3 {
                channel_sum[c] += pixel.0[c] as f64 / 255.0;
            }
        }
        let rgb_n = rgb.pixels().len().max(1) as f64;

        let (w, h) = (image.width() as f64, image.height() as f64);
        matrix[(r, 0)] = w;
        matrix[(r, 1)] = h;
        matrix[(r, 2)] = if h > 0.0 { w / h } else { 0.0 };
        matrix[(r, 3)] = gray_mean;
        matrix[(r, 4)] = gray_var.sqrt();
        matrix[(r, 5)] = channel_sum[0] / rgb_n;
        matrix[(r, 6)] = channel_sum[1] / rgb_n;
        matrix[(r, 7)] = channel_sum[2] / rgb_n;
    }

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use batch_sampler::{InMemoryImageSource, Label};
    use embedding_summary::HashingImageBackbone;
    use image::{Rgb, RgbImage};

    use crate::schema;

    fn varied_images(n: usize) -> Vec<DynamicImage> {
        (0..n)
            .map(|i| {
                let w = 16 + (i as u32 % 5) * 8;
                let h = 16 + (i as u32 % 3) * 8;
                DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
                    Rgb([
                        ((x * 3 + i as u32) % 256) as u8,
                        ((y * 5) % 256) as u8,
                        ((x + y + i as u32) % 256) as u8,
                    ])
                }))
            })
            .collect()
    }

    fn labeled_source(n: usize, batch: usize) -> InMemoryImageSource {
        let labels: Vec<Label> = (0..n).map(|i| Label::Int((i % 4) as i64)).collect();
        InMemoryImageSource::with_labels(varied_images(n), Some(labels), batch).unwrap()
    }

    #[tokio::test]
    async fn test_record_matches_image_schema() {
        let adapter = ImageAdapter::new(labeled_source(12, 4), ExtractionConfig::testing())
            .with_backbone(Arc::new(HashingImageBackbone::new(32)));
        let record = adapter.extract().await.unwrap();

        schema::validate(&record).unwrap();
        assert!(record.embedding.is_some());
        assert!(record.features.is_none());
        assert!(record.provenance.degraded.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_dimension_is_backbone_fixed() {
        let adapter = ImageAdapter::new(labeled_source(10, 3), ExtractionConfig::testing())
            .with_backbone(Arc::new(HashingImageBackbone::new(48)));
        let record = adapter.extract().await.unwrap();

        let embedding = record.embedding.unwrap();
        assert_eq!(embedding.dimension, 48);
        assert_eq!(embedding.mean.len(), 48);
        assert_eq!(embedding.variance.len(), 48);
        assert_eq!(embedding.sample_count, record.properties.sample_count);
    }

    #[tokio::test]
    async fn test_without_backbone_embedding_is_omitted() {
        let adapter = ImageAdapter::new(labeled_source(6, 2), ExtractionConfig::testing());
        let record = adapter.extract().await.unwrap();

        assert!(record.embedding.is_none());
        assert!(record.provenance.degraded.is_empty());
        schema::validate(&record).unwrap();
    }

    #[tokio::test]
    async fn test_testing_mode_batch_cap_applies() {
        let adapter = ImageAdapter::new(labeled_source(50, 4), ExtractionConfig::testing());
        let record = adapter.extract().await.unwrap();

        assert!(record.provenance.batches_drawn <= 2);
        assert_eq!(record.properties.sample_count, 8);
    }

    #[tokio::test]
    async fn test_empty_dataset_is_fatal() {
        let source = InMemoryImageSource::new(Vec::new(), 4).unwrap();
        let err = ImageAdapter::new(source, ExtractionConfig::testing())
            .extract()
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::EmptyDataset));
    }

    #[tokio::test]
    async fn test_shape_properties_reflect_buffered_images() {
        let adapter = ImageAdapter::new(labeled_source(8, 8), ExtractionConfig::testing());
        let record = adapter.extract().await.unwrap();

        match &record.properties.detail {
            ModalityProperties::Image(detail) => {
                assert!(detail.width_min >= 16);
                assert!(detail.width_max <= 48);
                assert_eq!(detail.color_channels, 3);
            }
            other => panic!("unexpected detail {other:?}"),
        }
    }

    struct AlwaysFailingBackbone;

    impl Backbone<DynamicImage> for AlwaysFailingBackbone {
        fn dimension(&self) -> usize {
            8
        }

        fn encode(
            &self,
            _samples: &[DynamicImage],
        ) -> Result<Array2<f32>, embedding_summary::BackboneError> {
            Err(embedding_summary::BackboneError::Inference(
                "backbone offline".to_string(),
            ))
        }
    }

    #[tokio::test]
    async fn test_total_backbone_failure_degrades_embedding_only() {
        let adapter = ImageAdapter::new(labeled_source(6, 2), ExtractionConfig::testing())
            .with_backbone(Arc::new(AlwaysFailingBackbone));
        let record = adapter.extract().await.unwrap();

        assert!(record.embedding.is_none());
        assert_eq!(record.provenance.degraded.len(), 1);
        assert_eq!(record.provenance.degraded[0].stage, "embedding");
        assert!(!record.mfe.values.is_empty());
    }
}
