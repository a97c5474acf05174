//! Dataset collaborator contract and in-memory sources

use image::DynamicImage;

use crate::batch::{ImageBatch, Label, RowBatch, SampleBatch, TextBatch};
use crate::SourceError;

/// A dataset collaborator yielding bounded batches.
///
/// The engine never owns the underlying dataset; it only pulls batches until
/// a sample cap or exhaustion. A source without a length hint is treated as
/// "unknown, sample until cap or exhaustion".
pub trait BatchSource: Send {
    type Batch: SampleBatch;

    /// Next batch, or `None` once the dataset is exhausted
    fn next_batch(&mut self) -> Option<Self::Batch>;

    /// Total sample count, when known
    fn len_hint(&self) -> Option<usize> {
        None
    }
}

/// In-memory image source with a fixed batch size
pub struct InMemoryImageSource {
    images: Vec<DynamicImage>,
    labels: Option<Vec<Label>>,
    batch_size: usize,
    cursor: usize,
}

impl InMemoryImageSource {
    pub fn new(images: Vec<DynamicImage>, batch_size: usize) -> Result<Self, SourceError> {
        Self::with_labels(images, None, batch_size)
    }

    pub fn with_labels(
        images: Vec<DynamicImage>,
        labels: Option<Vec<Label>>,
        batch_size: usize,
    ) -> Result<Self, SourceError> {
        if batch_size == 0 {
            return Err(SourceError::ZeroBatchSize);
        }
        if let Some(labels) = &labels {
            if labels.len() != images.len() {
                return Err(SourceError::LabelLenMismatch {
                    samples: images.len(),
                    labels: labels.len(),
                });
            }
        }
        Ok(Self {
            images,
            labels,
            batch_size,
            cursor: 0,
        })
    }
}

impl BatchSource for InMemoryImageSource {
    type Batch = ImageBatch;

    fn next_batch(&mut self) -> Option<ImageBatch> {
        let start = self.cursor;
        if start >= self.images.len() {
            return None;
        }
        let end = (start + self.batch_size).min(self.images.len());
        self.cursor = end;
        Some(ImageBatch {
            images: self.images[start..end].to_vec(),
            labels: self.labels.as_ref().map(|l| l[start..end].to_vec()),
        })
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.images.len())
    }
}

/// In-memory tabular source with a fixed batch size
#[derive(Debug)]
pub struct InMemoryRowSource {
    rows: Vec<Vec<f64>>,
    targets: Option<Vec<f64>>,
    batch_size: usize,
    cursor: usize,
}

impl InMemoryRowSource {
    pub fn new(rows: Vec<Vec<f64>>, batch_size: usize) -> Result<Self, SourceError> {
        Self::with_targets(rows, None, batch_size)
    }

    pub fn with_targets(
        rows: Vec<Vec<f64>>,
        targets: Option<Vec<f64>>,
        batch_size: usize,
    ) -> Result<Self, SourceError> {
        if batch_size == 0 {
            return Err(SourceError::ZeroBatchSize);
        }
        if let Some(targets) = &targets {
            if targets.len() != rows.len() {
                return Err(SourceError::LabelLenMismatch {
                    samples: rows.len(),
                    labels: targets.len(),
                });
            }
        }
        Ok(Self {
            rows,
            targets,
            batch_size,
            cursor: 0,
        })
    }
}

impl BatchSource for InMemoryRowSource {
    type Batch = RowBatch;

    fn next_batch(&mut self) -> Option<RowBatch> {
        let start = self.cursor;
        if start >= self.rows.len() {
            return None;
        }
        let end = (start + self.batch_size).min(self.rows.len());
        self.cursor = end;
        Some(RowBatch {
            rows: self.rows[start..end].to_vec(),
            targets: self.targets.as_ref().map(|t| t[start..end].to_vec()),
        })
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.rows.len())
    }
}

/// In-memory text source with a fixed batch size
#[derive(Debug)]
pub struct InMemoryTextSource {
    texts: Vec<String>,
    labels: Option<Vec<Label>>,
    batch_size: usize,
    cursor: usize,
}

impl InMemoryTextSource {
    pub fn new(texts: Vec<String>, batch_size: usize) -> Result<Self, SourceError> {
        Self::with_labels(texts, None, batch_size)
    }

    pub fn with_labels(
        texts: Vec<String>,
        labels: Option<Vec<Label>>,
        batch_size: usize,
    ) -> Result<Self, SourceError> {
        if batch_size == 0 {
            return Err(SourceError::ZeroBatchSize);
        }
        if let Some(labels) = &labels {
            if labels.len() != texts.len() {
                return Err(SourceError::LabelLenMismatch {
                    samples: texts.len(),
                    labels: labels.len(),
                });
            }
        }
        Ok(Self {
            texts,
            labels,
            batch_size,
            cursor: 0,
        })
    }
}

impl BatchSource for InMemoryTextSource {
    type Batch = TextBatch;

    fn next_batch(&mut self) -> Option<TextBatch> {
        let start = self.cursor;
        if start >= self.texts.len() {
            return None;
        }
        let end = (start + self.batch_size).min(self.texts.len());
        self.cursor = end;
        Some(TextBatch {
            texts: self.texts[start..end].to_vec(),
            labels: self.labels.as_ref().map(|l| l[start..end].to_vec()),
        })
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.texts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_source_batching() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let mut source = InMemoryRowSource::new(rows, 4).unwrap();

        assert_eq!(source.len_hint(), Some(10));
        assert_eq!(source.next_batch().unwrap().len(), 4);
        assert_eq!(source.next_batch().unwrap().len(), 4);
        assert_eq!(source.next_batch().unwrap().len(), 2);
        assert!(source.next_batch().is_none());
    }

    #[test]
    fn test_target_len_mismatch_rejected() {
        let rows = vec![vec![1.0], vec![2.0]];
        let err = InMemoryRowSource::with_targets(rows, Some(vec![0.0]), 2).unwrap_err();
        assert!(matches!(
            err,
            SourceError::LabelLenMismatch { samples: 2, labels: 1 }
        ));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = InMemoryTextSource::new(vec!["a".into()], 0).unwrap_err();
        assert!(matches!(err, SourceError::ZeroBatchSize));
    }
}
