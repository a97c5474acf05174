//! Bounded Sample Buffer

use crate::batch::{Label, SampleBatch};
use crate::source::BatchSource;

/// Bookkeeping snapshot taken when a buffer is decomposed
#[derive(Debug, Clone, Copy)]
pub struct BufferStats {
    /// Batches pulled from the source
    pub batches_drawn: usize,
    /// True when a cap cut off part of a batch or the dataset
    pub truncated: bool,
}

/// Bounded accumulation of raw samples pulled from a `BatchSource`.
///
/// The buffer is the only copy of dataset content the engine holds; all
/// extractors read from it. Capacity is the primary defense against
/// unbounded memory growth.
pub struct SampleBuffer<S> {
    samples: Vec<S>,
    labels: Vec<Label>,
    labels_missing: bool,
    capacity: usize,
    batches_drawn: usize,
    truncated: bool,
}

impl<S> SampleBuffer<S> {
    /// Create an empty buffer with the given sample capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::new(),
            labels: Vec::new(),
            labels_missing: false,
            capacity,
            batches_drawn: 0,
            truncated: false,
        }
    }

    /// Pull batches from `source` until the buffer fills, the batch cap is
    /// reached, or the source is exhausted.
    pub fn fill<Src>(source: &mut Src, sample_cap: usize, batch_cap: Option<usize>) -> Self
    where
        Src: BatchSource + ?Sized,
        Src::Batch: SampleBatch<Sample = S>,
    {
        let mut buffer = Self::new(sample_cap);
        while batch_cap.map_or(true, |cap| buffer.batches_drawn < cap) {
            match source.next_batch() {
                // An empty batch is treated as exhaustion
                Some(batch) if !batch.is_empty() => {
                    if !buffer.push_batch(batch) {
                        break;
                    }
                }
                _ => break,
            }
        }
        buffer
    }

    /// Absorb one batch, keeping at most `capacity` samples.
    ///
    /// Returns `false` once the buffer is full.
    pub fn push_batch<B: SampleBatch<Sample = S>>(&mut self, batch: B) -> bool {
        self.batches_drawn += 1;
        let (samples, labels) = batch.into_samples();

        match labels {
            Some(labels) if labels.len() == samples.len() => {
                let room = self.capacity - self.samples.len();
                if samples.len() > room {
                    self.truncated = true;
                }
                let take = samples.len().min(room);
                self.samples.extend(samples.into_iter().take(take));
                self.labels.extend(labels.into_iter().take(take));
            }
            _ => {
                // One unlabeled batch poisons the label column for the
                // whole buffer; extractors fall back to unsupervised paths.
                self.labels_missing = true;
                let room = self.capacity - self.samples.len();
                if samples.len() > room {
                    self.truncated = true;
                }
                self.samples.extend(samples.into_iter().take(room));
            }
        }

        self.samples.len() < self.capacity
    }

    /// Buffered samples
    pub fn samples(&self) -> &[S] {
        &self.samples
    }

    /// Buffered labels, when every absorbed batch carried them
    pub fn labels(&self) -> Option<&[Label]> {
        if self.labels_missing || self.labels.len() != self.samples.len() || self.labels.is_empty()
        {
            None
        } else {
            Some(&self.labels)
        }
    }

    /// Number of buffered samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples were buffered
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fraction of capacity in use (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.capacity as f64
    }

    /// Number of batches pulled from the source
    pub fn batches_drawn(&self) -> usize {
        self.batches_drawn
    }

    /// True when the cap cut off part of a batch or the dataset
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Decompose into owned samples, aligned labels, and bookkeeping
    pub fn into_parts(self) -> (Vec<S>, Option<Vec<Label>>, BufferStats) {
        let stats = BufferStats {
            batches_drawn: self.batches_drawn,
            truncated: self.truncated,
        };
        let labels = if self.labels_missing
            || self.labels.len() != self.samples.len()
            || self.labels.is_empty()
        {
            None
        } else {
            Some(self.labels)
        };
        (self.samples, labels, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::RowBatch;
    use crate::source::InMemoryRowSource;

    fn rows(n: usize) -> Vec<Vec<f64>> {
        (0..n).map(|i| vec![i as f64, (i * 2) as f64]).collect()
    }

    #[test]
    fn test_fill_respects_sample_cap() {
        let mut source = InMemoryRowSource::new(rows(100), 16).unwrap();
        let buffer = SampleBuffer::fill(&mut source, 32, None);

        assert_eq!(buffer.len(), 32);
        assert!(buffer.truncated() || buffer.len() == 32);
        assert!((buffer.fill_ratio() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fill_respects_batch_cap() {
        let mut source = InMemoryRowSource::new(rows(100), 4).unwrap();
        let buffer = SampleBuffer::fill(&mut source, 1000, Some(2));

        assert_eq!(buffer.batches_drawn(), 2);
        assert_eq!(buffer.len(), 8);
    }

    #[test]
    fn test_fill_stops_at_exhaustion() {
        let mut source = InMemoryRowSource::new(rows(5), 4).unwrap();
        let buffer = SampleBuffer::fill(&mut source, 32, None);

        assert_eq!(buffer.len(), 5);
        assert!(!buffer.truncated());
    }

    #[test]
    fn test_labels_align_with_truncation() {
        let mut source =
            InMemoryRowSource::with_targets(rows(10), Some(vec![1.0; 10]), 4).unwrap();
        let buffer = SampleBuffer::fill(&mut source, 6, None);

        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.labels().unwrap().len(), 6);
        assert!(buffer.truncated());
    }

    #[test]
    fn test_unlabeled_batch_poisons_labels() {
        let mut buffer: SampleBuffer<Vec<f64>> = SampleBuffer::new(10);
        buffer.push_batch(RowBatch {
            rows: rows(2),
            targets: Some(vec![0.0, 1.0]),
        });
        buffer.push_batch(RowBatch {
            rows: rows(2),
            targets: None,
        });

        assert_eq!(buffer.len(), 4);
        assert!(buffer.labels().is_none());
    }
}
