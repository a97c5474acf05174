//! Per-modality batch types

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A label attached to one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Label {
    /// Integer class id
    Int(i64),
    /// Continuous or binary target value
    Float(f64),
    /// String class name
    Text(String),
}

impl Label {
    /// Key used when counting class frequencies.
    ///
    /// Float labels map to a key only when they carry an integral value, so
    /// binary 0.0/1.0 targets still produce a class distribution.
    pub fn class_key(&self) -> Option<String> {
        match self {
            Label::Int(v) => Some(v.to_string()),
            Label::Text(s) => Some(s.clone()),
            Label::Float(v) if v.is_finite() && v.fract() == 0.0 => {
                Some(format!("{}", *v as i64))
            }
            Label::Float(_) => None,
        }
    }

    /// Numeric view of the label, when one exists
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Label::Int(v) => Some(*v as f64),
            Label::Float(v) => Some(*v),
            Label::Text(_) => None,
        }
    }
}

/// Common surface over modality batches
pub trait SampleBatch {
    /// Raw sample type carried by the batch
    type Sample;

    /// Number of samples in the batch
    fn len(&self) -> usize;

    /// True when the batch holds no samples
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decompose into samples and aligned labels (if present)
    fn into_samples(self) -> (Vec<Self::Sample>, Option<Vec<Label>>);
}

/// One batch of decoded images, arbitrary per-image dimensions
#[derive(Debug, Clone)]
pub struct ImageBatch {
    pub images: Vec<DynamicImage>,
    /// Per-sample labels, aligned with `images`
    pub labels: Option<Vec<Label>>,
}

impl SampleBatch for ImageBatch {
    type Sample = DynamicImage;

    fn len(&self) -> usize {
        self.images.len()
    }

    fn into_samples(self) -> (Vec<DynamicImage>, Option<Vec<Label>>) {
        (self.images, self.labels)
    }
}

/// One batch of tabular rows.
///
/// A `NaN` cell encodes a missing value.
#[derive(Debug, Clone)]
pub struct RowBatch {
    pub rows: Vec<Vec<f64>>,
    /// Per-row targets, aligned with `rows`
    pub targets: Option<Vec<f64>>,
}

impl SampleBatch for RowBatch {
    type Sample = Vec<f64>;

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn into_samples(self) -> (Vec<Vec<f64>>, Option<Vec<Label>>) {
        let labels = self
            .targets
            .map(|t| t.into_iter().map(Label::Float).collect());
        (self.rows, labels)
    }
}

/// One batch of raw text documents
#[derive(Debug, Clone)]
pub struct TextBatch {
    pub texts: Vec<String>,
    /// Per-sample labels, aligned with `texts`
    pub labels: Option<Vec<Label>>,
}

impl SampleBatch for TextBatch {
    type Sample = String;

    fn len(&self) -> usize {
        self.texts.len()
    }

    fn into_samples(self) -> (Vec<String>, Option<Vec<Label>>) {
        (self.texts, self.labels)
    }
}
