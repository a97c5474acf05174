//! Structural Property Probe
//!
//! Cheap structural description of the buffered sample set: counts, shape
//! and typing detail, and class balance. No heavy computation and no
//! additional sampling beyond the buffer already gathered.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use batch_sampler::Label;
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

/// Inferred type of one tabular column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Continuous numeric values
    Numeric,
    /// Integral values with low cardinality
    Categorical,
    /// Single distinct value
    Constant,
}

/// Image-specific structural detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageProperties {
    pub width_min: u32,
    pub width_max: u32,
    pub height_min: u32,
    pub height_max: u32,
    /// Largest channel count across buffered images
    pub color_channels: u8,
}

/// Tabular-specific structural detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularProperties {
    pub feature_count: usize,
    /// Inferred type per column, in column order
    pub column_types: Vec<ColumnType>,
}

/// Text-specific structural detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextProperties {
    /// Characters across the buffered corpus
    pub total_chars: u64,
    /// Tokens across the buffered corpus
    pub total_tokens: u64,
}

/// Modality-specific structural detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "modality", rename_all = "snake_case")]
pub enum ModalityProperties {
    Image(ImageProperties),
    Tabular(TabularProperties),
    Text(TextProperties),
}

/// Structural properties of the buffered sample set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySet {
    /// Samples actually buffered
    pub sample_count: usize,
    /// Class frequency by label key, when labels form a small class set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_distribution: Option<BTreeMap<String, usize>>,
    /// Modality-specific structure
    pub detail: ModalityProperties,
    /// Flat statistical descriptor block (fixed key set per modality)
    pub statistics: BTreeMap<String, Option<f64>>,
}

/// Class frequencies, or `None` when labels are absent, unkeyable, or the
/// distinct count exceeds `cardinality_cap` (continuous target).
pub fn class_distribution(
    labels: Option<&[Label]>,
    cardinality_cap: usize,
) -> Option<BTreeMap<String, usize>> {
    let labels = labels?;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels {
        let key = label.class_key()?;
        *counts.entry(key).or_default() += 1;
    }
    if counts.is_empty() || counts.len() > cardinality_cap {
        return None;
    }
    Some(counts)
}

/// Infer per-column types from column-major data
pub fn infer_column_types(columns: &[Vec<f64>], categorical_cap: usize) -> Vec<ColumnType> {
    columns
        .iter()
        .map(|column| {
            let present: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
            if present.is_empty() {
                return ColumnType::Constant;
            }
            let distinct: BTreeSet<u64> = present.iter().map(|v| v.to_bits()).collect();
            if distinct.len() == 1 {
                ColumnType::Constant
            } else if present.iter().all(|v| v.fract() == 0.0) && distinct.len() <= categorical_cap
            {
                ColumnType::Categorical
            } else {
                ColumnType::Numeric
            }
        })
        .collect()
}

/// Shape ranges over buffered images
pub fn image_properties(images: &[DynamicImage]) -> ImageProperties {
    let mut width_min = u32::MAX;
    let mut width_max = 0;
    let mut height_min = u32::MAX;
    let mut height_max = 0;
    let mut color_channels = 0u8;

    for image in images {
        let (w, h) = image.dimensions();
        width_min = width_min.min(w);
        width_max = width_max.max(w);
        height_min = height_min.min(h);
        height_max = height_max.max(h);
        color_channels = color_channels.max(image.color().channel_count());
    }

    ImageProperties {
        width_min: if images.is_empty() { 0 } else { width_min },
        width_max,
        height_min: if images.is_empty() { 0 } else { height_min },
        height_max,
        color_channels,
    }
}

/// Corpus size over buffered documents
pub fn text_properties(texts: &[String]) -> TextProperties {
    let total_chars = texts.iter().map(|t| t.chars().count() as u64).sum();
    let total_tokens = texts
        .iter()
        .map(|t| stat_features::tokenize(t).len() as u64)
        .sum();
    TextProperties {
        total_chars,
        total_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_distribution_of_binary_float_target() {
        let labels = vec![
            Label::Float(0.0),
            Label::Float(1.0),
            Label::Float(1.0),
            Label::Float(0.0),
            Label::Float(1.0),
        ];
        let dist = class_distribution(Some(&labels), 32).unwrap();
        assert_eq!(dist["0"], 2);
        assert_eq!(dist["1"], 3);
    }

    #[test]
    fn test_continuous_target_has_no_distribution() {
        let labels = vec![Label::Float(0.12), Label::Float(3.45)];
        assert!(class_distribution(Some(&labels), 32).is_none());
    }

    #[test]
    fn test_high_cardinality_target_has_no_distribution() {
        let labels: Vec<Label> = (0..100).map(Label::Int).collect();
        assert!(class_distribution(Some(&labels), 32).is_none());
    }

    #[test]
    fn test_column_type_inference() {
        let columns = vec![
            vec![0.0, 1.0, 0.0, 1.0],
            vec![0.5, 1.7, 2.9, 3.1],
            vec![7.0, 7.0, 7.0, 7.0],
        ];
        let types = infer_column_types(&columns, 20);
        assert_eq!(
            types,
            vec![
                ColumnType::Categorical,
                ColumnType::Numeric,
                ColumnType::Constant,
            ]
        );
    }

    #[test]
    fn test_text_properties_counts_corpus() {
        let texts = vec!["one two".to_string(), "three".to_string()];
        let props = text_properties(&texts);
        assert_eq!(props.total_tokens, 3);
        assert_eq!(props.total_chars, 12);
    }
}
