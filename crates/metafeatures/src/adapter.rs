//! Modality Dispatch

use std::collections::BTreeMap;

use batch_sampler::Label;

use crate::error::ExtractError;
use crate::image_adapter::ImageAdapter;
use crate::record::{MetafeatureRecord, Modality};
use crate::tabular::TabularAdapter;
use crate::text_adapter::TextAdapter;

/// The closed set of modality adapters.
///
/// One invocation per dataset: construct the variant for the dataset's
/// modality, then call `extract` to obtain the unified record.
pub enum ModalityAdapter {
    Image(ImageAdapter),
    Tabular(TabularAdapter),
    Text(TextAdapter),
}

impl ModalityAdapter {
    /// Modality of the wrapped adapter
    pub fn modality(&self) -> Modality {
        match self {
            ModalityAdapter::Image(_) => Modality::Image,
            ModalityAdapter::Tabular(_) => Modality::Tabular,
            ModalityAdapter::Text(_) => Modality::Text,
        }
    }

    /// Run the full extraction, consuming the adapter
    pub async fn extract(self) -> Result<MetafeatureRecord, ExtractError> {
        match self {
            ModalityAdapter::Image(adapter) => adapter.extract().await,
            ModalityAdapter::Tabular(adapter) => adapter.extract().await,
            ModalityAdapter::Text(adapter) => adapter.extract().await,
        }
    }
}

impl From<ImageAdapter> for ModalityAdapter {
    fn from(adapter: ImageAdapter) -> Self {
        ModalityAdapter::Image(adapter)
    }
}

impl From<TabularAdapter> for ModalityAdapter {
    fn from(adapter: TabularAdapter) -> Self {
        ModalityAdapter::Tabular(adapter)
    }
}

impl From<TextAdapter> for ModalityAdapter {
    fn from(adapter: TextAdapter) -> Self {
        ModalityAdapter::Text(adapter)
    }
}

/// Map labels to dense class ids in deterministic (sorted key) order.
///
/// Returns `None` when any label is unkeyable (continuous target) or the
/// distinct count exceeds `cardinality_cap`.
pub(crate) fn factorize(labels: &[Label], cardinality_cap: usize) -> Option<Vec<usize>> {
    let keys: Option<Vec<String>> = labels.iter().map(Label::class_key).collect();
    let keys = keys?;

    let mut id_by_key: BTreeMap<&str, usize> = BTreeMap::new();
    for key in &keys {
        let next = id_by_key.len();
        id_by_key.entry(key.as_str()).or_insert(next);
    }
    if id_by_key.is_empty() || id_by_key.len() > cardinality_cap {
        return None;
    }

    // Re-id in sorted key order so ids do not depend on encounter order
    let sorted: BTreeMap<&str, usize> = id_by_key
        .keys()
        .enumerate()
        .map(|(id, &key)| (key, id))
        .collect();

    Some(keys.iter().map(|k| sorted[k.as_str()]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factorize_is_order_independent() {
        let a = factorize(&[Label::Int(5), Label::Int(2), Label::Int(5)], 32).unwrap();
        let b = factorize(&[Label::Int(2), Label::Int(5), Label::Int(5)], 32).unwrap();

        assert_eq!(a, vec![1, 0, 1]);
        assert_eq!(b, vec![0, 1, 1]);
    }

    #[test]
    fn test_factorize_rejects_continuous_targets() {
        assert!(factorize(&[Label::Float(0.1), Label::Float(0.2)], 32).is_none());
    }

    #[test]
    fn test_factorize_rejects_high_cardinality() {
        let labels: Vec<Label> = (0..50).map(Label::Int).collect();
        assert!(factorize(&labels, 32).is_none());
    }
}
