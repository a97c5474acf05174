//! Dataset Metafeature Extraction
//!
//! Computes compact, fixed-shape numeric summaries characterizing an
//! arbitrary dataset (image, tabular, or text) independent of any model:
//! - structural properties and class balance,
//! - closed-form statistical descriptors,
//! - a versioned battery of general meta-feature algorithms,
//! - embedding summaries via an external pretrained backbone.
//!
//! One `ModalityAdapter` invocation per dataset yields one immutable
//! `MetafeatureRecord`; single-extractor failures degrade the record
//! instead of failing the call.

mod adapter;
mod config;
mod error;
mod image_adapter;
mod properties;
mod record;
pub mod schema;
mod stage;
mod tabular;
mod text_adapter;

pub use adapter::ModalityAdapter;
pub use config::ExtractionConfig;
pub use error::ExtractError;
pub use image_adapter::ImageAdapter;
pub use properties::{
    ColumnType, ImageProperties, ModalityProperties, PropertySet, TabularProperties,
    TextProperties,
};
pub use record::{
    ColumnFeatureSet, ExtractionMode, MetafeatureRecord, Modality, Provenance, StageFailure,
};
pub use tabular::TabularAdapter;
pub use text_adapter::TextAdapter;

#[cfg(test)]
mod tests {
    use super::*;
    use batch_sampler::InMemoryRowSource;

    fn small_tabular_source() -> InMemoryRowSource {
        let rows: Vec<Vec<f64>> = (0..24)
            .map(|i| vec![i as f64, (i % 4) as f64, (i * i) as f64 / 10.0])
            .collect();
        let targets: Vec<f64> = (0..24).map(|i| (i % 2) as f64).collect();
        InMemoryRowSource::with_targets(rows, Some(targets), 8).unwrap()
    }

    #[tokio::test]
    async fn test_record_round_trips_through_json() {
        let adapter = ModalityAdapter::Tabular(TabularAdapter::new(
            small_tabular_source(),
            ExtractionConfig::testing(),
        ));
        assert_eq!(adapter.modality(), Modality::Tabular);

        let record = adapter.extract().await.unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let back: MetafeatureRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back.properties.sample_count, record.properties.sample_count);
        assert_eq!(back.mfe.values, record.mfe.values);
        assert!(back.embedding.is_none());
        schema::validate(&back).unwrap();
    }

    #[tokio::test]
    async fn test_tabular_json_omits_embedding_key() {
        let record = TabularAdapter::new(small_tabular_source(), ExtractionConfig::testing())
            .extract()
            .await
            .unwrap();

        let json = serde_json::to_value(&record).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("embedding"));
        assert!(object.contains_key("features"));
    }

    #[tokio::test]
    async fn test_flat_map_drops_absent_values() {
        let record = TabularAdapter::new(small_tabular_source(), ExtractionConfig::testing())
            .extract()
            .await
            .unwrap();

        let flat = record.to_flat_map();
        assert!(flat.values().all(|v| v.is_finite()));
        assert!(flat.contains_key("properties.sample_count"));
        assert!(flat.contains_key("mfe.general.nr_instances"));
        assert!(flat.keys().any(|k| k.starts_with("features.column_0.")));
    }
}
