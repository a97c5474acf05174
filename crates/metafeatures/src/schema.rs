//! Fixed Record Schemas
//!
//! The key set of every record section is fixed per modality, so records
//! from different datasets of one modality align key-for-key downstream.

use mfe_battery::Battery;

use crate::record::{MetafeatureRecord, Modality};

/// Dataset-level statistical keys for tabular records
pub const TABULAR_STATISTICAL_KEYS: &[&str] = &["cor_mean", "missing_cell_rate"];

/// Fixed key set of `properties.statistics` for a modality
pub fn statistical_keys(modality: Modality) -> &'static [&'static str] {
    match modality {
        Modality::Image => stat_features::ImageStatistics::keys(),
        Modality::Tabular => TABULAR_STATISTICAL_KEYS,
        Modality::Text => stat_features::TextStatistics::keys(),
    }
}

/// Key universe of the battery behind `mfe` for a version
pub fn battery_keys(version: u32) -> Option<Vec<&'static str>> {
    Battery::new(version).ok().map(|b| b.keys())
}

/// Check a populated record against its modality schema.
///
/// Returns the first violation found, if any.
pub fn validate(record: &MetafeatureRecord) -> Result<(), String> {
    let modality = record.provenance.modality;

    let mut expected: Vec<&str> = statistical_keys(modality).to_vec();
    expected.sort_unstable();
    let mut actual: Vec<&str> = record
        .properties
        .statistics
        .keys()
        .map(String::as_str)
        .collect();
    actual.sort_unstable();
    if expected != actual {
        return Err(format!(
            "statistics keys {:?} do not match the {} schema {:?}",
            actual,
            modality.as_str(),
            expected
        ));
    }

    let mut universe = battery_keys(record.provenance.battery_version)
        .ok_or_else(|| format!("unknown battery version {}", record.provenance.battery_version))?;
    universe.sort_unstable();
    let mut covered: Vec<&str> = record
        .mfe
        .values
        .keys()
        .chain(record.mfe.skipped.keys())
        .map(String::as_str)
        .collect();
    covered.sort_unstable();
    let degraded_mfe = record
        .provenance
        .degraded
        .iter()
        .any(|f| f.stage == "mfe");
    if covered != universe && !(degraded_mfe && covered.is_empty()) {
        return Err(format!(
            "mfe keys {:?} do not cover the battery universe {:?}",
            covered, universe
        ));
    }

    match modality {
        Modality::Tabular => {
            if record.embedding.is_some() {
                return Err("tabular records never carry an embedding section".to_string());
            }
            if record.features.is_none() {
                return Err("tabular records must carry a features section".to_string());
            }
        }
        Modality::Image | Modality::Text => {
            if record.features.is_some() {
                return Err(format!(
                    "{} records never carry a features section",
                    modality.as_str()
                ));
            }
        }
    }

    Ok(())
}
