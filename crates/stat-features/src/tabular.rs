//! Per-Column Tabular Features

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::statistics::SummaryStats;

/// Statistical descriptor for one tabular column.
///
/// `NaN` cells count as missing; all other statistics run over present
/// values only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnFeatures {
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Fraction of missing cells in the column
    pub missing_rate: f64,
    /// Distinct-value count for categorical-like columns
    pub cardinality: Option<u64>,
}

impl ColumnFeatures {
    /// Compute the descriptor for one column.
    ///
    /// A column is categorical-like when every present value is integral
    /// and the distinct count stays within `categorical_cardinality_max`.
    pub fn compute(column: &[f64], categorical_cardinality_max: usize) -> Self {
        if column.is_empty() {
            return Self {
                missing_rate: 0.0,
                ..Self::default()
            };
        }

        let present: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
        let missing_rate = 1.0 - present.len() as f64 / column.len() as f64;

        let stats = SummaryStats::compute(&present);

        let all_integral = !present.is_empty() && present.iter().all(|v| v.fract() == 0.0);
        let cardinality = if all_integral {
            let distinct: BTreeSet<u64> = present.iter().map(|v| v.to_bits()).collect();
            if distinct.len() <= categorical_cardinality_max {
                Some(distinct.len() as u64)
            } else {
                None
            }
        } else {
            None
        };

        Self {
            mean: stats.mean,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
            missing_rate,
            cardinality,
        }
    }

    /// Fixed key set of the flat descriptor
    pub fn keys() -> &'static [&'static str] {
        &["mean", "std", "min", "max", "missing_rate", "cardinality"]
    }

    /// Flatten to the fixed key set; undefined metrics stay `None`
    pub fn flatten(&self) -> BTreeMap<String, Option<f64>> {
        let mut map = BTreeMap::new();
        map.insert("mean".to_string(), self.mean);
        map.insert("std".to_string(), self.std_dev);
        map.insert("min".to_string(), self.min);
        map.insert("max".to_string(), self.max);
        map.insert("missing_rate".to_string(), Some(self.missing_rate));
        map.insert(
            "cardinality".to_string(),
            self.cardinality.map(|c| c as f64),
        );
        map
    }
}

/// Transpose buffered rows into columns.
///
/// Ragged rows are padded with `NaN` up to the widest row.
pub fn column_major(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut columns = vec![Vec::with_capacity(rows.len()); width];
    for row in rows {
        for (c, column) in columns.iter_mut().enumerate() {
            column.push(row.get(c).copied().unwrap_or(f64::NAN));
        }
    }
    columns
}

/// Mean absolute pairwise Pearson correlation, diagonal excluded.
///
/// Each pair is computed over rows where both cells are present; pairs with
/// fewer than two such rows or zero variance are skipped. Returns `None`
/// when no pair could be computed.
pub fn mean_abs_correlation(columns: &[Vec<f64>]) -> Option<f64> {
    if columns.len() < 2 {
        return None;
    }

    let mut total = 0.0;
    let mut pairs = 0usize;

    for i in 0..columns.len() {
        for j in (i + 1)..columns.len() {
            if let Some(r) = pearson(&columns[i], &columns[j]) {
                total += r.abs();
                pairs += 1;
            }
        }
    }

    if pairs == 0 {
        None
    } else {
        Some(total / pairs as f64)
    }
}

fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let paired: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| (x, y))
        .collect();
    if paired.len() < 2 {
        return None;
    }

    let n = paired.len() as f64;
    let mean_a = paired.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_b = paired.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in &paired {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some(cov / (var_a.sqrt() * var_b.sqrt()))
}
