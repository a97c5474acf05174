//! Moment Summary Computation

use serde::{Deserialize, Serialize};

/// Moment summary of a value sequence.
///
/// Each moment is `None` when undefined for the observed sample size:
/// std_dev needs n >= 2, skewness n >= 3, kurtosis n >= 4, and the shape
/// moments additionally need nonzero spread. Non-finite input values are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Number of finite values observed
    pub count: usize,
    /// Arithmetic mean
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1 denominator)
    pub std_dev: Option<f64>,
    /// Skewness (asymmetry)
    pub skewness: Option<f64>,
    /// Excess kurtosis (tailedness)
    pub kurtosis: Option<f64>,
    /// Minimum value
    pub min: Option<f64>,
    /// Maximum value
    pub max: Option<f64>,
}

impl SummaryStats {
    /// Compute the summary from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Self::default();
        }

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let min = finite.iter().copied().fold(f64::MAX, f64::min);
        let max = finite.iter().copied().fold(f64::MIN, f64::max);

        let mut m2 = 0.0;
        let mut m3 = 0.0;
        let mut m4 = 0.0;
        for &v in &finite {
            let d = v - mean;
            m2 += d * d;
            m3 += d * d * d;
            m4 += d * d * d * d;
        }

        let pop_var = m2 / n;

        let std_dev = if finite.len() >= 2 {
            Some((m2 / (n - 1.0)).sqrt())
        } else {
            None
        };

        // Skewness: E[(X-mu)^3] / sigma^3
        let skewness = if finite.len() >= 3 && pop_var > 0.0 {
            Some((m3 / n) / pop_var.powf(1.5))
        } else {
            None
        };

        // Excess kurtosis: E[(X-mu)^4] / sigma^4 - 3
        let kurtosis = if finite.len() >= 4 && pop_var > 0.0 {
            Some((m4 / n) / (pop_var * pop_var) - 3.0)
        } else {
            None
        };

        Self {
            count: finite.len(),
            mean: Some(mean),
            std_dev,
            skewness,
            kurtosis,
            min: Some(min),
            max: Some(max),
        }
    }
}
