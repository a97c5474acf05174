//! Embedding Matrix Reduction

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::SummaryError;

/// Power iteration sweeps per singular value
const POWER_ITERATIONS: usize = 60;

/// Fixed-size summary of a per-sample embedding distribution.
///
/// `mean` and `variance` have length `dimension` regardless of how many
/// samples were encoded; `singular_values` carries the top-k spectrum of
/// the centered embedding matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSummary {
    /// Backbone output dimension D
    pub dimension: usize,
    /// Number of embedding rows reduced
    pub sample_count: usize,
    /// Per-dimension mean
    pub mean: Vec<f64>,
    /// Per-dimension population variance
    pub variance: Vec<f64>,
    /// Top-k singular values of the centered matrix, descending
    pub singular_values: Vec<f64>,
}

/// Reduces chunked embedding matrices to an `EmbeddingSummary`
pub struct EmbeddingSummarizer {
    top_k: usize,
}

impl EmbeddingSummarizer {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    /// Reduce successful encode chunks into one summary
    pub fn summarize(&self, chunks: &[Array2<f32>]) -> Result<EmbeddingSummary, SummaryError> {
        let dimension = chunks.first().map(|c| c.ncols()).ok_or(SummaryError::Empty)?;
        for chunk in chunks {
            if chunk.ncols() != dimension {
                return Err(SummaryError::DimensionMismatch {
                    expected: dimension,
                    got: chunk.ncols(),
                });
            }
        }

        let n: usize = chunks.iter().map(Array2::nrows).sum();
        if n == 0 {
            return Err(SummaryError::Empty);
        }

        let mut mean = vec![0.0f64; dimension];
        for chunk in chunks {
            for row in chunk.rows() {
                for (d, &v) in row.iter().enumerate() {
                    mean[d] += v as f64;
                }
            }
        }
        for m in &mut mean {
            *m /= n as f64;
        }

        let mut variance = vec![0.0f64; dimension];
        for chunk in chunks {
            for row in chunk.rows() {
                for (d, &v) in row.iter().enumerate() {
                    let diff = v as f64 - mean[d];
                    variance[d] += diff * diff;
                }
            }
        }
        for v in &mut variance {
            *v /= n as f64;
        }

        let singular_values = self.top_singular_values(chunks, &mean, dimension, n);

        debug!(rows = n, dim = dimension, "embedding summary computed");

        Ok(EmbeddingSummary {
            dimension,
            sample_count: n,
            mean,
            variance,
            singular_values,
        })
    }

    /// Top-k spectrum via power iteration with deflation on the D x D
    /// scatter matrix of the centered embeddings.
    fn top_singular_values(
        &self,
        chunks: &[Array2<f32>],
        mean: &[f64],
        dimension: usize,
        n: usize,
    ) -> Vec<f64> {
        let k = self.top_k.min(dimension).min(n.saturating_sub(1));
        if k == 0 {
            return Vec::new();
        }

        let mut scatter = Array2::<f64>::zeros((dimension, dimension));
        for chunk in chunks {
            for row in chunk.rows() {
                let centered: Vec<f64> = row
                    .iter()
                    .enumerate()
                    .map(|(d, &v)| v as f64 - mean[d])
                    .collect();
                for i in 0..dimension {
                    for j in 0..dimension {
                        scatter[(i, j)] += centered[i] * centered[j];
                    }
                }
            }
        }

        let mut values = Vec::with_capacity(k);
        for _ in 0..k {
            // Deterministic non-degenerate start vector
            let mut v: Vec<f64> = (0..dimension).map(|i| (i as f64 + 1.0).sin() + 1.5).collect();
            normalize(&mut v);

            let mut eigenvalue = 0.0f64;
            for _ in 0..POWER_ITERATIONS {
                let mut next = vec![0.0f64; dimension];
                for i in 0..dimension {
                    let mut acc = 0.0;
                    for j in 0..dimension {
                        acc += scatter[(i, j)] * v[j];
                    }
                    next[i] = acc;
                }

                let norm = next.iter().map(|x| x * x).sum::<f64>().sqrt();
                if norm <= f64::EPSILON {
                    eigenvalue = 0.0;
                    break;
                }
                for x in &mut next {
                    *x /= norm;
                }

                let prev = eigenvalue;
                eigenvalue = norm;
                v = next;
                if (eigenvalue - prev).abs() <= 1e-12 * eigenvalue.max(1.0) {
                    break;
                }
            }

            values.push(eigenvalue.max(0.0).sqrt());

            // Deflate the captured component
            for i in 0..dimension {
                for j in 0..dimension {
                    scatter[(i, j)] -= eigenvalue * v[i] * v[j];
                }
            }
        }

        values
    }
}

fn normalize(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_mean_and_variance_over_chunks() {
        let chunks = vec![
            array![[0.0f32, 2.0], [2.0, 2.0]],
            array![[4.0f32, 2.0]],
        ];
        let summary = EmbeddingSummarizer::new(2).summarize(&chunks).unwrap();

        assert_eq!(summary.dimension, 2);
        assert_eq!(summary.sample_count, 3);
        assert_relative_eq!(summary.mean[0], 2.0);
        assert_relative_eq!(summary.mean[1], 2.0);
        // Population variance of {0, 2, 4} is 8/3
        assert_relative_eq!(summary.variance[0], 8.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(summary.variance[1], 0.0);
    }

    #[test]
    fn test_rank_one_data_has_single_dominant_singular_value() {
        // Rows are multiples of (1, 1): rank one after centering
        let chunk = array![[1.0f32, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let summary = EmbeddingSummarizer::new(2).summarize(&[chunk]).unwrap();

        assert_eq!(summary.singular_values.len(), 2);
        assert!(summary.singular_values[0] > 1.0);
        assert_relative_eq!(summary.singular_values[1], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_spectrum_matches_known_scatter() {
        // Centered data (-1, 0), (1, 0): scatter [[2, 0], [0, 0]]
        let chunk = array![[-1.0f32, 5.0], [1.0, 5.0]];
        let summary = EmbeddingSummarizer::new(1).summarize(&[chunk]).unwrap();

        assert_eq!(summary.singular_values.len(), 1);
        assert_relative_eq!(summary.singular_values[0], 2.0f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_single_row_has_empty_spectrum() {
        let chunk = array![[1.0f32, 2.0, 3.0]];
        let summary = EmbeddingSummarizer::new(4).summarize(&[chunk]).unwrap();
        assert!(summary.singular_values.is_empty());
        assert_eq!(summary.mean, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_empty_chunks_fail() {
        let err = EmbeddingSummarizer::new(2).summarize(&[]).unwrap_err();
        assert!(matches!(err, SummaryError::Empty));
    }

    #[test]
    fn test_dimension_mismatch_detected() {
        let chunks = vec![
            Array2::<f32>::zeros((1, 4)),
            Array2::<f32>::zeros((1, 5)),
        ];
        let err = EmbeddingSummarizer::new(2).summarize(&chunks).unwrap_err();
        assert!(matches!(
            err,
            SummaryError::DimensionMismatch { expected: 4, got: 5 }
        ));
    }
}
