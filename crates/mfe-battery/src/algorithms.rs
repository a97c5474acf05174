//! Battery v1 Algorithm Definitions

use std::collections::BTreeMap;

use ndarray::Axis;

use crate::battery::MfeInput;

/// Histogram bins used when discretizing numeric attributes
const DISCRETIZATION_BINS: usize = 10;

const MI_EPSILON: f64 = 1e-12;

/// One battery member with its applicability preconditions
pub(crate) struct Algorithm {
    pub name: &'static str,
    pub needs_labels: bool,
    pub min_columns: usize,
    pub min_rows: usize,
    pub run: fn(&MfeInput) -> Option<f64>,
}

pub(crate) static BATTERY_V1: &[Algorithm] = &[
    Algorithm {
        name: "general.nr_instances",
        needs_labels: false,
        min_columns: 0,
        min_rows: 0,
        run: nr_instances,
    },
    Algorithm {
        name: "general.nr_attributes",
        needs_labels: false,
        min_columns: 0,
        min_rows: 0,
        run: nr_attributes,
    },
    Algorithm {
        name: "general.attr_to_inst",
        needs_labels: false,
        min_columns: 0,
        min_rows: 1,
        run: attr_to_inst,
    },
    Algorithm {
        name: "general.sparsity",
        needs_labels: false,
        min_columns: 1,
        min_rows: 1,
        run: sparsity,
    },
    Algorithm {
        name: "general.outlier_ratio",
        needs_labels: false,
        min_columns: 1,
        min_rows: 4,
        run: outlier_ratio,
    },
    Algorithm {
        name: "general.nr_classes",
        needs_labels: true,
        min_columns: 0,
        min_rows: 1,
        run: nr_classes,
    },
    Algorithm {
        name: "general.class_imbalance",
        needs_labels: true,
        min_columns: 0,
        min_rows: 1,
        run: class_imbalance,
    },
    Algorithm {
        name: "info.attr_entropy_mean",
        needs_labels: false,
        min_columns: 1,
        min_rows: 1,
        run: attr_entropy_mean,
    },
    Algorithm {
        name: "info.class_entropy",
        needs_labels: true,
        min_columns: 0,
        min_rows: 1,
        run: class_entropy,
    },
    Algorithm {
        name: "info.joint_entropy_mean",
        needs_labels: true,
        min_columns: 1,
        min_rows: 1,
        run: joint_entropy_mean,
    },
    Algorithm {
        name: "info.mutual_info_mean",
        needs_labels: true,
        min_columns: 1,
        min_rows: 1,
        run: mutual_info_mean,
    },
    Algorithm {
        name: "info.equiv_nr_attr",
        needs_labels: true,
        min_columns: 1,
        min_rows: 1,
        run: equiv_nr_attr,
    },
    Algorithm {
        name: "info.noise_ratio",
        needs_labels: true,
        min_columns: 1,
        min_rows: 1,
        run: noise_ratio,
    },
    Algorithm {
        name: "stat.cor_mean",
        needs_labels: false,
        min_columns: 2,
        min_rows: 2,
        run: cor_mean,
    },
    Algorithm {
        name: "stat.cov_mean",
        needs_labels: false,
        min_columns: 2,
        min_rows: 2,
        run: cov_mean,
    },
];

fn nr_instances(input: &MfeInput) -> Option<f64> {
    Some(input.matrix.nrows() as f64)
}

fn nr_attributes(input: &MfeInput) -> Option<f64> {
    Some(input.matrix.ncols() as f64)
}

fn attr_to_inst(input: &MfeInput) -> Option<f64> {
    Some(input.matrix.ncols() as f64 / input.matrix.nrows() as f64)
}

fn sparsity(input: &MfeInput) -> Option<f64> {
    let total = input.matrix.len();
    let zeros = input.matrix.iter().filter(|v| **v == 0.0).count();
    Some(zeros as f64 / total as f64)
}

fn outlier_ratio(input: &MfeInput) -> Option<f64> {
    let mut ratios = Vec::new();
    for column in input.matrix.axis_iter(Axis(1)) {
        let mut finite: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.len() < 4 {
            continue;
        }
        finite.sort_unstable_by(|a, b| a.total_cmp(b));

        let q1 = finite[(finite.len() - 1) / 4];
        let q3 = finite[3 * (finite.len() - 1) / 4];
        let iqr = q3 - q1;
        let lo = q1 - 1.5 * iqr;
        let hi = q3 + 1.5 * iqr;

        let outliers = finite.iter().filter(|v| **v < lo || **v > hi).count();
        ratios.push(outliers as f64 / finite.len() as f64);
    }
    mean(&ratios)
}

fn nr_classes(input: &MfeInput) -> Option<f64> {
    Some(class_counts(input)?.len() as f64)
}

fn class_imbalance(input: &MfeInput) -> Option<f64> {
    let counts = class_counts(input)?;
    if counts.len() < 2 {
        return None;
    }
    let min = *counts.values().min()? as f64;
    let max = *counts.values().max()? as f64;
    Some(min / max)
}

fn attr_entropy_mean(input: &MfeInput) -> Option<f64> {
    let mut entropies = Vec::new();
    for column in input.matrix.axis_iter(Axis(1)) {
        let finite: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            continue;
        }
        let bins = discretize(&finite);
        entropies.push(entropy_of_ids(&bins));
    }
    mean(&entropies)
}

fn class_entropy(input: &MfeInput) -> Option<f64> {
    let labels = input.labels.as_ref()?;
    Some(entropy_of_ids(labels))
}

fn joint_entropy_mean(input: &MfeInput) -> Option<f64> {
    per_column_with_labels(input, |pairs| Some(joint_entropy(pairs)))
}

fn mutual_info_mean(input: &MfeInput) -> Option<f64> {
    per_column_with_labels(input, |pairs| {
        let attr: Vec<usize> = pairs.iter().map(|(a, _)| *a).collect();
        let class: Vec<usize> = pairs.iter().map(|(_, c)| *c).collect();
        let mi = entropy_of_ids(&attr) + entropy_of_ids(&class) - joint_entropy(pairs);
        Some(mi.max(0.0))
    })
}

fn equiv_nr_attr(input: &MfeInput) -> Option<f64> {
    let mi = mutual_info_mean(input)?;
    if mi <= MI_EPSILON {
        return None;
    }
    Some(class_entropy(input)? / mi)
}

fn noise_ratio(input: &MfeInput) -> Option<f64> {
    let mi = mutual_info_mean(input)?;
    if mi <= MI_EPSILON {
        return None;
    }
    Some((attr_entropy_mean(input)? - mi) / mi)
}

fn cor_mean(input: &MfeInput) -> Option<f64> {
    let columns: Vec<Vec<f64>> = input
        .matrix
        .axis_iter(Axis(1))
        .map(|c| c.to_vec())
        .collect();
    stat_features::mean_abs_correlation(&columns)
}

fn cov_mean(input: &MfeInput) -> Option<f64> {
    let columns: Vec<Vec<f64>> = input
        .matrix
        .axis_iter(Axis(1))
        .map(|c| c.to_vec())
        .collect();

    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..columns.len() {
        for j in (i + 1)..columns.len() {
            if let Some(cov) = covariance(&columns[i], &columns[j]) {
                total += cov.abs();
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

fn covariance(a: &[f64], b: &[f64]) -> Option<f64> {
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
    let cov = paired
        .iter()
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum::<f64>()
        / (n - 1.0);
    Some(cov)
}

/// Run `f` over each column's (binned value, class id) pairs and average
fn per_column_with_labels(
    input: &MfeInput,
    f: impl Fn(&[(usize, usize)]) -> Option<f64>,
) -> Option<f64> {
    let labels = input.labels.as_ref()?;
    let mut results = Vec::new();

    for column in input.matrix.axis_iter(Axis(1)) {
        let finite: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            continue;
        }
        let (min, width) = bin_scale(&finite);

        let pairs: Vec<(usize, usize)> = column
            .iter()
            .zip(labels.iter())
            .filter(|(v, _)| v.is_finite())
            .map(|(&v, &c)| (bin_index(v, min, width), c))
            .collect();
        if pairs.is_empty() {
            continue;
        }
        if let Some(value) = f(&pairs) {
            results.push(value);
        }
    }

    mean(&results)
}

/// Equal-width discretization of finite values
fn discretize(finite: &[f64]) -> Vec<usize> {
    let (min, width) = bin_scale(finite);
    finite.iter().map(|&v| bin_index(v, min, width)).collect()
}

fn bin_scale(finite: &[f64]) -> (f64, f64) {
    let min = finite.iter().copied().fold(f64::MAX, f64::min);
    let max = finite.iter().copied().fold(f64::MIN, f64::max);
    let width = (max - min) / DISCRETIZATION_BINS as f64;
    (min, width)
}

fn bin_index(value: f64, min: f64, width: f64) -> usize {
    if width <= 0.0 {
        return 0;
    }
    (((value - min) / width) as usize).min(DISCRETIZATION_BINS - 1)
}

/// Shannon entropy (nats) of an id sequence
fn entropy_of_ids(ids: &[usize]) -> f64 {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for &id in ids {
        *counts.entry(id).or_default() += 1;
    }
    let n = ids.len() as f64;
    counts
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum()
}

fn joint_entropy(pairs: &[(usize, usize)]) -> f64 {
    let mut counts: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for &pair in pairs {
        *counts.entry(pair).or_default() += 1;
    }
    let n = pairs.len() as f64;
    counts
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum()
}

fn class_counts(input: &MfeInput) -> Option<BTreeMap<usize, usize>> {
    let labels = input.labels.as_ref()?;
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_default() += 1;
    }
    Some(counts)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_entropy_of_uniform_ids() {
        assert_relative_eq!(entropy_of_ids(&[0, 1, 2, 3]), 4.0f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(entropy_of_ids(&[7, 7, 7]), 0.0);
    }

    #[test]
    fn test_discretize_constant_column_single_bin() {
        let bins = discretize(&[5.0, 5.0, 5.0]);
        assert!(bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_outlier_ratio_flags_extreme_value() {
        let mut column: Vec<f64> = (0..20).map(|i| i as f64).collect();
        column.push(1000.0);
        let input = MfeInput::unlabeled(
            ndarray::Array2::from_shape_vec((21, 1), column).unwrap(),
        );
        let ratio = outlier_ratio(&input).unwrap();
        assert!(ratio > 0.0 && ratio < 0.1);
    }

    #[test]
    fn test_sparsity_counts_zero_cells() {
        let input = MfeInput::unlabeled(array![[0.0, 1.0], [0.0, 2.0]]);
        assert_relative_eq!(sparsity(&input).unwrap(), 0.5);
    }

    #[test]
    fn test_mutual_information_of_predictive_column() {
        let matrix = array![[0.0], [0.0], [10.0], [10.0]];
        let input = MfeInput::new(matrix, Some(vec![0, 0, 1, 1])).unwrap();
        assert_relative_eq!(
            mutual_info_mean(&input).unwrap(),
            2.0f64.ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_covariance_matches_known_value() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![2.0, 4.0, 6.0];
        assert_relative_eq!(covariance(&a, &b).unwrap(), 2.0, epsilon = 1e-12);
    }
}
