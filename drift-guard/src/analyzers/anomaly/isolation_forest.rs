//! Isolation forest detector.
//!
//! Anomalies are few and different, so random axis-aligned splits isolate
//! them in fewer steps than normal points. Each tree is grown on a random
//! subsample of the standardized baseline; a row's expected path length over
//! all trees, normalized by the average path length of an unsuccessful BST
//! search `c(ψ)`, gives the score `0.5 - 2^(-E[h] / c(ψ))`. Lower scores are
//! more anomalous.

use rand::distr::Uniform;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{AnomalyScore, DetectorSettings, FeatureMatrix, MultivariateDetector, Standardizer};
use crate::error::{DriftError, Result};

const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Average path length of an unsuccessful search in a BST of `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn grow(
        matrix: &FeatureMatrix,
        indices: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> Result<Node> {
        if depth >= height_limit || indices.len() <= 1 {
            return Ok(Node::Leaf {
                size: indices.len(),
            });
        }

        // Only features that still vary, over a representable width, can split.
        let splittable: Vec<(usize, f64, f64)> = (0..matrix.n_features())
            .filter_map(|feature| {
                let (lo, hi) = indices.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), &i| {
                        let v = matrix.row(i)[feature];
                        (lo.min(v), hi.max(v))
                    },
                );
                (hi > lo && (hi - lo).is_finite()).then_some((feature, lo, hi))
            })
            .collect();
        if splittable.is_empty() {
            return Ok(Node::Leaf {
                size: indices.len(),
            });
        }

        let (feature, lo, hi) = splittable[rng.random_range(0..splittable.len())];
        let split = Uniform::new(lo, hi).map_err(|e| {
            DriftError::Internal(format!("invalid split range [{lo}, {hi}): {e}"))
        })?;
        let value = rng.sample(split);
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| matrix.row(i)[feature] < value);

        Ok(Node::Split {
            feature,
            value,
            left: Box::new(Node::grow(matrix, left, depth + 1, height_limit, rng)?),
            right: Box::new(Node::grow(matrix, right, depth + 1, height_limit, rng)?),
        })
    }

    fn path_length(&self, row: &[f64]) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    value,
                    left,
                    right,
                } => {
                    node = if row[*feature] < *value { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// A fitted forest.
#[derive(Debug)]
struct Forest {
    trees: Vec<Node>,
    normalizer: f64,
}

impl Forest {
    fn fit(matrix: &FeatureMatrix, settings: &DetectorSettings) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let sample_size = settings.subsample.min(matrix.n_rows());
        let height_limit = (sample_size.max(2) as f64).log2().ceil() as usize;

        let trees = (0..settings.trees)
            .map(|_| {
                let sample = index::sample(&mut rng, matrix.n_rows(), sample_size).into_vec();
                Node::grow(matrix, sample, 0, height_limit, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            trees,
            normalizer: average_path_length(sample_size),
        })
    }

    /// `0.5 - 2^(-E[h]/c(ψ))`; in `[-0.5, 0.5)`, lower is more anomalous.
    fn score(&self, row: &[f64]) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>()
            / self.trees.len() as f64;
        0.5 - 2f64.powf(-mean_path / self.normalizer)
    }
}

/// Seeded isolation forest over standardized features.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsolationForest;

impl IsolationForest {
    /// Per-row scores for `current` from a forest fitted on `baseline`.
    pub fn score_rows(
        baseline: &FeatureMatrix,
        current: &FeatureMatrix,
        settings: &DetectorSettings,
    ) -> Result<Vec<f64>> {
        Self::check_inputs(baseline, settings)?;
        let standardizer = Standardizer::fit(baseline);
        let forest = Forest::fit(&standardizer.transform(baseline), settings)?;
        let current = standardizer.transform(current);
        Ok(current.rows().iter().map(|r| forest.score(r)).collect())
    }

    fn check_inputs(baseline: &FeatureMatrix, settings: &DetectorSettings) -> Result<()> {
        if baseline.n_features() < 2 {
            return Err(DriftError::configuration(format!(
                "isolation forest needs at least 2 features, got {}",
                baseline.n_features()
            )));
        }
        if baseline.n_rows() < 2 || settings.trees == 0 || settings.subsample < 2 {
            return Err(DriftError::configuration(
                "isolation forest needs at least 2 rows, 1 tree and a subsample of 2",
            ));
        }
        Ok(())
    }
}

impl MultivariateDetector for IsolationForest {
    fn name(&self) -> &str {
        "isolation_forest"
    }

    fn score(
        &self,
        baseline: &FeatureMatrix,
        current: &FeatureMatrix,
        settings: &DetectorSettings,
    ) -> Result<AnomalyScore> {
        Self::check_inputs(baseline, settings)?;

        let standardizer = Standardizer::fit(baseline);
        let baseline_std = standardizer.transform(baseline);
        let current_std = standardizer.transform(current);
        let forest = Forest::fit(&baseline_std, settings)?;

        let flag = |row: &Vec<f64>| forest.score(row) < settings.threshold;
        let (baseline_fraction, baseline_rows) =
            AnomalyScore::fraction(baseline_std.rows().iter().map(flag));
        let (current_fraction, current_rows) =
            AnomalyScore::fraction(current_std.rows().iter().map(flag));

        debug!(
            trees = forest.trees.len(),
            baseline_fraction, current_fraction, "Isolation forest scored"
        );

        Ok(AnomalyScore {
            baseline_fraction,
            current_fraction,
            baseline_rows,
            current_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn gaussian_like(rng: &mut StdRng, n: usize, center: f64) -> Vec<Vec<f64>> {
        (0..n)
            .map(|_| {
                // Sum of uniforms: cheap, bounded, roughly bell shaped.
                let a: f64 = (0..6).map(|_| rng.random::<f64>()).sum::<f64>() - 3.0;
                let b: f64 = (0..6).map(|_| rng.random::<f64>()).sum::<f64>() - 3.0;
                vec![center + a, center + b]
            })
            .collect()
    }

    fn matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
        FeatureMatrix::new(vec!["a".into(), "b".into()], rows).unwrap()
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // c(256) is about 10.24
        assert!((average_path_length(256) - 10.24).abs() < 0.01);
    }

    #[test]
    fn test_same_seed_same_scores() {
        let mut rng = StdRng::seed_from_u64(7);
        let baseline = matrix(gaussian_like(&mut rng, 400, 0.0));
        let current = matrix(gaussian_like(&mut rng, 200, 0.5));
        let settings = DetectorSettings::default();

        let first = IsolationForest.score(&baseline, &current, &settings).unwrap();
        let second = IsolationForest.score(&baseline, &current, &settings).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_far_points_score_lower() {
        let mut rng = StdRng::seed_from_u64(11);
        let baseline = matrix(gaussian_like(&mut rng, 500, 0.0));
        let probes = matrix(vec![vec![0.0, 0.0], vec![25.0, -25.0]]);
        let scores =
            IsolationForest::score_rows(&baseline, &probes, &DetectorSettings::default()).unwrap();
        assert!(scores[1] < scores[0]);
        assert!(scores[1] < -0.1);
    }

    #[test]
    fn test_shifted_current_has_excess_anomalies() {
        let mut rng = StdRng::seed_from_u64(3);
        let baseline = matrix(gaussian_like(&mut rng, 500, 0.0));
        let current = matrix(gaussian_like(&mut rng, 300, 20.0));
        let score = IsolationForest
            .score(&baseline, &current, &DetectorSettings::default())
            .unwrap();
        assert!(score.current_fraction - score.baseline_fraction > 0.5);
    }

    #[test]
    fn test_overflowing_spread_is_not_split() {
        let mut rows = vec![vec![1e308, 0.0], vec![-1e308, 1.0]];
        rows.extend((0..40i32).map(|i| vec![f64::from(i), f64::from(i % 5)]));
        let baseline = matrix(rows);
        let score = IsolationForest
            .score(&baseline, &baseline, &DetectorSettings::default())
            .unwrap();
        assert_eq!(score.baseline_fraction, score.current_fraction);
    }

    #[test]
    fn test_constant_features_do_not_panic() {
        let baseline = matrix(vec![vec![1.0, 1.0]; 50]);
        let score = IsolationForest
            .score(&baseline, &baseline, &DetectorSettings::default())
            .unwrap();
        assert_eq!(score.baseline_fraction, score.current_fraction);
    }
}
