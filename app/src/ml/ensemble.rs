// ==============================================================================
// ml/ensemble.rs - Tree ensembles for binary classification
// ==============================================================================
// Description: Bootstrap random forest and binomial-deviance gradient boosting
// Created: 2026-09-28
// Modified: 2026-10-07
// Version: 2.0.0
// ==============================================================================

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::tree::{Node, RegressionTree, TreeParams};

/// Random forest hyperparameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Gradient boosting hyperparameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

// ============================================================================
// Random forest
// ============================================================================

/// Averages P(class 1) over bootstrap trees with sqrt(d) features per split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit<R: Rng + ?Sized>(x: &[Vec<f64>], y: &[f64], params: &ForestParams, rng: &mut R) -> Self {
        let n = x.len();
        if n == 0 {
            return Self { trees: Vec::new() };
        }
        let width = x.first().map(Vec::len).unwrap_or(0);
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: Some(((width as f64).sqrt() as usize).max(1)),
        };

        let trees = (0..params.n_estimators)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &bootstrap, &tree_params, rng)
            })
            .collect();

        Self { trees }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        sum / self.trees.len() as f64
    }
}

// ============================================================================
// Gradient boosting
// ============================================================================

/// Log-odds additive model fit on binomial deviance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn fit<R: Rng + ?Sized>(x: &[Vec<f64>], y: &[f64], params: &BoostingParams, rng: &mut R) -> Self {
        let n = x.len();
        let positives: f64 = y.iter().sum();
        let prior = (positives / n.max(1) as f64).clamp(1e-6, 1.0 - 1e-6);
        let init = (prior / (1.0 - prior)).ln();

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: None,
        };
        let samples: Vec<usize> = (0..n).collect();

        let mut raw = vec![init; n];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let prob: Vec<f64> = raw.iter().map(|&f| sigmoid(f)).collect();
            let residual: Vec<f64> = y.iter().zip(&prob).map(|(t, p)| t - p).collect();

            let mut tree = RegressionTree::fit(x, &residual, &samples, &tree_params, rng);

            // Newton step per leaf: sum(r) / sum(p(1-p))
            let mut per_leaf: HashMap<usize, (f64, f64)> = HashMap::new();
            let leaves: Vec<usize> = x.iter().map(|row| tree.leaf_index(row)).collect();
            for (i, &leaf) in leaves.iter().enumerate() {
                let entry = per_leaf.entry(leaf).or_insert((0.0, 0.0));
                entry.0 += residual[i];
                entry.1 += prob[i] * (1.0 - prob[i]);
            }
            for (&leaf, &(numerator, denominator)) in &per_leaf {
                let step = if denominator.abs() < 1e-12 {
                    0.0
                } else {
                    numerator / denominator
                };
                tree.set_leaf_value(leaf, step);
            }

            for (f, &leaf) in raw.iter_mut().zip(&leaves) {
                *f += params.learning_rate * leaf_value(&tree, leaf);
            }

            trees.push(tree);
        }

        Self {
            init,
            learning_rate: params.learning_rate,
            trees,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn decision_function(&self, row: &[f64]) -> f64 {
        self.init
            + self.learning_rate * self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.decision_function(row))
    }
}

fn leaf_value(tree: &RegressionTree, leaf: usize) -> f64 {
    match tree.nodes().get(leaf) {
        Some(Node::Leaf { value }) => *value,
        _ => 0.0,
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

// ============================================================================
// Classifier
// ============================================================================

/// A fitted binary classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl Classifier {
    /// Probability of the positive class, clamped to [0, 1]
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let p = match self {
            Classifier::RandomForest(m) => m.predict_proba(row),
            Classifier::GradientBoosting(m) => m.predict_proba(row),
        };
        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            0.5
        }
    }

    pub fn model_type(&self) -> &'static str {
        match self {
            Classifier::RandomForest(_) => "RandomForestClassifier",
            Classifier::GradientBoosting(_) => "GradientBoostingClassifier",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Label is 1 when x0 + x1 > 1
    fn dataset(n: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let x: Vec<Vec<f64>> = (0..n)
            .map(|_| vec![rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()])
            .collect();
        let y = x
            .iter()
            .map(|r| if r[0] + r[1] > 1.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    fn accuracy(predict: impl Fn(&[f64]) -> f64, x: &[Vec<f64>], y: &[f64]) -> f64 {
        let correct = x
            .iter()
            .zip(y)
            .filter(|(row, label)| (predict(row.as_slice()) >= 0.5) == (**label == 1.0))
            .count();
        correct as f64 / y.len() as f64
    }

    #[test]
    fn test_random_forest_learns() {
        let (x, y) = dataset(300, 1);
        let (x_test, y_test) = dataset(200, 2);
        let params = ForestParams {
            n_estimators: 25,
            ..ForestParams::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let forest = RandomForest::fit(&x, &y, &params, &mut rng);

        assert_eq!(forest.n_trees(), 25);
        assert!(accuracy(|r| forest.predict_proba(r), &x_test, &y_test) > 0.8);
    }

    #[test]
    fn test_gradient_boosting_learns() {
        let (x, y) = dataset(300, 3);
        let (x_test, y_test) = dataset(200, 4);
        let params = BoostingParams {
            n_estimators: 50,
            ..BoostingParams::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let model = GradientBoosting::fit(&x, &y, &params, &mut rng);

        assert_eq!(model.n_trees(), 50);
        assert!(accuracy(|r| model.predict_proba(r), &x_test, &y_test) > 0.8);
    }

    #[test]
    fn test_boosting_init_is_log_odds() {
        let x = vec![vec![0.0]; 4];
        let y = vec![1.0, 0.0, 0.0, 0.0];
        let params = BoostingParams {
            n_estimators: 0,
            ..BoostingParams::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let model = GradientBoosting::fit(&x, &y, &params, &mut rng);
        assert!((model.predict_proba(&[0.0]) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_model() {
        let (x, y) = dataset(100, 5);
        let params = ForestParams {
            n_estimators: 5,
            ..ForestParams::default()
        };

        let a = RandomForest::fit(&x, &y, &params, &mut ChaCha8Rng::seed_from_u64(9));
        let b = RandomForest::fit(&x, &y, &params, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_classifier_probabilities_in_range() {
        let (x, y) = dataset(100, 6);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let classifier = Classifier::GradientBoosting(GradientBoosting::fit(
            &x,
            &y,
            &BoostingParams::default(),
            &mut rng,
        ));

        for row in &x {
            let p = classifier.predict_proba(row);
            assert!((0.0..=1.0).contains(&p));
        }
        assert_eq!(classifier.model_type(), "GradientBoostingClassifier");
    }
}
