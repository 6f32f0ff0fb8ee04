// ==============================================================================
// ml/tree.rs - CART regression tree
// ==============================================================================
// Description: Binary regression tree on squared error, arena-allocated
// Created: 2026-09-27
// Modified: 2026-10-07
// Version: 2.0.0
// ==============================================================================
// Notes:
// - On 0/1 targets the squared-error criterion ranks splits exactly like Gini,
//   so the same tree serves the forest (leaf = P(class 1)) and boosting
//   (leaf = Newton step, overwritten after fitting).
// - Split thresholds are midpoints between adjacent distinct values; samples
//   with value <= threshold go left.
// ==============================================================================

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Arena node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Growth limits
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` means all
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    score: f64,
}

/// Fitted tree; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Fit on the rows named by `samples` (duplicates allowed, for bootstraps)
    pub fn fit<R: Rng + ?Sized>(
        x: &[Vec<f64>],
        y: &[f64],
        samples: &[usize],
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let mut tree = RegressionTree { nodes: Vec::new() };
        tree.grow(x, y, samples, 0, params, rng);
        tree
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        match self.nodes.get(self.leaf_index(row)) {
            Some(Node::Leaf { value }) => *value,
            _ => 0.0,
        }
    }

    /// Arena index of the leaf a row falls into
    pub fn leaf_index(&self, row: &[f64]) -> usize {
        let mut idx = 0;
        while let Some(Node::Split {
            feature,
            threshold,
            left,
            right,
        }) = self.nodes.get(idx)
        {
            let value = row.get(*feature).copied().unwrap_or(0.0);
            idx = if value <= *threshold { *left } else { *right };
        }
        idx
    }

    /// Overwrite a leaf's output; ignored for split nodes
    pub fn set_leaf_value(&mut self, idx: usize, new_value: f64) {
        if let Some(Node::Leaf { value }) = self.nodes.get_mut(idx) {
            *value = new_value;
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }

    fn grow<R: Rng + ?Sized>(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        samples: &[usize],
        depth: usize,
        params: &TreeParams,
        rng: &mut R,
    ) -> usize {
        let node_id = self.nodes.len();
        let n = samples.len();
        let sum: f64 = samples.iter().map(|&i| y[i]).sum();
        let mean = if n > 0 { sum / n as f64 } else { 0.0 };
        self.nodes.push(Node::Leaf { value: mean });

        let pure = samples.iter().all(|&i| (y[i] - mean).abs() < 1e-12);
        if depth >= params.max_depth || n < params.min_samples_split.max(2) || pure {
            return node_id;
        }

        let Some(split) = best_split(x, y, samples, params, rng) else {
            return node_id;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&i| x[i][split.feature] <= split.threshold);

        let left_id = self.grow(x, y, &left, depth + 1, params, rng);
        let right_id = self.grow(x, y, &right, depth + 1, params, rng);

        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_id,
            right: right_id,
        };
        node_id
    }
}

/// Best squared-error split over a (possibly sampled) feature subset
fn best_split<R: Rng + ?Sized>(
    x: &[Vec<f64>],
    y: &[f64],
    samples: &[usize],
    params: &TreeParams,
    rng: &mut R,
) -> Option<Split> {
    let width = x.first().map(Vec::len).unwrap_or(0);
    if width == 0 {
        return None;
    }

    let features: Vec<usize> = match params.max_features {
        Some(k) if k > 0 && k < width => {
            let mut picked = index::sample(rng, width, k).into_vec();
            picked.sort_unstable();
            picked
        }
        _ => (0..width).collect(),
    };

    let n = samples.len();
    let total: f64 = samples.iter().map(|&i| y[i]).sum();
    // Maximizing sum_l^2/n_l + sum_r^2/n_r minimizes the children's SSE
    let parent_score = total * total / n as f64;
    let min_leaf = params.min_samples_leaf.max(1);

    let mut best: Option<Split> = None;
    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

    for feature in features {
        pairs.clear();
        pairs.extend(samples.iter().map(|&i| (x[i][feature], y[i])));
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        for i in 0..n - 1 {
            left_sum += pairs[i].1;
            let n_left = i + 1;
            let n_right = n - n_left;

            if pairs[i].0 == pairs[i + 1].0 || n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;

            if score > parent_score + 1e-12 && best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(Split {
                    feature,
                    threshold: (pairs[i].0 + pairs[i + 1].0) / 2.0,
                    score,
                });
            }
        }
    }

    best
}
