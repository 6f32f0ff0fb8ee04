// ==============================================================================
// ml/synthetic.rs - Synthetic training data
// ==============================================================================
// Description: Seeded feature vectors and rule-based labels for model training
// Created: 2026-09-28
// Modified: 2026-10-07
// Version: 2.0.0
// ==============================================================================
// Every fraction slot is drawn uniformly from [0, 1]. Count slots are tied to a
// sampled total (1..=2000) so their scale matches real uploads. Labels come
// from a per-disease weighted rule over three fraction slots.
// ==============================================================================

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::features::{slot, FEATURE_COUNT};
use crate::models::Disease;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_SAMPLES: usize = 1000;

const MAX_SYNTHETIC_VARIANTS: u32 = 2000;

/// Weighted-sum labelling rule
#[derive(Debug, Clone, Copy)]
pub struct LabelRule {
    pub weights: [(usize, f64); 3],
    pub threshold: f64,
}

impl LabelRule {
    pub fn for_disease(disease: Disease) -> Self {
        match disease {
            Disease::Diabetes => LabelRule {
                weights: [
                    (slot::HIGH_FRACTION, 0.3),
                    (slot::RARE_FRACTION, 0.4),
                    (slot::INDEL_FRACTION, 0.3),
                ],
                threshold: 0.6,
            },
            Disease::Alzheimer => LabelRule {
                weights: [
                    (slot::PATHOGENIC_FRACTION, 0.5),
                    (slot::TRANSITION_FRACTION, 0.3),
                    (slot::UNCERTAIN_FRACTION, 0.2),
                ],
                threshold: 0.7,
            },
            Disease::BrainTumor => LabelRule {
                weights: [
                    (slot::DELETION_FRACTION, 0.4),
                    (slot::TRANSVERSION_FRACTION, 0.4),
                    (slot::RARE_FRACTION, 0.2),
                ],
                threshold: 0.65,
            },
        }
    }

    pub fn score(&self, row: &[f64]) -> f64 {
        self.weights
            .iter()
            .map(|(idx, w)| row.get(*idx).copied().unwrap_or(0.0) * w)
            .sum()
    }

    pub fn label(&self, row: &[f64]) -> f64 {
        if self.score(row) > self.threshold {
            1.0
        } else {
            0.0
        }
    }
}

/// Row-major features with 0/1 labels
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

impl Dataset {
    pub fn positive_rate(&self) -> f64 {
        self.y.iter().sum::<f64>() / self.y.len().max(1) as f64
    }
}

/// RNG for one disease; each disease draws from its own ChaCha stream
pub fn disease_rng(disease: Disease, seed: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(disease as u64);
    rng
}

/// Generate `samples` labelled rows for one disease
pub fn generate<R: Rng + ?Sized>(disease: Disease, samples: usize, rng: &mut R) -> Dataset {
    let rule = LabelRule::for_disease(disease);
    let mut x = Vec::with_capacity(samples);
    let mut y = Vec::with_capacity(samples);

    for _ in 0..samples {
        let row = sample_row(rng);
        y.push(rule.label(&row));
        x.push(row);
    }

    Dataset { x, y }
}

fn sample_row<R: Rng + ?Sized>(rng: &mut R) -> Vec<f64> {
    let mut row = vec![0.0; FEATURE_COUNT];

    for value in row.iter_mut().skip(slot::SNP_FRACTION) {
        *value = rng.gen::<f64>();
    }

    let total = f64::from(rng.gen_range(1..=MAX_SYNTHETIC_VARIANTS));
    let count = |fraction: f64| (fraction * total).round();

    row[slot::HIGH_COUNT] = count(row[slot::HIGH_FRACTION]);
    row[slot::MODERATE_COUNT] = count(rng.gen::<f64>());
    row[slot::LOW_COUNT] = count(rng.gen::<f64>());
    row[slot::MODIFIER_COUNT] = count(rng.gen::<f64>());
    row[slot::PATHOGENIC_COUNT] = count(row[slot::PATHOGENIC_FRACTION]);
    row[slot::RARE_COUNT] = count(row[slot::RARE_FRACTION]);
    row[slot::TOTAL] = total;
    row[slot::SNP_COUNT] = count(row[slot::SNP_FRACTION]);
    row[slot::INDEL_COUNT] = count(row[slot::INDEL_FRACTION]);

    row
}
