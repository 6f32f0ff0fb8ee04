// ==============================================================================
// features.rs - Feature Extraction
// ==============================================================================
// Description: Aggregates annotated variants into the fixed-width model input
// Created: 2026-09-26
// Modified: 2026-10-04
// Version: 2.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::models::{AnnotatedVariant, ClinicalSignificance, FunctionalImpact, VariantClass};

/// Width of every feature vector
pub const FEATURE_COUNT: usize = 20;

/// Slot names, persisted next to each model and checked on load
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "high_impact_count",
    "moderate_impact_count",
    "low_impact_count",
    "modifier_impact_count",
    "pathogenic_count",
    "rare_count",
    "total_variants",
    "snp_count",
    "indel_count",
    "snp_fraction",
    "indel_fraction",
    "transition_fraction",
    "transversion_fraction",
    "deletion_fraction",
    "pathogenic_fraction",
    "benign_fraction",
    "uncertain_fraction",
    "rare_fraction",
    "common_fraction",
    "high_impact_fraction",
];

/// Slot indices referenced outside this module
pub mod slot {
    pub const HIGH_COUNT: usize = 0;
    pub const MODERATE_COUNT: usize = 1;
    pub const LOW_COUNT: usize = 2;
    pub const MODIFIER_COUNT: usize = 3;
    pub const PATHOGENIC_COUNT: usize = 4;
    pub const RARE_COUNT: usize = 5;
    pub const TOTAL: usize = 6;
    pub const SNP_COUNT: usize = 7;
    pub const INDEL_COUNT: usize = 8;
    pub const SNP_FRACTION: usize = 9;
    pub const INDEL_FRACTION: usize = 10;
    pub const TRANSITION_FRACTION: usize = 11;
    pub const TRANSVERSION_FRACTION: usize = 12;
    pub const DELETION_FRACTION: usize = 13;
    pub const PATHOGENIC_FRACTION: usize = 14;
    pub const BENIGN_FRACTION: usize = 15;
    pub const UNCERTAIN_FRACTION: usize = 16;
    pub const RARE_FRACTION: usize = 17;
    pub const COMMON_FRACTION: usize = 18;
    pub const HIGH_FRACTION: usize = 19;
}

/// Fixed-width numeric summary of one sample's variants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn zeros() -> Self {
        FeatureVector([0.0; FEATURE_COUNT])
    }

    /// Build from arbitrary-length values, zero-padding or truncating
    pub fn from_values(values: &[f64]) -> Self {
        let mut slots = [0.0; FEATURE_COUNT];
        for (dst, src) in slots.iter_mut().zip(values) {
            *dst = *src;
        }
        FeatureVector(slots)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, index: usize) -> f64 {
        self.0.get(index).copied().unwrap_or(0.0)
    }
}

#[derive(Default)]
struct Counts {
    high: usize,
    moderate: usize,
    low: usize,
    modifier: usize,
    pathogenic: usize,
    benign: usize,
    uncertain: usize,
    rare: usize,
    common: usize,
    snp: usize,
    indel: usize,
    transition: usize,
    transversion: usize,
    deletion: usize,
}

/// Derive the feature vector from annotated variants
///
/// Pure and order-independent. Fractions divide by `max(total, 1)`, so an
/// empty input yields all zeros.
pub fn extract_features(variants: &[AnnotatedVariant]) -> FeatureVector {
    let mut c = Counts::default();

    for v in variants {
        match v.functional_impact {
            FunctionalImpact::High => c.high += 1,
            FunctionalImpact::Moderate => c.moderate += 1,
            FunctionalImpact::Low => c.low += 1,
            FunctionalImpact::Modifier => c.modifier += 1,
        }

        if v.clinical_significance.is_pathogenic() {
            c.pathogenic += 1;
        } else if v.clinical_significance.is_benign() {
            c.benign += 1;
        } else if v.clinical_significance == ClinicalSignificance::UncertainSignificance {
            c.uncertain += 1;
        }

        if v.is_rare() {
            c.rare += 1;
        }
        if v.is_common() {
            c.common += 1;
        }

        if v.variant.is_snp() {
            c.snp += 1;
        }
        if v.variant.is_indel() {
            c.indel += 1;
        }

        match v.variant_class {
            VariantClass::Transition => c.transition += 1,
            VariantClass::Transversion => c.transversion += 1,
            VariantClass::Deletion => c.deletion += 1,
            VariantClass::Insertion | VariantClass::Complex => {}
        }
    }

    let total = variants.len();
    let denom = total.max(1) as f64;
    let frac = |n: usize| n as f64 / denom;

    let values = [
        c.high as f64,
        c.moderate as f64,
        c.low as f64,
        c.modifier as f64,
        c.pathogenic as f64,
        c.rare as f64,
        total as f64,
        c.snp as f64,
        c.indel as f64,
        frac(c.snp),
        frac(c.indel),
        frac(c.transition),
        frac(c.transversion),
        frac(c.deletion),
        frac(c.pathogenic),
        frac(c.benign),
        frac(c.uncertain),
        frac(c.rare),
        frac(c.common),
        frac(c.high),
    ];

    FeatureVector::from_values(&values)
}
