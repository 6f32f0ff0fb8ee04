// ==============================================================================
// annotation/heuristics.rs - Deterministic fallback annotation
// ==============================================================================
// Description: Local rules for significance and functional impact
// Created: 2026-09-24
// Modified: 2026-10-05
// Version: 2.0.0
// ==============================================================================

use crate::models::{ClinicalSignificance, FunctionalImpact, Variant};

/// Clinical fields produced either remotely or by the fallback rules
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalCall {
    pub significance: ClinicalSignificance,
    pub disease: Option<String>,
    pub evidence_level: Option<String>,
}

/// Impact fields, always computed locally
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactCall {
    pub score: f64,
    pub category: FunctionalImpact,
    pub sift: f64,
    pub polyphen: f64,
}

/// Substitutions scored as conservative
const CONSERVATIVE: &[(u8, &[u8])] = &[
    (b'A', b"GST"),
    (b'V', b"ILM"),
    (b'I', b"LMV"),
    (b'L', b"IMV"),
    (b'M', b"ILV"),
];

fn call(significance: ClinicalSignificance, disease: Option<&str>, evidence: &str) -> ClinicalCall {
    ClinicalCall {
        significance,
        disease: disease.map(str::to_string),
        evidence_level: Some(evidence.to_string()),
    }
}

/// Significance from variant shape alone
pub fn clinical_significance(variant: &Variant) -> ClinicalCall {
    if variant.is_indel() {
        return call(ClinicalSignificance::UncertainSignificance, None, "limited");
    }

    if variant.is_snp() {
        let r = variant.reference.as_bytes()[0].to_ascii_uppercase();
        let a = variant.alternate.as_bytes()[0].to_ascii_uppercase();

        if matches!(r, b'A' | b'T') && matches!(a, b'G' | b'C') {
            return call(ClinicalSignificance::Benign, Some("common_variant"), "strong");
        }
        return call(
            ClinicalSignificance::UncertainSignificance,
            Some("genetic_variant"),
            "moderate",
        );
    }

    call(ClinicalSignificance::UncertainSignificance, None, "limited")
}

/// Impact score and derived SIFT/PolyPhen-style values
pub fn functional_impact(variant: &Variant) -> ImpactCall {
    let (score, sift, polyphen) = if variant.is_indel() {
        (0.8, 0.1, 0.9)
    } else if variant.is_snp() {
        let score = snp_impact(
            variant.reference.as_bytes()[0].to_ascii_uppercase(),
            variant.alternate.as_bytes()[0].to_ascii_uppercase(),
        );
        (score, 1.0 - score, score)
    } else {
        (0.6, 0.3, 0.7)
    };

    ImpactCall {
        score,
        category: FunctionalImpact::from_score(score),
        sift,
        polyphen,
    }
}

fn snp_impact(reference: u8, alternate: u8) -> f64 {
    if reference == alternate {
        return 0.0;
    }

    let conservative = CONSERVATIVE
        .iter()
        .any(|(r, alts)| *r == reference && alts.contains(&alternate));

    if conservative {
        0.2
    } else {
        0.6
    }
}
