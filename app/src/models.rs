// ==============================================================================
// models.rs - Variant and Prediction Data Models
// ==============================================================================
// Description: Typed records passed between the pipeline stages
// Created: 2026-09-21
// Modified: 2026-10-09
// Version: 2.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound (exclusive) of the Low risk tier
pub const LOW_RISK_UPPER: f64 = 0.3;

/// Upper bound (exclusive) of the Moderate risk tier
pub const MODERATE_RISK_UPPER: f64 = 0.6;

/// Population frequency below which a variant counts as rare
pub const RARE_FREQUENCY: f64 = 0.01;

/// Population frequency above which a variant counts as common
pub const COMMON_FREQUENCY: f64 = 0.1;

/// A single parsed VCF data line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Chromosome exactly as written in the file (e.g., "chr1" or "1")
    pub chromosome: String,

    /// 1-based position, always > 0
    pub position: u64,

    /// ID column, `None` when the file has "."
    pub id: Option<String>,

    /// Reference allele
    pub reference: String,

    /// Alternate allele
    pub alternate: String,

    /// QUAL column, `None` when missing or "."
    pub quality: Option<f64>,

    /// FILTER column ("." when absent)
    pub filter: String,
}

impl Variant {
    /// Identity of a variant within one file
    pub fn key(&self) -> (&str, u64, &str, &str) {
        (&self.chromosome, self.position, &self.reference, &self.alternate)
    }

    /// Single-base substitution
    pub fn is_snp(&self) -> bool {
        self.reference.len() == 1 && self.alternate.len() == 1
    }

    /// Insertion or deletion (allele lengths differ)
    pub fn is_indel(&self) -> bool {
        self.reference.len() != self.alternate.len()
    }

    pub fn variant_class(&self) -> VariantClass {
        VariantClass::classify(&self.reference, &self.alternate)
    }

    /// Compact locus string, e.g. "chr1:1000:A:T"
    pub fn locus(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.chromosome, self.position, self.reference, self.alternate
        )
    }
}

/// Structural class of a variant derived from its alleles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantClass {
    /// Purine to purine or pyrimidine to pyrimidine substitution
    Transition,
    /// Purine to pyrimidine substitution or vice versa
    Transversion,
    Insertion,
    Deletion,
    /// Same-length multi-base substitution
    Complex,
}

impl VariantClass {
    pub fn classify(reference: &str, alternate: &str) -> Self {
        if reference.len() != alternate.len() {
            if reference.len() > alternate.len() {
                VariantClass::Deletion
            } else {
                VariantClass::Insertion
            }
        } else if reference.len() == 1 {
            let is_purine = |b: u8| matches!(b.to_ascii_uppercase(), b'A' | b'G');
            let is_pyrimidine = |b: u8| matches!(b.to_ascii_uppercase(), b'C' | b'T');
            let r = reference.as_bytes()[0];
            let a = alternate.as_bytes()[0];

            if (is_purine(r) && is_purine(a)) || (is_pyrimidine(r) && is_pyrimidine(a)) {
                VariantClass::Transition
            } else {
                VariantClass::Transversion
            }
        } else {
            VariantClass::Complex
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantClass::Transition => "transition",
            VariantClass::Transversion => "transversion",
            VariantClass::Insertion => "insertion",
            VariantClass::Deletion => "deletion",
            VariantClass::Complex => "complex",
        }
    }
}

/// Clinical significance as reported by ClinVar (or the heuristic fallback)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalSignificance {
    Pathogenic,
    LikelyPathogenic,
    UncertainSignificance,
    LikelyBenign,
    Benign,
    Unknown,
    /// The remote record for this variant failed validation
    AnnotationError,
}

impl ClinicalSignificance {
    /// Normalize a free-text ClinVar description
    ///
    /// Handles both spellings ("Likely pathogenic", "likely_pathogenic") and
    /// the combined ClinVar classifications ("Pathogenic/Likely pathogenic").
    pub fn from_description(description: &str) -> Self {
        let normalized = description
            .trim()
            .to_lowercase()
            .replace([' ', '-'], "_");

        if normalized.is_empty() {
            return ClinicalSignificance::Unknown;
        }
        if normalized.contains("conflicting") {
            return ClinicalSignificance::UncertainSignificance;
        }

        match normalized.as_str() {
            "pathogenic" | "pathogenic/likely_pathogenic" => ClinicalSignificance::Pathogenic,
            "likely_pathogenic" => ClinicalSignificance::LikelyPathogenic,
            "uncertain_significance" | "uncertain" | "vus" => {
                ClinicalSignificance::UncertainSignificance
            }
            "likely_benign" => ClinicalSignificance::LikelyBenign,
            "benign" | "benign/likely_benign" => ClinicalSignificance::Benign,
            _ => ClinicalSignificance::Unknown,
        }
    }

    pub fn is_pathogenic(&self) -> bool {
        matches!(
            self,
            ClinicalSignificance::Pathogenic | ClinicalSignificance::LikelyPathogenic
        )
    }

    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            ClinicalSignificance::Benign | ClinicalSignificance::LikelyBenign
        )
    }

    /// Weight used by report relevance scoring
    pub fn relevance_weight(&self) -> f64 {
        match self {
            ClinicalSignificance::Pathogenic => 1.0,
            ClinicalSignificance::LikelyPathogenic => 0.8,
            ClinicalSignificance::UncertainSignificance => 0.5,
            ClinicalSignificance::LikelyBenign => 0.2,
            ClinicalSignificance::Benign => 0.1,
            ClinicalSignificance::Unknown | ClinicalSignificance::AnnotationError => 0.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicalSignificance::Pathogenic => "pathogenic",
            ClinicalSignificance::LikelyPathogenic => "likely_pathogenic",
            ClinicalSignificance::UncertainSignificance => "uncertain_significance",
            ClinicalSignificance::LikelyBenign => "likely_benign",
            ClinicalSignificance::Benign => "benign",
            ClinicalSignificance::Unknown => "unknown",
            ClinicalSignificance::AnnotationError => "annotation_error",
        }
    }
}

/// Categorical severity of a variant's effect on gene function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FunctionalImpact {
    High,
    Moderate,
    Low,
    Modifier,
}

impl FunctionalImpact {
    /// Bucket an impact score in [0, 1]
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            FunctionalImpact::High
        } else if score >= 0.5 {
            FunctionalImpact::Moderate
        } else if score >= 0.2 {
            FunctionalImpact::Low
        } else {
            FunctionalImpact::Modifier
        }
    }

    /// Weight used by report relevance scoring
    pub fn relevance_weight(&self) -> f64 {
        match self {
            FunctionalImpact::High => 1.0,
            FunctionalImpact::Moderate => 0.7,
            FunctionalImpact::Low => 0.3,
            FunctionalImpact::Modifier => 0.1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionalImpact::High => "HIGH",
            FunctionalImpact::Moderate => "MODERATE",
            FunctionalImpact::Low => "LOW",
            FunctionalImpact::Modifier => "MODIFIER",
        }
    }
}

/// Where an annotation's clinical fields came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationOrigin {
    /// ClinVar and/or gnomAD returned data
    Remote,
    /// Deterministic fallback rules
    Heuristic,
    /// Remote data was rejected at the stage boundary
    Error,
}

/// Variant enriched with clinical, population and impact annotations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedVariant {
    #[serde(flatten)]
    pub variant: Variant,

    pub variant_class: VariantClass,

    pub clinical_significance: ClinicalSignificance,

    /// Condition name reported by ClinVar (or a generic label from the fallback)
    pub clinvar_disease: Option<String>,

    /// Strength of the significance call ("strong", "moderate", "limited")
    pub evidence_level: Option<String>,

    /// Allele frequency in [0, 1], `None` when unknown
    pub population_frequency: Option<f64>,

    pub functional_impact: FunctionalImpact,

    /// Raw impact score the category was derived from
    pub impact_score: f64,

    /// SIFT-style score (lower = more deleterious)
    pub sift_score: f64,

    /// PolyPhen-style score (higher = more damaging)
    pub polyphen_score: f64,

    pub origin: AnnotationOrigin,
}

impl AnnotatedVariant {
    pub fn is_rare(&self) -> bool {
        self.population_frequency
            .map(|f| f < RARE_FREQUENCY)
            .unwrap_or(false)
    }

    pub fn is_common(&self) -> bool {
        self.population_frequency
            .map(|f| f > COMMON_FREQUENCY)
            .unwrap_or(false)
    }
}

/// Diseases with a trained risk model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disease {
    Diabetes,
    Alzheimer,
    BrainTumor,
}

impl Disease {
    /// Every supported disease, in report order
    pub const ALL: [Disease; 3] = [Disease::Diabetes, Disease::Alzheimer, Disease::BrainTumor];

    /// Identifier used in artifact file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Disease::Diabetes => "diabetes",
            Disease::Alzheimer => "alzheimer",
            Disease::BrainTumor => "brain_tumor",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Disease::Diabetes => "Diabetes",
            Disease::Alzheimer => "Alzheimer's Disease",
            Disease::BrainTumor => "Brain Tumor",
        }
    }
}

impl fmt::Display for Disease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disease {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "diabetes" => Ok(Disease::Diabetes),
            "alzheimer" | "alzheimers" => Ok(Disease::Alzheimer),
            "brain_tumor" | "brain-tumor" | "tumor" => Ok(Disease::BrainTumor),
            other => Err(format!("Unknown disease: {}", other)),
        }
    }
}

/// Three-tier risk category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
}

impl RiskCategory {
    pub fn from_score(score: f64) -> Self {
        if score < LOW_RISK_UPPER {
            RiskCategory::Low
        } else if score < MODERATE_RISK_UPPER {
            RiskCategory::Moderate
        } else {
            RiskCategory::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Low",
            RiskCategory::Moderate => "Moderate",
            RiskCategory::High => "High",
        }
    }
}

/// Risk model output for one disease
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseasePrediction {
    pub disease: Disease,

    /// Positive-class probability in [0, 1]
    pub risk_score: f64,

    pub risk_category: RiskCategory,

    /// Max class probability in [0.5, 1]
    pub confidence: f64,

    pub key_factors: Vec<String>,

    pub recommendations: Vec<String>,

    /// Classifier family that produced the score
    pub model_type: String,
}
