// ==============================================================================
// report.rs - Risk Report Assembly
// ==============================================================================
// Description: Pure aggregation of variants and predictions into the report
// Created: 2026-10-01
// Modified: 2026-10-09
// Version: 2.0.0
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::{
    AnnotatedVariant, AnnotationOrigin, ClinicalSignificance, Disease, DiseasePrediction,
    FunctionalImpact, RiskCategory, RARE_FREQUENCY,
};

pub const PIPELINE_VERSION: &str = concat!("curagenie-pipeline/", env!("CARGO_PKG_VERSION"));

/// Maximum key variants listed per disease
pub const MAX_KEY_VARIANTS: usize = 10;

pub const DISCLAIMER: &str = "IMPORTANT: This analysis is for informational and research purposes only. \
It is not a medical diagnosis and should not replace consultation with qualified healthcare professionals. \
Genetic risk assessments are probabilistic and do not guarantee disease development or absence. \
Always consult with your physician for medical advice and interpretation of results.";

// ============================================================================
// Report structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub size_bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyVariant {
    pub chromosome: String,
    pub position: u64,
    pub reference: String,
    pub alternate: String,
    pub functional_impact: FunctionalImpact,
    pub clinical_significance: ClinicalSignificance,
    pub clinvar_disease: Option<String>,
    pub population_frequency: Option<f64>,
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseAssessment {
    pub disease: Disease,
    pub title: String,
    pub prediction: DiseasePrediction,
    pub key_genes: Vec<String>,
    pub key_variants: Vec<KeyVariant>,
    pub supporting_evidence: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub overall_risk: RiskCategory,
    pub mean_risk_score: f64,
    pub primary_concern: Option<Disease>,
    pub diseases_assessed: usize,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSummary {
    pub total_variants: usize,
    pub impact_distribution: BTreeMap<String, usize>,
    pub significance_distribution: BTreeMap<String, usize>,
    /// Mean over variants with a known frequency
    pub average_population_frequency: Option<f64>,
    pub rare_variants: usize,
    pub pathogenic_variants: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalDetails {
    pub pipeline_version: String,
    pub annotation_sources: Vec<String>,
    /// disease -> classifier family
    pub models_used: BTreeMap<String, String>,
    pub stage_timings_seconds: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report_id: Uuid,
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    pub file: FileMetadata,
    pub processing_time_seconds: f64,
    pub total_variants: usize,
    pub annotated_variants: usize,
    pub executive_summary: ExecutiveSummary,
    pub disease_assessments: Vec<DiseaseAssessment>,
    pub variant_summary: VariantSummary,
    pub technical_details: TechnicalDetails,
    pub disclaimer: String,
}

/// Everything about the run that is not derived from variants or predictions
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub report_id: Uuid,
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    pub file: FileMetadata,
    pub processing_time_seconds: f64,
    pub annotation_sources: Vec<String>,
    pub models_used: BTreeMap<String, String>,
    pub stage_timings_seconds: BTreeMap<String, f64>,
}

// ============================================================================
// Templates
// ============================================================================

struct DiseaseTemplate {
    title: &'static str,
    key_genes: &'static [&'static str],
    recommendations: &'static [&'static str],
    elevated_evidence: &'static str,
    high_risk_action: &'static str,
}

fn template(disease: Disease) -> DiseaseTemplate {
    match disease {
        Disease::Diabetes => DiseaseTemplate {
            title: "Type 2 Diabetes Risk Assessment",
            key_genes: &["TCF7L2", "PPARG", "KCNJ11", "CDKAL1"],
            recommendations: &[
                "Monitor blood glucose levels regularly",
                "Maintain healthy diet and exercise routine",
                "Consult with endocrinologist if risk is high",
                "Consider genetic counseling for family planning",
            ],
            elevated_evidence: "Elevated risk factors consistent with Type 2 Diabetes",
            high_risk_action: "Begin regular glucose monitoring and lifestyle modifications",
        },
        Disease::Alzheimer => DiseaseTemplate {
            title: "Alzheimer's Disease Risk Assessment",
            key_genes: &["APOE", "APP", "PSEN1", "PSEN2", "TREM2"],
            recommendations: &[
                "Regular cognitive assessments",
                "Maintain brain health through mental stimulation",
                "Consult with neurologist for baseline evaluation",
                "Consider participation in clinical trials if eligible",
            ],
            elevated_evidence: "Genetic profile associated with increased Alzheimer's risk",
            high_risk_action: "Establish baseline cognitive assessment with neurologist",
        },
        Disease::BrainTumor => DiseaseTemplate {
            title: "Brain Tumor Risk Assessment",
            key_genes: &["TP53", "NF1", "NF2", "VHL", "PTCH1"],
            recommendations: &[
                "Regular neurological examinations",
                "Immediate medical attention for new symptoms",
                "Consider genetic testing for family members",
                "Consult with neurosurgeon if risk is high",
            ],
            elevated_evidence: "Genetic markers suggestive of brain tumor predisposition",
            high_risk_action: "Immediate neurological evaluation recommended",
        },
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Build the report; output depends only on the arguments
pub fn generate_report(
    context: ReportContext,
    variants: &[AnnotatedVariant],
    predictions: &[DiseasePrediction],
) -> Report {
    let key_variants = select_key_variants(variants);

    let disease_assessments = predictions
        .iter()
        .map(|p| assess_disease(p, &key_variants))
        .collect();

    Report {
        report_id: context.report_id,
        user_id: context.user_id,
        generated_at: context.generated_at,
        file: context.file,
        processing_time_seconds: context.processing_time_seconds,
        total_variants: variants.len(),
        annotated_variants: variants
            .iter()
            .filter(|v| v.origin != AnnotationOrigin::Error)
            .count(),
        executive_summary: executive_summary(predictions),
        disease_assessments,
        variant_summary: variant_summary(variants),
        technical_details: TechnicalDetails {
            pipeline_version: PIPELINE_VERSION.to_string(),
            annotation_sources: context.annotation_sources,
            models_used: context.models_used,
            stage_timings_seconds: context.stage_timings_seconds,
        },
        disclaimer: DISCLAIMER.to_string(),
    }
}

/// HIGH/MODERATE impact, pathogenic, or rare
pub fn is_relevant(variant: &AnnotatedVariant) -> bool {
    matches!(
        variant.functional_impact,
        FunctionalImpact::High | FunctionalImpact::Moderate
    ) || variant.clinical_significance.is_pathogenic()
        || variant.is_rare()
}

pub fn relevance_score(variant: &AnnotatedVariant) -> f64 {
    let rarity_bonus = match variant.population_frequency {
        Some(f) if f < 0.001 => 0.3,
        Some(f) if f < RARE_FREQUENCY => 0.2,
        Some(f) if f < 0.1 => 0.1,
        _ => 0.0,
    };

    let score = variant.functional_impact.relevance_weight()
        + variant.clinical_significance.relevance_weight()
        + rarity_bonus;
    score.min(1.0)
}

/// Relevant variants by descending relevance, ties in input order, at most ten
pub fn select_key_variants(variants: &[AnnotatedVariant]) -> Vec<KeyVariant> {
    let mut key: Vec<KeyVariant> = variants
        .iter()
        .filter(|v| is_relevant(v))
        .map(|v| KeyVariant {
            chromosome: v.variant.chromosome.clone(),
            position: v.variant.position,
            reference: v.variant.reference.clone(),
            alternate: v.variant.alternate.clone(),
            functional_impact: v.functional_impact,
            clinical_significance: v.clinical_significance,
            clinvar_disease: v.clinvar_disease.clone(),
            population_frequency: v.population_frequency,
            relevance_score: relevance_score(v),
        })
        .collect();

    // sort_by is stable
    key.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    key.truncate(MAX_KEY_VARIANTS);
    key
}

fn assess_disease(prediction: &DiseasePrediction, key_variants: &[KeyVariant]) -> DiseaseAssessment {
    let template = template(prediction.disease);

    DiseaseAssessment {
        disease: prediction.disease,
        title: template.title.to_string(),
        prediction: prediction.clone(),
        key_genes: template.key_genes.iter().map(|g| g.to_string()).collect(),
        key_variants: key_variants.to_vec(),
        supporting_evidence: supporting_evidence(prediction, key_variants, &template),
        recommendations: personalized_recommendations(prediction, key_variants, &template),
    }
}

fn supporting_evidence(
    prediction: &DiseasePrediction,
    key_variants: &[KeyVariant],
    template: &DiseaseTemplate,
) -> Vec<String> {
    let mut evidence = Vec::new();

    if prediction.confidence > 0.7 {
        evidence.push(format!("High-confidence prediction from {}", prediction.model_type));
    }

    let high_impact = key_variants
        .iter()
        .filter(|v| v.functional_impact == FunctionalImpact::High)
        .count();
    if high_impact > 0 {
        evidence.push(format!("Found {} high-impact genetic variants", high_impact));
    }

    let pathogenic = key_variants
        .iter()
        .filter(|v| v.clinical_significance.is_pathogenic())
        .count();
    if pathogenic > 0 {
        evidence.push(format!("Identified {} clinically significant variants", pathogenic));
    }

    let rare = key_variants
        .iter()
        .filter(|v| v.population_frequency.is_some_and(|f| f < RARE_FREQUENCY))
        .count();
    if rare > 0 {
        evidence.push(format!("Detected {} rare genetic variants", rare));
    }

    if prediction.risk_score > 0.6 {
        evidence.push(template.elevated_evidence.to_string());
    }

    evidence
}

fn personalized_recommendations(
    prediction: &DiseasePrediction,
    key_variants: &[KeyVariant],
    template: &DiseaseTemplate,
) -> Vec<String> {
    let mut recommendations: Vec<String> =
        template.recommendations.iter().map(|r| r.to_string()).collect();

    match prediction.risk_category {
        RiskCategory::High => {
            recommendations.push("Schedule consultation with specialist within 2-4 weeks".to_string());
            recommendations.push("Consider additional genetic testing for family members".to_string());
            recommendations.push(template.high_risk_action.to_string());
        }
        RiskCategory::Moderate => {
            recommendations.push("Schedule follow-up consultation within 3-6 months".to_string());
            recommendations.push("Monitor for new symptoms or changes in condition".to_string());
        }
        RiskCategory::Low => {}
    }

    if key_variants
        .iter()
        .any(|v| v.functional_impact == FunctionalImpact::High)
    {
        recommendations.push("High-impact variants detected - consider genetic counseling".to_string());
    }
    if key_variants
        .iter()
        .any(|v| v.clinical_significance.is_pathogenic())
    {
        recommendations.push("Pathogenic variants identified - clinical correlation recommended".to_string());
    }

    recommendations
}

fn executive_summary(predictions: &[DiseasePrediction]) -> ExecutiveSummary {
    let mean_risk_score = if predictions.is_empty() {
        0.0
    } else {
        predictions.iter().map(|p| p.risk_score).sum::<f64>() / predictions.len() as f64
    };
    let overall_risk = RiskCategory::from_score(mean_risk_score);

    // First of equal maxima wins
    let primary = predictions.iter().fold(None::<&DiseasePrediction>, |best, p| match best {
        Some(b) if b.risk_score >= p.risk_score => Some(b),
        _ => Some(p),
    });

    let summary = match primary {
        Some(p) => format!(
            "Overall genetic risk is {} (mean risk score {:.2}). Highest assessed risk: {} ({}, {:.2}).",
            overall_risk.as_str(),
            mean_risk_score,
            p.disease.display_name(),
            p.risk_category.as_str(),
            p.risk_score
        ),
        None => "No disease risk models were evaluated.".to_string(),
    };

    ExecutiveSummary {
        overall_risk,
        mean_risk_score,
        primary_concern: primary.map(|p| p.disease),
        diseases_assessed: predictions.len(),
        summary,
    }
}

fn variant_summary(variants: &[AnnotatedVariant]) -> VariantSummary {
    let mut impact_distribution = BTreeMap::new();
    let mut significance_distribution = BTreeMap::new();

    for v in variants {
        *impact_distribution
            .entry(v.functional_impact.as_str().to_string())
            .or_insert(0) += 1;
        *significance_distribution
            .entry(v.clinical_significance.as_str().to_string())
            .or_insert(0) += 1;
    }

    let frequencies: Vec<f64> = variants.iter().filter_map(|v| v.population_frequency).collect();
    let average_population_frequency = if frequencies.is_empty() {
        None
    } else {
        Some(frequencies.iter().sum::<f64>() / frequencies.len() as f64)
    };

    VariantSummary {
        total_variants: variants.len(),
        impact_distribution,
        significance_distribution,
        average_population_frequency,
        rare_variants: variants.iter().filter(|v| v.is_rare()).count(),
        pathogenic_variants: variants
            .iter()
            .filter(|v| v.clinical_significance.is_pathogenic())
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Variant;

    fn annotated(
        position: u64,
        impact: FunctionalImpact,
        significance: ClinicalSignificance,
        frequency: Option<f64>,
    ) -> AnnotatedVariant {
        let variant = Variant {
            chromosome: "chr1".to_string(),
            position,
            id: None,
            reference: "A".to_string(),
            alternate: "T".to_string(),
            quality: None,
            filter: "PASS".to_string(),
        };
        AnnotatedVariant {
            variant_class: variant.variant_class(),
            variant,
            clinical_significance: significance,
            clinvar_disease: None,
            evidence_level: None,
            population_frequency: frequency,
            functional_impact: impact,
            impact_score: 0.6,
            sift_score: 0.4,
            polyphen_score: 0.6,
            origin: AnnotationOrigin::Heuristic,
        }
    }

    fn prediction(disease: Disease, risk_score: f64) -> DiseasePrediction {
        DiseasePrediction {
            disease,
            risk_score,
            risk_category: RiskCategory::from_score(risk_score),
            confidence: risk_score.max(1.0 - risk_score),
            key_factors: vec!["Standard genetic background".to_string()],
            recommendations: Vec::new(),
            model_type: "RandomForestClassifier".to_string(),
        }
    }

    fn context() -> ReportContext {
        ReportContext {
            report_id: Uuid::nil(),
            user_id: "user-1".to_string(),
            generated_at: DateTime::parse_from_rfc3339("2026-10-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            file: FileMetadata {
                name: "sample.vcf".to_string(),
                size_bytes: 120,
                sha256: "00".repeat(32),
            },
            processing_time_seconds: 0.5,
            annotation_sources: vec!["heuristic".to_string()],
            models_used: BTreeMap::new(),
            stage_timings_seconds: BTreeMap::new(),
        }
    }

    #[test]
    fn test_relevance_filter() {
        use ClinicalSignificance::*;
        use FunctionalImpact::*;

        assert!(is_relevant(&annotated(1, High, Benign, None)));
        assert!(is_relevant(&annotated(1, Moderate, Benign, None)));
        assert!(is_relevant(&annotated(1, Low, LikelyPathogenic, None)));
        assert!(is_relevant(&annotated(1, Modifier, Benign, Some(0.005))));
        assert!(!is_relevant(&annotated(1, Low, UncertainSignificance, Some(0.05))));
        assert!(!is_relevant(&annotated(1, Modifier, Benign, None)));
    }

    #[test]
    fn test_relevance_score() {
        use ClinicalSignificance::*;
        use FunctionalImpact::*;

        assert_eq!(relevance_score(&annotated(1, Modifier, Benign, None)), 0.2);
        assert!((relevance_score(&annotated(1, Low, LikelyBenign, Some(0.05))) - 0.6).abs() < 1e-12);
        assert_eq!(relevance_score(&annotated(1, High, Pathogenic, Some(0.0001))), 1.0);
        assert!((relevance_score(&annotated(1, Modifier, Benign, Some(0.0005))) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_key_variants_sorted_and_capped() {
        use ClinicalSignificance::*;
        use FunctionalImpact::*;

        let mut variants: Vec<AnnotatedVariant> = (1..=12)
            .map(|p| annotated(p, Moderate, UncertainSignificance, None))
            .collect();
        variants.push(annotated(13, Low, Pathogenic, None));
        variants.push(annotated(14, Modifier, Benign, Some(0.005)));

        let key = select_key_variants(&variants);

        assert_eq!(key.len(), MAX_KEY_VARIANTS);
        // Pathogenic LOW scores 1.0, the MODERATE/uncertain block scores 1.0 too (capped),
        // so input order decides among them
        let positions: Vec<u64> = key.iter().map(|k| k.position).collect();
        assert_eq!(positions, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_ties_keep_input_order() {
        use ClinicalSignificance::*;
        use FunctionalImpact::*;

        let variants = vec![
            annotated(5, Low, LikelyBenign, Some(0.005)),
            annotated(3, Modifier, Benign, Some(0.0001)),
            annotated(9, Low, LikelyBenign, Some(0.002)),
            annotated(1, High, Pathogenic, None),
        ];

        let key = select_key_variants(&variants);
        let positions: Vec<u64> = key.iter().map(|k| k.position).collect();

        // 1.0, then three variants scoring 0.7/0.5/0.7
        assert_eq!(positions, vec![1, 5, 9, 3]);
    }

    #[test]
    fn test_report_includes_disclaimer_and_assessments() {
        let variants = vec![annotated(1000, FunctionalImpact::Moderate, ClinicalSignificance::UncertainSignificance, None)];
        let predictions = vec![
            prediction(Disease::Diabetes, 0.2),
            prediction(Disease::Alzheimer, 0.45),
            prediction(Disease::BrainTumor, 0.7),
        ];

        let report = generate_report(context(), &variants, &predictions);

        assert_eq!(report.disclaimer, DISCLAIMER);
        assert!(report.disclaimer.starts_with("IMPORTANT: This analysis"));
        assert_eq!(report.disease_assessments.len(), 3);
        assert_eq!(report.total_variants, 1);
        assert_eq!(report.annotated_variants, 1);
        assert_eq!(report.disease_assessments[0].title, "Type 2 Diabetes Risk Assessment");
        assert_eq!(report.disease_assessments[0].key_variants.len(), 1);

        // Mean 0.45 -> Moderate, brain tumor is the highest
        assert_eq!(report.executive_summary.overall_risk, RiskCategory::Moderate);
        assert_eq!(report.executive_summary.primary_concern, Some(Disease::BrainTumor));
        assert!((report.executive_summary.mean_risk_score - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_evidence_and_recommendations() {
        let variants = vec![
            annotated(1, FunctionalImpact::High, ClinicalSignificance::Pathogenic, Some(0.0005)),
        ];
        let predictions = vec![prediction(Disease::BrainTumor, 0.9), prediction(Disease::Diabetes, 0.4)];

        let report = generate_report(context(), &variants, &predictions);
        let tumor = &report.disease_assessments[0];

        assert_eq!(
            tumor.supporting_evidence,
            vec![
                "High-confidence prediction from RandomForestClassifier",
                "Found 1 high-impact genetic variants",
                "Identified 1 clinically significant variants",
                "Detected 1 rare genetic variants",
                "Genetic markers suggestive of brain tumor predisposition",
            ]
        );
        assert!(tumor
            .recommendations
            .contains(&"Immediate neurological evaluation recommended".to_string()));
        assert!(tumor
            .recommendations
            .contains(&"Pathogenic variants identified - clinical correlation recommended".to_string()));

        let diabetes = &report.disease_assessments[1];
        assert!(diabetes
            .recommendations
            .contains(&"Schedule follow-up consultation within 3-6 months".to_string()));
        assert!(!diabetes
            .supporting_evidence
            .iter()
            .any(|e| e.starts_with("High-confidence")));
    }

    #[test]
    fn test_variant_summary() {
        let variants = vec![
            annotated(1, FunctionalImpact::High, ClinicalSignificance::Pathogenic, Some(0.004)),
            annotated(2, FunctionalImpact::Low, ClinicalSignificance::Benign, Some(0.2)),
            annotated(3, FunctionalImpact::Low, ClinicalSignificance::Unknown, None),
        ];

        let summary = variant_summary(&variants);
        assert_eq!(summary.total_variants, 3);
        assert_eq!(summary.impact_distribution.get("LOW"), Some(&2));
        assert_eq!(summary.significance_distribution.get("unknown"), Some(&1));
        assert!((summary.average_population_frequency.unwrap() - 0.102).abs() < 1e-12);
        assert_eq!(summary.rare_variants, 1);
        assert_eq!(summary.pathogenic_variants, 1);
    }

    #[test]
    fn test_generation_is_pure() {
        let variants = vec![annotated(1, FunctionalImpact::Low, ClinicalSignificance::Benign, None)];
        let predictions = vec![prediction(Disease::Diabetes, 0.1)];

        assert_eq!(
            generate_report(context(), &variants, &predictions),
            generate_report(context(), &variants, &predictions)
        );
    }

    #[test]
    fn test_empty_predictions() {
        let report = generate_report(context(), &[], &[]);
        assert_eq!(report.executive_summary.primary_concern, None);
        assert_eq!(report.executive_summary.overall_risk, RiskCategory::Low);
        assert_eq!(report.variant_summary.average_population_frequency, None);
    }
}
