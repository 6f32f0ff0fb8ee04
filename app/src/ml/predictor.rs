// ==============================================================================
// ml/predictor.rs - Risk prediction from loaded models
// ==============================================================================
// Description: Model registry (load-only) and per-disease risk scoring
// Created: 2026-09-30
// Modified: 2026-10-08
// Version: 2.0.0
// ==============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use super::artifacts::ModelBundle;
use super::ModelError;
use crate::features::{slot, FeatureVector};
use crate::models::{Disease, DiseasePrediction, RiskCategory};

/// Loaded models for every supported disease
///
/// Built once at startup and shared behind an `Arc`. Never trains.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: BTreeMap<Disease, ModelBundle>,
}

impl ModelRegistry {
    /// Load all diseases; any missing or incompatible artifact is fatal
    pub fn load(models_dir: &Path) -> Result<Self, ModelError> {
        let mut models = BTreeMap::new();
        for disease in Disease::ALL {
            models.insert(disease, ModelBundle::load(models_dir, disease)?);
        }

        info!("Loaded {} risk models from {}", models.len(), models_dir.display());
        Ok(Self { models })
    }

    pub fn from_bundles(bundles: impl IntoIterator<Item = ModelBundle>) -> Self {
        Self {
            models: bundles.into_iter().map(|b| (b.model.disease, b)).collect(),
        }
    }

    pub fn get(&self, disease: Disease) -> Option<&ModelBundle> {
        self.models.get(&disease)
    }

    pub fn diseases(&self) -> impl Iterator<Item = Disease> + '_ {
        self.models.keys().copied()
    }

    /// `disease -> model_type` for report metadata
    pub fn model_types(&self) -> BTreeMap<String, String> {
        self.models
            .iter()
            .map(|(d, b)| (d.as_str().to_string(), b.model.model_type.clone()))
            .collect()
    }
}

/// Scores feature vectors against the registry
pub struct RiskPredictor<'a> {
    registry: &'a ModelRegistry,
}

impl<'a> RiskPredictor<'a> {
    pub fn new(registry: &'a ModelRegistry) -> Self {
        Self { registry }
    }

    pub fn predict(&self, disease: Disease, features: &FeatureVector) -> Option<DiseasePrediction> {
        let bundle = self.registry.get(disease)?;

        let scaled = bundle.scaler.scaler.transform(features.as_slice());
        let risk_score = bundle.model.classifier.predict_proba(&scaled);
        let risk_category = RiskCategory::from_score(risk_score);

        debug!("{}: risk {:.4} ({})", disease, risk_score, risk_category.as_str());

        Some(DiseasePrediction {
            disease,
            risk_score,
            risk_category,
            confidence: risk_score.max(1.0 - risk_score),
            key_factors: key_factors(disease, features),
            recommendations: recommendations(disease, risk_category),
            model_type: bundle.model.model_type.clone(),
        })
    }

    /// Predictions for every loaded disease, in `Disease::ALL` order
    pub fn predict_all(&self, features: &FeatureVector) -> Vec<DiseasePrediction> {
        self.registry
            .diseases()
            .filter_map(|d| self.predict(d, features))
            .collect()
    }
}

/// (slot, threshold, factor) triples per disease
fn factor_rules(disease: Disease) -> [(usize, f64, &'static str); 3] {
    match disease {
        Disease::Diabetes => [
            (slot::HIGH_FRACTION, 0.7, "High genetic predisposition"),
            (slot::RARE_FRACTION, 0.6, "Metabolic pathway variations"),
            (slot::INDEL_FRACTION, 0.5, "Insulin resistance markers"),
        ],
        Disease::Alzheimer => [
            (slot::PATHOGENIC_FRACTION, 0.7, "APOE gene variants"),
            (slot::TRANSITION_FRACTION, 0.6, "Amyloid processing genes"),
            (slot::UNCERTAIN_FRACTION, 0.5, "Tau protein genes"),
        ],
        Disease::BrainTumor => [
            (slot::DELETION_FRACTION, 0.7, "Cell cycle regulation genes"),
            (slot::TRANSVERSION_FRACTION, 0.6, "DNA repair mechanisms"),
            (slot::RARE_FRACTION, 0.5, "Tumor suppressor genes"),
        ],
    }
}

pub fn key_factors(disease: Disease, features: &FeatureVector) -> Vec<String> {
    let factors: Vec<String> = factor_rules(disease)
        .iter()
        .filter(|(idx, threshold, _)| features.get(*idx) > *threshold)
        .map(|(_, _, factor)| factor.to_string())
        .collect();

    if factors.is_empty() {
        vec!["Standard genetic background".to_string()]
    } else {
        factors
    }
}

pub fn recommendations(disease: Disease, category: RiskCategory) -> Vec<String> {
    let tier: &[&str] = match category {
        RiskCategory::Low => &[
            "Continue regular health monitoring",
            "Maintain healthy lifestyle habits",
        ],
        RiskCategory::Moderate => &[
            "Schedule regular check-ups",
            "Consider genetic counseling",
            "Monitor for early symptoms",
        ],
        RiskCategory::High => &[
            "Consult healthcare provider immediately",
            "Consider specialized screening",
            "Discuss family history with doctor",
        ],
    };

    let specific: &[&str] = match disease {
        Disease::Diabetes => &[
            "Monitor blood glucose levels",
            "Maintain healthy diet and exercise",
        ],
        Disease::Alzheimer => &[
            "Engage in cognitive activities",
            "Monitor memory and cognitive function",
        ],
        Disease::BrainTumor => &[
            "Monitor for neurological symptoms",
            "Consider brain imaging if symptoms arise",
        ],
    };

    tier.iter().chain(specific).map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_COUNT;
    use crate::ml::training::{train_disease, TrainingOptions};

    fn registry() -> ModelRegistry {
        let options = TrainingOptions {
            seed: 42,
            samples: 300,
            n_estimators: 10,
        };
        ModelRegistry::from_bundles(Disease::ALL.map(|d| train_disease(d, &options).0))
    }

    #[test]
    fn test_predict_all_diseases() {
        let registry = registry();
        let predictor = RiskPredictor::new(&registry);

        let predictions = predictor.predict_all(&FeatureVector::zeros());
        assert_eq!(predictions.len(), 3);
        assert_eq!(predictions[0].disease, Disease::Diabetes);
        assert_eq!(predictions[2].disease, Disease::BrainTumor);

        for p in &predictions {
            assert!((0.0..=1.0).contains(&p.risk_score));
            assert!(p.confidence >= 0.5 && p.confidence <= 1.0);
            assert_eq!(p.risk_category, RiskCategory::from_score(p.risk_score));
            assert!(!p.key_factors.is_empty());
        }
        assert_eq!(predictions[0].model_type, "GradientBoostingClassifier");
        assert_eq!(predictions[1].model_type, "RandomForestClassifier");
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let registry = registry();
        let predictor = RiskPredictor::new(&registry);
        let features = FeatureVector::from_values(&[1.0; FEATURE_COUNT]);

        assert_eq!(predictor.predict_all(&features), predictor.predict_all(&features));
    }

    #[test]
    fn test_missing_disease_yields_none() {
        let registry = ModelRegistry::from_bundles(Vec::new());
        assert!(RiskPredictor::new(&registry)
            .predict(Disease::Diabetes, &FeatureVector::zeros())
            .is_none());
    }

    #[test]
    fn test_key_factors() {
        assert_eq!(
            key_factors(Disease::Diabetes, &FeatureVector::zeros()),
            vec!["Standard genetic background"]
        );

        let mut values = [0.0; FEATURE_COUNT];
        values[slot::DELETION_FRACTION] = 0.8;
        values[slot::RARE_FRACTION] = 0.55;
        assert_eq!(
            key_factors(Disease::BrainTumor, &FeatureVector(values)),
            vec!["Cell cycle regulation genes", "Tumor suppressor genes"]
        );
    }

    #[test]
    fn test_recommendations() {
        let low = recommendations(Disease::Alzheimer, RiskCategory::Low);
        assert_eq!(low.len(), 4);
        assert_eq!(low[0], "Continue regular health monitoring");
        assert_eq!(low[3], "Monitor memory and cognitive function");

        let high = recommendations(Disease::Diabetes, RiskCategory::High);
        assert_eq!(high.len(), 5);
        assert!(high.contains(&"Consult healthcare provider immediately".to_string()));
    }
}
