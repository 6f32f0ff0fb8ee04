// ==============================================================================
// ml/training.rs - Offline model training
// ==============================================================================
// Description: Fits scaler + classifier per disease and writes artifacts
// Created: 2026-09-29
// Modified: 2026-10-08
// Version: 2.0.0
// ==============================================================================

use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use super::artifacts::{feature_names, FeaturesArtifact, ModelArtifact, ModelBundle, ScalerArtifact, FORMAT_VERSION};
use super::ensemble::{BoostingParams, Classifier, ForestParams, GradientBoosting, RandomForest};
use super::scaler::StandardScaler;
use super::synthetic::{self, DEFAULT_SAMPLES, DEFAULT_SEED};
use super::ModelError;
use crate::models::Disease;

#[derive(Debug, Clone, Copy)]
pub struct TrainingOptions {
    pub seed: u64,
    pub samples: usize,
    pub n_estimators: usize,
}

/// Fewer samples leave the scaler and trees nothing to fit
pub const MIN_TRAINING_SAMPLES: usize = 2;

impl TrainingOptions {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.samples < MIN_TRAINING_SAMPLES {
            return Err(ModelError::InvalidOptions(format!(
                "samples must be at least {} (got {})",
                MIN_TRAINING_SAMPLES, self.samples
            )));
        }
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidOptions(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            samples: DEFAULT_SAMPLES,
            n_estimators: 100,
        }
    }
}

/// Summary of one fitted model
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub disease: Disease,
    pub model_type: String,
    pub samples: usize,
    pub positive_rate: f64,
    pub training_accuracy: f64,
}

/// Train one disease model from synthetic data
pub fn train_disease(disease: Disease, options: &TrainingOptions) -> (ModelBundle, TrainingReport) {
    let mut rng = synthetic::disease_rng(disease, options.seed);
    let data = synthetic::generate(disease, options.samples, &mut rng);

    let scaler = StandardScaler::fit(&data.x);
    let scaled: Vec<Vec<f64>> = data.x.iter().map(|row| scaler.transform(row)).collect();

    let classifier = match disease {
        Disease::Diabetes => {
            let params = BoostingParams {
                n_estimators: options.n_estimators,
                ..BoostingParams::default()
            };
            Classifier::GradientBoosting(GradientBoosting::fit(&scaled, &data.y, &params, &mut rng))
        }
        Disease::Alzheimer | Disease::BrainTumor => {
            let params = ForestParams {
                n_estimators: options.n_estimators,
                max_depth: if disease == Disease::Alzheimer { 10 } else { 8 },
                ..ForestParams::default()
            };
            Classifier::RandomForest(RandomForest::fit(&scaled, &data.y, &params, &mut rng))
        }
    };

    let correct = scaled
        .iter()
        .zip(&data.y)
        .filter(|(row, label)| (classifier.predict_proba(row.as_slice()) >= 0.5) == (**label == 1.0))
        .count();

    let report = TrainingReport {
        disease,
        model_type: classifier.model_type().to_string(),
        samples: options.samples,
        positive_rate: data.positive_rate(),
        training_accuracy: correct as f64 / data.y.len().max(1) as f64,
    };

    let bundle = ModelBundle {
        model: ModelArtifact {
            format_version: FORMAT_VERSION,
            disease,
            model_type: classifier.model_type().to_string(),
            seed: options.seed,
            samples: options.samples,
            trained_at: Utc::now(),
            classifier,
        },
        scaler: ScalerArtifact {
            format_version: FORMAT_VERSION,
            disease,
            scaler,
        },
        features: FeaturesArtifact {
            disease,
            feature_names: feature_names(),
        },
    };

    (bundle, report)
}

/// Train every disease and write artifacts under `models_dir`
pub fn train_all(models_dir: &Path, options: &TrainingOptions) -> Result<Vec<TrainingReport>, ModelError> {
    train_diseases(models_dir, &Disease::ALL, options)
}

/// Train the given diseases, leaving other artifacts in place
pub fn train_diseases(
    models_dir: &Path,
    diseases: &[Disease],
    options: &TrainingOptions,
) -> Result<Vec<TrainingReport>, ModelError> {
    options.validate()?;

    info!(
        "Training {} models (seed {}, {} samples) into {}",
        diseases.len(),
        options.seed,
        options.samples,
        models_dir.display()
    );

    let mut reports = Vec::with_capacity(diseases.len());
    for &disease in diseases {
        let (bundle, report) = train_disease(disease, options);
        bundle.save(models_dir)?;

        info!(
            "{}: {} trained (positive rate {:.3}, training accuracy {:.3})",
            disease, report.model_type, report.positive_rate, report.training_accuracy
        );
        reports.push(report);
    }

    Ok(reports)
}
