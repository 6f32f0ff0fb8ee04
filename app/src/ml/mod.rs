// ==============================================================================
// ml/mod.rs - Disease Risk Models
// ==============================================================================
// Description: In-crate tree classifiers, offline training and serving
// Created: 2026-09-27
// Modified: 2026-10-08
// Version: 2.0.0
// ==============================================================================
// Lifecycle:
//   curagenie train  -> synthetic::generate -> training::train_disease
//                    -> artifacts::save  (<disease>_model.pkl, _scaler.pkl,
//                                         _features.json)
//   curagenie analyze -> ModelRegistry::load -> RiskPredictor::predict
// ==============================================================================

pub mod artifacts;
pub mod ensemble;
pub mod predictor;
pub mod scaler;
pub mod synthetic;
pub mod training;
pub mod tree;

use std::path::PathBuf;
use thiserror::Error;

use crate::models::Disease;

pub use ensemble::Classifier;
pub use predictor::{ModelRegistry, RiskPredictor};
pub use scaler::StandardScaler;
pub use training::{train_all, train_diseases, TrainingOptions, TrainingReport, MIN_TRAINING_SAMPLES};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("No trained {disease} model at {}. Run `curagenie train` first.", path.display())]
    Missing { disease: Disease, path: PathBuf },

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt model artifact {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Incompatible {disease} model: {reason}. Re-run `curagenie train`.")]
    Incompatible { disease: Disease, reason: String },

    #[error("Invalid training options: {0}")]
    InvalidOptions(String),
}
