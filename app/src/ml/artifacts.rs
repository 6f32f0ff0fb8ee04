// ==============================================================================
// ml/artifacts.rs - Model artifact persistence
// ==============================================================================
// Description: Versioned on-disk layout for trained models
// Created: 2026-09-29
// Modified: 2026-10-08
// Version: 2.0.0
// ==============================================================================
// Layout (models directory):
//   <disease>_model.pkl      - ModelArtifact (JSON)
//   <disease>_scaler.pkl     - ScalerArtifact (JSON)
//   <disease>_features.json  - feature names in slot order
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::ensemble::Classifier;
use super::scaler::StandardScaler;
use super::ModelError;
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};
use crate::models::Disease;

/// Bumped whenever the serialized shape changes
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub disease: Disease,
    pub model_type: String,
    pub seed: u64,
    pub samples: usize,
    pub trained_at: DateTime<Utc>,
    pub classifier: Classifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub format_version: u32,
    pub disease: Disease,
    pub scaler: StandardScaler,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturesArtifact {
    pub disease: Disease,
    pub feature_names: Vec<String>,
}

/// Everything needed to serve one disease
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBundle {
    pub model: ModelArtifact,
    pub scaler: ScalerArtifact,
    pub features: FeaturesArtifact,
}

pub fn model_path(dir: &Path, disease: Disease) -> PathBuf {
    dir.join(format!("{}_model.pkl", disease.as_str()))
}

pub fn scaler_path(dir: &Path, disease: Disease) -> PathBuf {
    dir.join(format!("{}_scaler.pkl", disease.as_str()))
}

pub fn features_path(dir: &Path, disease: Disease) -> PathBuf {
    dir.join(format!("{}_features.json", disease.as_str()))
}

impl ModelBundle {
    pub fn save(&self, dir: &Path) -> Result<(), ModelError> {
        let disease = self.model.disease;
        fs::create_dir_all(dir).map_err(|source| ModelError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        write_json(&model_path(dir, disease), &self.model)?;
        write_json(&scaler_path(dir, disease), &self.scaler)?;
        write_json(&features_path(dir, disease), &self.features)?;

        info!("Saved {} model artifacts to {}", disease, dir.display());
        Ok(())
    }

    /// Load and check the three artifacts for one disease
    pub fn load(dir: &Path, disease: Disease) -> Result<Self, ModelError> {
        let model: ModelArtifact = read_json(&model_path(dir, disease), disease)?;
        let scaler: ScalerArtifact = read_json(&scaler_path(dir, disease), disease)?;
        let features: FeaturesArtifact = read_json(&features_path(dir, disease), disease)?;

        let bundle = Self {
            model,
            scaler,
            features,
        };
        bundle.check(disease)?;

        debug!(
            "Loaded {} model ({}, trained {})",
            disease, bundle.model.model_type, bundle.model.trained_at
        );
        Ok(bundle)
    }

    fn check(&self, disease: Disease) -> Result<(), ModelError> {
        let incompatible = |reason: String| ModelError::Incompatible { disease, reason };

        if self.model.format_version != FORMAT_VERSION {
            return Err(incompatible(format!(
                "model format version {} (expected {})",
                self.model.format_version, FORMAT_VERSION
            )));
        }
        if self.scaler.format_version != FORMAT_VERSION {
            return Err(incompatible(format!(
                "scaler format version {} (expected {})",
                self.scaler.format_version, FORMAT_VERSION
            )));
        }
        if self.model.disease != disease
            || self.scaler.disease != disease
            || self.features.disease != disease
        {
            return Err(incompatible("artifacts belong to a different disease".to_string()));
        }
        if self.features.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES) {
            return Err(incompatible("feature names do not match extractor".to_string()));
        }
        if self.scaler.scaler.len() != FEATURE_COUNT || self.scaler.scaler.scale.len() != FEATURE_COUNT {
            return Err(incompatible(format!(
                "scaler has {} columns (expected {})",
                self.scaler.scaler.len(),
                FEATURE_COUNT
            )));
        }
        Ok(())
    }
}

pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ModelError> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| ModelError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path, disease: Disease) -> Result<T, ModelError> {
    let bytes = fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ModelError::Missing {
                disease,
                path: path.to_path_buf(),
            }
        } else {
            ModelError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    serde_json::from_slice(&bytes).map_err(|source| ModelError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}
