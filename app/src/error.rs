// ==============================================================================
// error.rs - Pipeline Errors
// ==============================================================================
// Description: Errors that abort an analysis before a report is produced
// Created: 2026-10-11
// Modified: 2026-10-11
// Version: 2.0.0
// ==============================================================================

use thiserror::Error;

use crate::annotation::AnnotationError;
use crate::ml::ModelError;
use crate::parsers::VcfParseError;
use crate::validator::ValidationError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Upload rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to read VCF content: {0}")]
    Parse(#[from] VcfParseError),

    #[error("No variants found in VCF file")]
    NoVariants,

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Failed to set up remote annotation: {0}")]
    Annotation(#[from] AnnotationError),
}

impl PipelineError {
    /// Short machine-readable kind for audit records
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::Parse(_) => "parse",
            PipelineError::NoVariants => "no_variants",
            PipelineError::Model(_) => "model",
            PipelineError::Annotation(_) => "annotation",
        }
    }
}
