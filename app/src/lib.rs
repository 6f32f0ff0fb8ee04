// ==============================================================================
// lib.rs - CuraGenie Variant Pipeline Library
// ==============================================================================
// Description: Library interface for VCF analysis and disease risk modules
// Created: 2025-11-03
// Modified: 2026-10-12
// Version: 2.0.0
// ==============================================================================

pub mod annotation;
pub mod audit;
pub mod config;
pub mod error;
pub mod features;
pub mod ml;
pub mod models;
pub mod output;
pub mod parsers;
pub mod processor;
pub mod report;
pub mod validator;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use processor::{AnalysisOutcome, GenomicProcessor};
