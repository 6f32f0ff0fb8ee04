// ==============================================================================
// annotation/mod.rs - Variant Annotation
// ==============================================================================
// Description: Adds clinical significance, population frequency and functional
//              impact to parsed variants
// Created: 2026-09-24
// Modified: 2026-10-06
// Version: 2.0.0
// ==============================================================================
// Flow per chunk:
//   variants ─┬─> source.lookup() ─> validate ─┬─> AnnotatedVariant (same order)
//             └─> heuristics (fallback) ───────┘
// ==============================================================================

pub mod heuristics;
pub mod rate_limit;
pub mod remote;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{AnnotatedVariant, AnnotationOrigin, ClinicalSignificance, Variant};
use heuristics::ClinicalCall;

pub use rate_limit::RequestRateLimiter;
pub use remote::{GenomeAssembly, RemoteAnnotationClient, RemoteConfig};

/// Default number of variants annotated concurrently
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Default pause between chunks when a remote source is configured
pub const DEFAULT_CHUNK_PAUSE: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },

    #[error("Unexpected {service} response: {message}")]
    InvalidResponse { service: &'static str, message: String },
}

/// Raw result of a remote lookup, before boundary validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteAnnotation {
    pub clinical: Option<ClinicalCall>,
    pub population_frequency: Option<f64>,
}

impl RemoteAnnotation {
    pub fn is_empty(&self) -> bool {
        self.clinical.is_none() && self.population_frequency.is_none()
    }
}

/// A provider of clinical and population data for single variants
#[async_trait]
pub trait AnnotationSource: Send + Sync {
    /// Short identifier recorded in report metadata
    fn name(&self) -> &str;

    async fn lookup(&self, variant: &Variant) -> Result<RemoteAnnotation, AnnotationError>;
}

/// Batch-level statistics over annotated variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSummary {
    pub total_variants: usize,

    /// Variants whose annotation did not end in an error marker
    pub annotated_variants: usize,

    pub annotation_rate: f64,
    pub impact_distribution: BTreeMap<String, usize>,
    pub pathogenic_variants: usize,

    /// Variants with data from the remote source
    pub remote_annotated: usize,

    pub with_population_frequency: usize,
}

impl AnnotationSummary {
    pub fn from_variants(variants: &[AnnotatedVariant]) -> Self {
        let total = variants.len();
        let annotated = variants
            .iter()
            .filter(|v| v.origin != AnnotationOrigin::Error)
            .count();

        let mut impact_distribution = BTreeMap::new();
        for v in variants {
            *impact_distribution
                .entry(v.functional_impact.as_str().to_string())
                .or_insert(0) += 1;
        }

        Self {
            total_variants: total,
            annotated_variants: annotated,
            annotation_rate: annotated as f64 / total.max(1) as f64,
            impact_distribution,
            pathogenic_variants: variants
                .iter()
                .filter(|v| v.clinical_significance.is_pathogenic())
                .count(),
            remote_annotated: variants
                .iter()
                .filter(|v| v.origin == AnnotationOrigin::Remote)
                .count(),
            with_population_frequency: variants
                .iter()
                .filter(|v| v.population_frequency.is_some())
                .count(),
        }
    }
}

/// Chunked, concurrent variant annotator
pub struct VariantAnnotator {
    source: Option<Arc<dyn AnnotationSource>>,
    chunk_size: usize,
    chunk_pause: Duration,
}

impl Default for VariantAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

impl VariantAnnotator {
    /// Annotator with no remote source (heuristics only)
    pub fn new() -> Self {
        Self {
            source: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_pause: DEFAULT_CHUNK_PAUSE,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn AnnotationSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_chunk_pause(mut self, pause: Duration) -> Self {
        self.chunk_pause = pause;
        self
    }

    /// Names of the sources that can contribute annotations
    pub fn source_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(source) = &self.source {
            names.push(source.name().to_string());
        }
        names.push("heuristic".to_string());
        names
    }

    /// Annotate a batch, returning one record per input in input order
    pub async fn annotate(&self, variants: &[Variant]) -> Vec<AnnotatedVariant> {
        let chunk_count = variants.len().div_ceil(self.chunk_size);
        info!(
            "Annotating {} variants in {} chunks ({})",
            variants.len(),
            chunk_count,
            if self.source.is_some() { "remote" } else { "heuristic" }
        );

        let mut annotated = Vec::with_capacity(variants.len());

        for (idx, chunk) in variants.chunks(self.chunk_size).enumerate() {
            if idx > 0 && self.source.is_some() && !self.chunk_pause.is_zero() {
                tokio::time::sleep(self.chunk_pause).await;
            }

            let results = join_all(chunk.iter().map(|v| self.annotate_one(v))).await;
            annotated.extend(results);

            debug!("Chunk {}/{} annotated", idx + 1, chunk_count);
        }

        annotated
    }

    async fn annotate_one(&self, variant: &Variant) -> AnnotatedVariant {
        let remote = match &self.source {
            Some(source) => match source.lookup(variant).await {
                Ok(remote) => Some(remote),
                Err(e) => {
                    warn!("{}: lookup failed, using heuristics: {}", variant.locus(), e);
                    None
                }
            },
            None => None,
        };

        build_annotation(variant, remote)
    }
}

/// Merge a remote result (if any) with local rules
fn build_annotation(variant: &Variant, remote: Option<RemoteAnnotation>) -> AnnotatedVariant {
    let impact = heuristics::functional_impact(variant);

    let (clinical, population_frequency, origin) = match remote {
        Some(remote) if remote.population_frequency.is_some_and(|f| !is_valid_frequency(f)) => {
            warn!(
                "{}: rejecting population frequency {:?}",
                variant.locus(),
                remote.population_frequency
            );
            let clinical = ClinicalCall {
                significance: ClinicalSignificance::AnnotationError,
                disease: None,
                evidence_level: None,
            };
            (clinical, None, AnnotationOrigin::Error)
        }
        Some(remote) if !remote.is_empty() => {
            let clinical = remote
                .clinical
                .unwrap_or_else(|| heuristics::clinical_significance(variant));
            (clinical, remote.population_frequency, AnnotationOrigin::Remote)
        }
        _ => (
            heuristics::clinical_significance(variant),
            None,
            AnnotationOrigin::Heuristic,
        ),
    };

    AnnotatedVariant {
        variant_class: variant.variant_class(),
        variant: variant.clone(),
        clinical_significance: clinical.significance,
        clinvar_disease: clinical.disease,
        evidence_level: clinical.evidence_level,
        population_frequency,
        functional_impact: impact.category,
        impact_score: impact.score,
        sift_score: impact.sift,
        polyphen_score: impact.polyphen,
        origin,
    }
}

fn is_valid_frequency(frequency: f64) -> bool {
    frequency.is_finite() && (0.0..=1.0).contains(&frequency)
}
