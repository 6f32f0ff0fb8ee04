// ==============================================================================
// processor.rs - Analysis Orchestrator
// ==============================================================================
// Description: Runs one upload through validate → parse → annotate → extract
//              → predict → report
// Created: 2025-11-03
// Modified: 2026-10-12
// Version: 2.0.0
// ==============================================================================
// The processor owns long-lived services (model registry, annotator, audit
// log). Per-analysis data lives only inside `analyze`.
// ==============================================================================

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use crate::annotation::{AnnotationSummary, RemoteAnnotationClient, RequestRateLimiter, VariantAnnotator};
use crate::audit::{AuditEventType, AuditLog};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::features::extract_features;
use crate::ml::{ModelRegistry, RiskPredictor};
use crate::parsers::VcfParser;
use crate::report::{generate_report, FileMetadata, Report, ReportContext};
use crate::validator::UploadValidator;

/// Line counters reported by the VCF parser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseCounts {
    pub header_lines: usize,
    pub skipped_lines: usize,
    pub error_lines: usize,
    pub duplicate_lines: usize,
}

/// Result of one successful analysis
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub processing_time_seconds: f64,
    pub target_time_met: bool,
    pub total_variants: usize,
    pub annotated_variants: usize,
    pub parse_counts: ParseCounts,
    pub report: Report,
}

/// Snapshot of the processor's running statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProcessingStats {
    pub total_analyses: u64,
    pub successful_analyses: u64,
    /// Mean wall time of successful analyses
    pub average_processing_time_seconds: f64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    total: AtomicU64,
    successful: AtomicU64,
    successful_micros: AtomicU64,
}

pub struct GenomicProcessor {
    registry: Arc<ModelRegistry>,
    annotator: VariantAnnotator,
    validator: UploadValidator,
    audit: AuditLog,
    target_time: Duration,
    stats: StatsCounters,
}

impl GenomicProcessor {
    /// Processor with heuristic-only annotation and default limits
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            annotator: VariantAnnotator::new(),
            validator: UploadValidator::new(),
            audit: AuditLog::new(),
            target_time: Duration::from_secs(60),
            stats: StatsCounters::default(),
        }
    }

    /// Load models and wire services from configuration
    ///
    /// Fails when any model artifact is missing or incompatible; nothing is
    /// trained here.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let registry = Arc::new(ModelRegistry::load(&config.models_dir)?);

        let mut annotator = VariantAnnotator::new().with_chunk_size(config.annotation_chunk_size);
        if config.remote_annotation {
            let limiter = Arc::new(RequestRateLimiter::new(config.min_request_interval()));
            let client = RemoteAnnotationClient::new(config.remote_config(), limiter)?;
            annotator = annotator.with_source(Arc::new(client));
            info!(
                "Remote annotation enabled (dataset {}, assembly {})",
                config.gnomad_dataset,
                config.assembly()
            );
        }

        let mut audit = AuditLog::new();
        if let Some(path) = &config.audit_log {
            audit = audit.with_file(path);
        }

        Ok(Self::new(registry)
            .with_annotator(annotator)
            .with_validator(UploadValidator::new().with_max_upload_bytes(config.max_upload_bytes))
            .with_audit(audit)
            .with_target_time(config.target_time()))
    }

    pub fn with_annotator(mut self, annotator: VariantAnnotator) -> Self {
        self.annotator = annotator;
        self
    }

    pub fn with_validator(mut self, validator: UploadValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_target_time(mut self, target_time: Duration) -> Self {
        self.target_time = target_time;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn stats(&self) -> ProcessingStats {
        let total = self.stats.total.load(Ordering::Relaxed);
        let successful = self.stats.successful.load(Ordering::Relaxed);
        let micros = self.stats.successful_micros.load(Ordering::Relaxed);

        ProcessingStats {
            total_analyses: total,
            successful_analyses: successful,
            average_processing_time_seconds: if successful > 0 {
                micros as f64 / successful as f64 / 1_000_000.0
            } else {
                0.0
            },
        }
    }

    /// Analyze one uploaded VCF
    ///
    /// # Returns
    /// * `Ok(AnalysisOutcome)` - Full report plus timing information
    /// * `Err(PipelineError)` - Upload rejected, unreadable, or without variants
    pub async fn analyze(
        &self,
        user_id: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<AnalysisOutcome, PipelineError> {
        let started = Instant::now();
        self.stats.total.fetch_add(1, Ordering::Relaxed);

        self.audit
            .log_event(
                AuditEventType::AnalysisStarted,
                user_id,
                Some(file_name.to_string()),
                serde_json::json!({ "size_bytes": content.len() }),
            )
            .await;

        match self.run(user_id, file_name, content, started).await {
            Ok(outcome) => {
                self.stats.successful.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .successful_micros
                    .fetch_add(started.elapsed().as_micros() as u64, Ordering::Relaxed);

                self.audit
                    .log_event(
                        AuditEventType::AnalysisCompleted,
                        user_id,
                        Some(outcome.report.report_id.to_string()),
                        serde_json::json!({
                            "total_variants": outcome.total_variants,
                            "annotated_variants": outcome.annotated_variants,
                            "processing_time_seconds": outcome.processing_time_seconds,
                            "target_time_met": outcome.target_time_met,
                        }),
                    )
                    .await;

                Ok(outcome)
            }
            Err(e) => {
                warn!("Analysis of {} failed: {}", file_name, e);

                let event_type = match e {
                    PipelineError::Validation(_) => AuditEventType::UploadRejected,
                    _ => AuditEventType::AnalysisFailed,
                };
                self.audit
                    .log_event(
                        event_type,
                        user_id,
                        Some(file_name.to_string()),
                        serde_json::json!({ "kind": e.kind(), "error": e.to_string() }),
                    )
                    .await;

                Err(e)
            }
        }
    }

    async fn run(
        &self,
        user_id: &str,
        file_name: &str,
        content: &[u8],
        started: Instant,
    ) -> Result<AnalysisOutcome, PipelineError> {
        let mut timings = BTreeMap::new();

        // 1. Validate upload
        info!("Step 1/6: validating upload {}", file_name);
        let stage = Instant::now();
        let upload = self.validator.validate(file_name, content)?;
        record_stage(&mut timings, "validate", stage);

        self.audit
            .log_event(
                AuditEventType::UploadValidated,
                user_id,
                Some(upload.safe_name.clone()),
                serde_json::json!({ "size": upload.size, "sha256": upload.sha256 }),
            )
            .await;

        // 2. Parse variants
        info!("Step 2/6: parsing VCF");
        let stage = Instant::now();
        let mut parser = VcfParser::new();
        let variants = parser.parse(content)?;
        record_stage(&mut timings, "parse", stage);

        let parse_counts = ParseCounts {
            header_lines: parser.header_count,
            skipped_lines: parser.skipped_count,
            error_lines: parser.error_count,
            duplicate_lines: parser.duplicate_count,
        };
        info!("Parsed {} variants ({:?})", variants.len(), parse_counts);

        if variants.is_empty() {
            return Err(PipelineError::NoVariants);
        }

        // 3. Annotate
        info!("Step 3/6: annotating {} variants", variants.len());
        let stage = Instant::now();
        let annotated = self.annotator.annotate(&variants).await;
        record_stage(&mut timings, "annotate", stage);

        let summary = AnnotationSummary::from_variants(&annotated);
        info!(
            "Annotation complete: {}/{} annotated ({} with remote clinical data, {} pathogenic)",
            summary.annotated_variants,
            summary.total_variants,
            summary.remote_annotated,
            summary.pathogenic_variants
        );

        // 4. Extract features
        info!("Step 4/6: extracting features");
        let stage = Instant::now();
        let features = extract_features(&annotated);
        record_stage(&mut timings, "extract_features", stage);

        // 5. Predict
        info!("Step 5/6: scoring {} disease models", self.registry.diseases().count());
        let stage = Instant::now();
        let predictions = RiskPredictor::new(&self.registry).predict_all(&features);
        record_stage(&mut timings, "predict", stage);

        // 6. Report
        info!("Step 6/6: generating report");
        let stage = Instant::now();
        let mut report = generate_report(
            ReportContext {
                report_id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                generated_at: Utc::now(),
                file: FileMetadata {
                    name: upload.safe_name,
                    size_bytes: upload.size,
                    sha256: upload.sha256,
                },
                // Filled in below, once the report stage itself is timed
                processing_time_seconds: 0.0,
                annotation_sources: self.annotator.source_names(),
                models_used: self.registry.model_types(),
                stage_timings_seconds: BTreeMap::new(),
            },
            &annotated,
            &predictions,
        );
        record_stage(&mut timings, "report", stage);

        let elapsed = started.elapsed();
        report.processing_time_seconds = elapsed.as_secs_f64();
        report.technical_details.stage_timings_seconds = timings;

        let target_time_met = elapsed <= self.target_time;
        if target_time_met {
            info!(
                "Analysis complete in {:.2}s (target {:.0}s)",
                elapsed.as_secs_f64(),
                self.target_time.as_secs_f64()
            );
        } else {
            warn!(
                "Analysis took {:.2}s, exceeding the {:.0}s target",
                elapsed.as_secs_f64(),
                self.target_time.as_secs_f64()
            );
        }

        Ok(AnalysisOutcome {
            processing_time_seconds: report.processing_time_seconds,
            target_time_met,
            total_variants: report.total_variants,
            annotated_variants: report.annotated_variants,
            parse_counts,
            report,
        })
    }
}

fn record_stage(timings: &mut BTreeMap<String, f64>, stage: &str, started: Instant) {
    timings.insert(stage.to_string(), started.elapsed().as_secs_f64());
}
