// ==============================================================================
// output.rs - Report Output
// ==============================================================================
// Description: Writes the JSON report and renders a compact summary
// Created: 2025-11-06
// Modified: 2026-10-09
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::models::RiskCategory;
use crate::report::Report;

/// Simplified view of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub report_id: Uuid,
    pub generated_at: String,
    pub processing_time_seconds: f64,
    pub total_variants: usize,
    pub overall_risk: RiskCategory,
    pub disease_risks: Vec<DiseaseRisk>,
    pub key_findings: KeyFindings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRisk {
    pub disease: String,
    pub risk_level: RiskCategory,
    pub risk_score: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFindings {
    pub pathogenic_variants: usize,
    pub rare_variants: usize,
    pub annotation_rate: f64,
}

impl ReportSummary {
    pub fn from_report(report: &Report) -> Self {
        Self {
            report_id: report.report_id,
            generated_at: report.generated_at.to_rfc3339(),
            processing_time_seconds: report.processing_time_seconds,
            total_variants: report.total_variants,
            overall_risk: report.executive_summary.overall_risk,
            disease_risks: report
                .disease_assessments
                .iter()
                .map(|a| DiseaseRisk {
                    disease: a.title.clone(),
                    risk_level: a.prediction.risk_category,
                    risk_score: a.prediction.risk_score,
                    confidence: a.prediction.confidence,
                })
                .collect(),
            key_findings: KeyFindings {
                pathogenic_variants: report.variant_summary.pathogenic_variants,
                rare_variants: report.variant_summary.rare_variants,
                annotation_rate: if report.total_variants > 0 {
                    report.annotated_variants as f64 / report.total_variants as f64
                } else {
                    0.0
                },
            },
        }
    }

    /// Plain-text rendering for the terminal
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Report {}", self.report_id);
        let _ = writeln!(
            out,
            "  {} variants analyzed in {:.2}s, overall risk: {}",
            self.total_variants,
            self.processing_time_seconds,
            self.overall_risk.as_str()
        );
        for risk in &self.disease_risks {
            let _ = writeln!(
                out,
                "  {:<40} {:<8} score {:.3}  confidence {:.3}",
                risk.disease,
                risk.risk_level.as_str(),
                risk.risk_score,
                risk.confidence
            );
        }
        let _ = writeln!(
            out,
            "  pathogenic: {}  rare: {}  annotation rate: {:.1}%",
            self.key_findings.pathogenic_variants,
            self.key_findings.rare_variants,
            self.key_findings.annotation_rate * 100.0
        );
        out
    }
}

/// Default report location: `<dir>/report_<id>.json`
pub fn default_report_path(dir: &Path, report: &Report) -> PathBuf {
    dir.join(format!("report_{}.json", report.report_id))
}

/// Write the full report as pretty JSON
pub fn write_report(path: &Path, report: &Report) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .context("Failed to write JSON report")?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush report file {}", path.display()))?;

    info!(
        "JSON report written: {} ({} disease assessments)",
        path.display(),
        report.disease_assessments.len()
    );

    Ok(path.to_path_buf())
}
