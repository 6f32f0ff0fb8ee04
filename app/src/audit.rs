// ==============================================================================
// audit.rs - Audit Trail for Analysis Operations
// ==============================================================================
// Description: Structured audit events for uploads, analyses and training
// Created: 2025-10-31
// Modified: 2026-10-10
// Version: 2.0.0
// Compliance: HIPAA § 164.312(b), GDPR Article 30
// ==============================================================================
// Sinks:
// - tracing, target "audit" (always)
// - JSON lines appended to a file (when configured)
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Upload events
    UploadValidated,
    UploadRejected,

    // Processing events
    AnalysisStarted,
    AnalysisCompleted,
    AnalysisFailed,

    // Model lifecycle
    ModelsTrained,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub user_id: Option<String>,
    pub resource: Option<String>,
    pub details: serde_json::Value,
    pub severity: LogSeverity,
}

impl AuditEvent {
    pub fn new(
        event_type: AuditEventType,
        user_id: Option<String>,
        resource: Option<String>,
        details: serde_json::Value,
    ) -> Self {
        let severity = match event_type {
            AuditEventType::UploadRejected => LogSeverity::Warning,
            AuditEventType::AnalysisFailed => LogSeverity::Error,
            _ => LogSeverity::Info,
        };

        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            user_id,
            resource,
            details,
            severity,
        }
    }
}

/// Fan-out for audit events
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    file: Option<PathBuf>,
}

impl AuditLog {
    /// Tracing-only audit log
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Emit an event; a failing file sink is logged, never propagated
    pub async fn record(&self, event: &AuditEvent) {
        match event.severity {
            LogSeverity::Info => info!(
                target: "audit",
                id = %event.id,
                event_type = ?event.event_type,
                user_id = event.user_id.as_deref().unwrap_or("-"),
                resource = event.resource.as_deref().unwrap_or("-"),
                details = %event.details,
            ),
            LogSeverity::Warning => warn!(
                target: "audit",
                id = %event.id,
                event_type = ?event.event_type,
                user_id = event.user_id.as_deref().unwrap_or("-"),
                resource = event.resource.as_deref().unwrap_or("-"),
                details = %event.details,
            ),
            LogSeverity::Error => error!(
                target: "audit",
                id = %event.id,
                event_type = ?event.event_type,
                user_id = event.user_id.as_deref().unwrap_or("-"),
                resource = event.resource.as_deref().unwrap_or("-"),
                details = %event.details,
            ),
        }

        if let Some(path) = &self.file {
            if let Err(e) = append_json_line(path, event).await {
                warn!("Failed to append audit event to {}: {}", path.display(), e);
            }
        }
    }

    /// Convenience wrapper building and recording an event
    pub async fn log_event(
        &self,
        event_type: AuditEventType,
        user_id: &str,
        resource: Option<String>,
        details: serde_json::Value,
    ) {
        let event = AuditEvent::new(event_type, Some(user_id.to_string()), resource, details);
        self.record(&event).await;
    }
}

async fn append_json_line(path: &Path, event: &AuditEvent) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(&line).await?;
    file.flush().await
}
