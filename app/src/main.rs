// ==============================================================================
// main.rs - CuraGenie Pipeline Entry Point
// ==============================================================================
// Description: CLI for analyzing VCF uploads and training risk models
// Created: 2025-10-31
// Modified: 2026-10-12
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use curagenie_pipeline::audit::{AuditEventType, AuditLog};
use curagenie_pipeline::config::{PipelineConfig, DEFAULT_MODELS_DIR};
use curagenie_pipeline::ml::synthetic::{DEFAULT_SAMPLES, DEFAULT_SEED};
use curagenie_pipeline::ml::{train_diseases, TrainingOptions, MIN_TRAINING_SAMPLES};
use curagenie_pipeline::models::Disease;
use curagenie_pipeline::output::{default_report_path, write_report, ReportSummary};
use curagenie_pipeline::GenomicProcessor;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true, env = "CURAGENIE_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a VCF file and write a risk report
    Analyze {
        /// Path to a .vcf or .vcf.gz file
        file: PathBuf,

        /// User ID (owner of the upload)
        #[arg(short, long)]
        user_id: String,

        /// Report path (default: ./report_<id>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        config: PipelineConfig,
    },

    /// Train risk models on synthetic data and write artifacts
    Train {
        #[arg(long, env = "CURAGENIE_MODELS_DIR", default_value = DEFAULT_MODELS_DIR)]
        models_dir: PathBuf,

        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        #[arg(
            long,
            default_value_t = DEFAULT_SAMPLES,
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(MIN_TRAINING_SAMPLES as u64..)
        )]
        samples: usize,

        /// Trees per model
        #[arg(
            long,
            default_value_t = 100,
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
        )]
        n_estimators: usize,

        /// Only train these diseases (comma-separated; default: all)
        #[arg(long, value_delimiter = ',')]
        disease: Vec<Disease>,

        #[arg(long, env = "CURAGENIE_AUDIT_LOG")]
        audit_log: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curagenie_pipeline=info,curagenie=info,audit=info".into()),
        )
        .with(cli.json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cli.json).then(tracing_subscriber::fmt::layer))
        .init();

    info!("CuraGenie pipeline {} starting...", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Analyze {
            file,
            user_id,
            output,
            config,
        } => analyze(&file, &user_id, output, &config).await,
        Command::Train {
            models_dir,
            seed,
            samples,
            n_estimators,
            disease,
            audit_log,
        } => {
            let options = TrainingOptions {
                seed,
                samples,
                n_estimators,
            };
            let diseases = if disease.is_empty() {
                Disease::ALL.to_vec()
            } else {
                disease
            };
            train(models_dir, diseases, options, audit_log).await
        }
    }
}

async fn analyze(file: &Path, user_id: &str, output: Option<PathBuf>, config: &PipelineConfig) -> Result<()> {
    let processor = GenomicProcessor::from_config(config)
        .context("Failed to initialize pipeline")?;

    let content = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file name: {}", file.display()))?;

    let outcome = processor
        .analyze(user_id, file_name, &content)
        .await
        .with_context(|| format!("Analysis of {} failed", file.display()))?;

    let report_path = output.unwrap_or_else(|| default_report_path(Path::new("."), &outcome.report));
    write_report(&report_path, &outcome.report)?;

    print!("{}", ReportSummary::from_report(&outcome.report).render());
    println!("  report: {}", report_path.display());

    Ok(())
}

async fn train(
    models_dir: PathBuf,
    diseases: Vec<Disease>,
    options: TrainingOptions,
    audit_log: Option<PathBuf>,
) -> Result<()> {
    let dir = models_dir.clone();
    let reports = tokio::task::spawn_blocking(move || train_diseases(&dir, &diseases, &options))
        .await
        .context("Training task panicked")?
        .context("Failed to train models")?;

    let mut audit = AuditLog::new();
    if let Some(path) = audit_log {
        audit = audit.with_file(path);
    }
    audit
        .log_event(
            AuditEventType::ModelsTrained,
            "system",
            Some(models_dir.display().to_string()),
            serde_json::json!({
                "seed": options.seed,
                "samples": options.samples,
                "n_estimators": options.n_estimators,
                "models": reports,
            }),
        )
        .await;

    for report in &reports {
        println!(
            "{:<12} {:<28} positive rate {:.3}  training accuracy {:.3}",
            report.disease.as_str(),
            report.model_type,
            report.positive_rate,
            report.training_accuracy
        );
    }
    println!("Models written to {}", models_dir.display());

    Ok(())
}
