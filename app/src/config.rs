// ==============================================================================
// config.rs - Pipeline Configuration
// ==============================================================================
// Description: Command-line / environment settings for an analysis run
// Created: 2026-10-11
// Modified: 2026-10-12
// Version: 2.0.0
// ==============================================================================
// Every field can be set by flag or environment variable; `.env` files are
// loaded by the binary before parsing.
// ==============================================================================

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

use crate::annotation::remote::{GenomeAssembly, RemoteConfig, DEFAULT_GNOMAD_DATASET};
use crate::validator::DEFAULT_MAX_UPLOAD_BYTES;

pub const DEFAULT_MODELS_DIR: &str = "models";
pub const DEFAULT_TARGET_TIME_SECS: f64 = 60.0;

#[derive(Args, Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding trained model artifacts
    #[arg(long, env = "CURAGENIE_MODELS_DIR", default_value = DEFAULT_MODELS_DIR)]
    pub models_dir: PathBuf,

    /// Query ClinVar and gnomAD before falling back to heuristics
    #[arg(long, env = "CURAGENIE_REMOTE_ANNOTATION")]
    pub remote_annotation: bool,

    /// Minimum interval between outbound annotation requests
    #[arg(long, env = "CURAGENIE_MIN_REQUEST_INTERVAL_MS", default_value_t = 100)]
    pub min_request_interval_ms: u64,

    /// Variants annotated concurrently per chunk
    #[arg(long, env = "CURAGENIE_ANNOTATION_CHUNK_SIZE", default_value_t = 100)]
    pub annotation_chunk_size: usize,

    /// Processing-time target; exceeding it only logs a warning
    #[arg(long, env = "CURAGENIE_TARGET_TIME_SECS", default_value_t = DEFAULT_TARGET_TIME_SECS)]
    pub target_time_secs: f64,

    /// NCBI E-utilities API key
    #[arg(long, env = "NCBI_API_KEY", hide_env_values = true)]
    pub ncbi_api_key: Option<String>,

    #[arg(long, env = "CURAGENIE_GNOMAD_DATASET", default_value = DEFAULT_GNOMAD_DATASET)]
    pub gnomad_dataset: String,

    /// Reference assembly of uploaded coordinates (default: from the gnomAD dataset)
    #[arg(long, env = "CURAGENIE_GENOME_ASSEMBLY")]
    pub genome_assembly: Option<GenomeAssembly>,

    /// Lifetime of cached remote lookups; 0 disables the cache
    #[arg(long, env = "CURAGENIE_ANNOTATION_CACHE_TTL_SECS", default_value_t = 3600)]
    pub annotation_cache_ttl_secs: u64,

    #[arg(long, env = "CURAGENIE_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: u64,

    /// Append audit events as JSON lines to this file
    #[arg(long, env = "CURAGENIE_AUDIT_LOG")]
    pub audit_log: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
            remote_annotation: false,
            min_request_interval_ms: 100,
            annotation_chunk_size: 100,
            target_time_secs: DEFAULT_TARGET_TIME_SECS,
            ncbi_api_key: None,
            gnomad_dataset: DEFAULT_GNOMAD_DATASET.to_string(),
            genome_assembly: None,
            annotation_cache_ttl_secs: 3600,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            audit_log: None,
        }
    }
}

impl PipelineConfig {
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    /// Negative or non-finite targets fall back to the default
    pub fn target_time(&self) -> Duration {
        Duration::try_from_secs_f64(self.target_time_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_TARGET_TIME_SECS))
    }

    pub fn assembly(&self) -> GenomeAssembly {
        self.genome_assembly
            .unwrap_or_else(|| GenomeAssembly::for_gnomad_dataset(&self.gnomad_dataset))
    }

    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig {
            gnomad_dataset: self.gnomad_dataset.clone(),
            assembly: self.assembly(),
            ncbi_api_key: self.ncbi_api_key.clone(),
            cache_ttl: Duration::from_secs(self.annotation_cache_ttl_secs),
            ..RemoteConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: PipelineConfig,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::parse_from([
            "test",
            "--models-dir",
            "/tmp/models",
            "--remote-annotation",
            "--annotation-chunk-size",
            "25",
            "--target-time-secs",
            "5",
        ]);

        assert_eq!(cli.config.models_dir, PathBuf::from("/tmp/models"));
        assert!(cli.config.remote_annotation);
        assert_eq!(cli.config.annotation_chunk_size, 25);
        assert_eq!(cli.config.target_time(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_target_time_falls_back() {
        let config = PipelineConfig {
            target_time_secs: -1.0,
            ..PipelineConfig::default()
        };
        assert_eq!(config.target_time(), Duration::from_secs(60));
    }

    #[test]
    fn test_remote_config() {
        let config = PipelineConfig {
            ncbi_api_key: Some("key".to_string()),
            ..PipelineConfig::default()
        };
        let remote = config.remote_config();

        assert_eq!(remote.gnomad_dataset, "gnomad_r4");
        assert_eq!(remote.assembly, GenomeAssembly::Grch38);
        assert_eq!(remote.ncbi_api_key.as_deref(), Some("key"));
        assert_eq!(remote.cache_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_assembly_from_dataset_or_flag() {
        let cli = TestCli::parse_from(["test", "--gnomad-dataset", "gnomad_r2_1"]);
        assert_eq!(cli.config.remote_config().assembly, GenomeAssembly::Grch37);

        let cli = TestCli::parse_from([
            "test",
            "--genome-assembly",
            "GRCh38",
            "--annotation-cache-ttl-secs",
            "0",
        ]);
        let remote = cli.config.remote_config();
        assert_eq!(remote.assembly, GenomeAssembly::Grch38);
        assert!(remote.cache_ttl.is_zero());
    }
}
