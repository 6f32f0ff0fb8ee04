// ==============================================================================
// validator.rs - Upload Validation
// ==============================================================================
// Description: Checks raw VCF uploads (size, name, type, magic) before parsing
// Created: 2025-10-31
// Modified: 2026-10-03
// Version: 2.0.0
// Security: Allowlist-only file types, magic number verification
// ==============================================================================

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::parsers::GZIP_MAGIC;

/// Default upload ceiling: 500 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

const MAX_FILENAME_LEN: usize = 255;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Upload is empty")]
    Empty,

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Invalid filename after sanitization")]
    InvalidFilename,

    #[error("Invalid file type: {0} (expected .vcf or .vcf.gz)")]
    UnsupportedType(String),

    #[error("Magic number mismatch for .{0} file")]
    MagicMismatch(String),
}

/// Metadata of an upload that passed every check
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub original_name: String,
    pub safe_name: String,
    pub extension: String,
    pub size: u64,
    pub sha256: String,
    pub validated_at: DateTime<Utc>,
}

pub struct UploadValidator {
    max_upload_bytes: u64,
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadValidator {
    pub fn new() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max: u64) -> Self {
        self.max_upload_bytes = max;
        self
    }

    pub fn validate(&self, file_name: &str, content: &[u8]) -> Result<ValidatedUpload, ValidationError> {
        info!("Validating upload: {}", file_name);

        // 1. Size check
        let size = content.len() as u64;
        if size == 0 {
            return Err(ValidationError::Empty);
        }
        if size > self.max_upload_bytes {
            return Err(ValidationError::TooLarge {
                size,
                max: self.max_upload_bytes,
            });
        }
        debug!("Size check passed: {} bytes", size);

        // 2. Filename sanitization
        let safe_name = sanitize_filename(file_name)?;
        debug!("Sanitized filename: {}", safe_name);

        // 3. Extension check (allowlist)
        let extension = allowed_extension(&safe_name)?;
        debug!("Extension check passed: {}", extension);

        // 4. Magic number verification
        if extension == "vcf.gz" && !content.starts_with(&GZIP_MAGIC) {
            return Err(ValidationError::MagicMismatch(extension));
        }

        // 5. Fingerprint
        let sha256 = compute_sha256(content);
        debug!("SHA-256: {}", sha256);

        Ok(ValidatedUpload {
            original_name: file_name.to_string(),
            safe_name,
            extension,
            size,
            sha256,
            validated_at: Utc::now(),
        })
    }
}

/// Strip path separators and anything outside `[A-Za-z0-9._-]`
pub fn sanitize_filename(name: &str) -> Result<String, ValidationError> {
    let safe: String = name
        .replace(['/', '\\', '\0'], "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    if safe.is_empty() || safe.chars().all(|c| c == '.') {
        return Err(ValidationError::InvalidFilename);
    }

    Ok(truncate_keeping_suffix(safe))
}

/// Shorten the stem so an allowlisted suffix survives the length cap
fn truncate_keeping_suffix(mut name: String) -> String {
    if name.len() <= MAX_FILENAME_LEN {
        return name;
    }

    let lower = name.to_lowercase();
    let suffix_len = [".vcf.gz", ".vcf"]
        .iter()
        .find(|s| lower.ends_with(*s))
        .map_or(0, |s| s.len());

    // Sanitized names are ASCII, so byte offsets are char boundaries
    let suffix = name.split_off(name.len() - suffix_len);
    name.truncate(MAX_FILENAME_LEN - suffix_len);
    name.push_str(&suffix);
    name
}

fn allowed_extension(filename: &str) -> Result<String, ValidationError> {
    let lower = filename.to_lowercase();

    if lower.ends_with(".vcf.gz") {
        Ok("vcf.gz".to_string())
    } else if lower.ends_with(".vcf") {
        Ok("vcf".to_string())
    } else {
        let ext = lower.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
        Err(ValidationError::UnsupportedType(ext.to_string()))
    }
}

/// Lowercase hex SHA-256 digest
pub fn compute_sha256(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VCF: &[u8] = b"##fileformat=VCFv4.2\nchr1\t1000\t.\tA\tT\t100\tPASS\t.\n";

    #[test]
    fn test_accepts_plain_vcf() {
        let validated = UploadValidator::new().validate("sample.vcf", VCF).unwrap();

        assert_eq!(validated.safe_name, "sample.vcf");
        assert_eq!(validated.extension, "vcf");
        assert_eq!(validated.size, VCF.len() as u64);
        assert_eq!(validated.sha256.len(), 64);
    }

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            compute_sha256(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_rejects_empty() {
        let err = UploadValidator::new().validate("x.vcf", b"").unwrap_err();
        assert_eq!(err, ValidationError::Empty);
    }

    #[test]
    fn test_rejects_oversize() {
        let validator = UploadValidator::new().with_max_upload_bytes(10);
        let err = validator.validate("x.vcf", VCF).unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { max: 10, .. }));
    }

    #[test]
    fn test_rejects_other_extensions() {
        let err = UploadValidator::new().validate("genome.txt", VCF).unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedType("txt".to_string()));
    }

    #[test]
    fn test_gz_requires_magic() {
        let err = UploadValidator::new().validate("sample.vcf.gz", VCF).unwrap_err();
        assert_eq!(err, ValidationError::MagicMismatch("vcf.gz".to_string()));

        let gz = [0x1f, 0x8b, 0x08, 0x00, 0x00];
        let validated = UploadValidator::new().validate("sample.VCF.GZ", &gz).unwrap();
        assert_eq!(validated.extension, "vcf.gz");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/x.vcf").unwrap(), ".._.._etc_x.vcf");
        assert_eq!(sanitize_filename("my file (1).vcf").unwrap(), "myfile1.vcf");
        assert_eq!(sanitize_filename("\u{00e9}\u{00e8}"), Err(ValidationError::InvalidFilename));
        assert_eq!(sanitize_filename(".."), Err(ValidationError::InvalidFilename));

        let long = format!("{}.txt", "a".repeat(400));
        assert_eq!(sanitize_filename(&long).unwrap().len(), MAX_FILENAME_LEN);
    }

    #[test]
    fn test_long_name_keeps_extension() {
        let long = format!("{}.vcf", "a".repeat(300));
        let validated = UploadValidator::new().validate(&long, VCF).unwrap();

        assert_eq!(validated.safe_name.len(), MAX_FILENAME_LEN);
        assert!(validated.safe_name.ends_with("a.vcf"));
        assert_eq!(validated.extension, "vcf");

        let gz = [0x1f, 0x8b, 0x08, 0x00, 0x00];
        let long_gz = format!("{}.VCF.GZ", "b".repeat(300));
        let validated = UploadValidator::new().validate(&long_gz, &gz).unwrap();
        assert!(validated.safe_name.ends_with(".VCF.GZ"));
        assert_eq!(validated.extension, "vcf.gz");
    }
}
