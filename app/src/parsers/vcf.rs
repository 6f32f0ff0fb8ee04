// ==============================================================================
// parsers/vcf.rs - Lenient VCF text parser
// ==============================================================================
// Description: Tokenizes uploaded VCF content into Variant records
// Created: 2025-11-03
// Modified: 2026-10-02
// Version: 2.0.0
// ==============================================================================
// Format: Tab-delimited text, '#' lines are header
// Example:
//   ##fileformat=VCFv4.2
//   #CHROM  POS   ID  REF  ALT  QUAL  FILTER  INFO
//   chr1    1000  .   A    T    100   PASS    .
// ==============================================================================
// References:
// - VCF 4.2 Spec: https://samtools.github.io/hts-specs/VCFv4.2.pdf
// ==============================================================================

use flate2::read::MultiGzDecoder;
use std::collections::HashSet;
use std::io::Read;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::Variant;

/// Gzip magic number (BGZF blocks share it)
pub const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// Minimum number of tab-separated columns a data line needs
const MIN_FIELDS: usize = 5;

/// VCF parsing errors
///
/// Only content-level failures are errors. Malformed data lines are skipped
/// and counted on the parser instead.
#[derive(Error, Debug)]
pub enum VcfParseError {
    #[error("Failed to decompress gzip content: {0}")]
    Decompress(#[from] std::io::Error),

    #[error("VCF content is not valid UTF-8 text: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
}

/// Why a single data line was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LineError {
    #[error("expected at least {MIN_FIELDS} tab-separated fields, found {0}")]
    TooFewFields(usize),

    #[error("invalid position '{0}'")]
    InvalidPosition(String),

    #[error("position must be greater than zero")]
    ZeroPosition,

    #[error("invalid bases in REF '{reference}' / ALT '{alternate}'")]
    InvalidBases { reference: String, alternate: String },
}

/// Lenient VCF parser
///
/// Counters are reset at the start of every `parse` call.
#[derive(Debug, Default)]
pub struct VcfParser {
    /// Header and blank lines
    pub header_count: usize,

    /// Lines dropped for shape or base-alphabet problems
    pub skipped_count: usize,

    /// Lines dropped because the position failed to parse
    pub error_count: usize,

    /// Repeated (chrom, pos, ref, alt) lines after the first
    pub duplicate_count: usize,
}

impl VcfParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse raw VCF bytes (plain or gzip) into variants
    ///
    /// # Returns
    /// * `Ok(Vec<Variant>)` - Every accepted data line, in file order
    /// * `Err(VcfParseError)` - Content could not be decompressed or decoded
    ///
    /// # Example
    /// ```
    /// use curagenie_pipeline::parsers::VcfParser;
    ///
    /// let mut parser = VcfParser::new();
    /// let variants = parser.parse(b"chr1\t1000\t.\tA\tT\t100\tPASS\t.\n").unwrap();
    /// assert_eq!(variants.len(), 1);
    /// ```
    pub fn parse(&mut self, content: &[u8]) -> Result<Vec<Variant>, VcfParseError> {
        let text = decode_content(content)?;

        self.header_count = 0;
        self.skipped_count = 0;
        self.error_count = 0;
        self.duplicate_count = 0;

        let mut variants = Vec::new();
        let mut seen: HashSet<(String, u64, String, String)> = HashSet::new();

        for (idx, raw_line) in text.lines().enumerate() {
            let line_number = idx + 1;
            let line = raw_line.trim_end_matches('\r');

            if line.trim().is_empty() || line.starts_with('#') {
                self.header_count += 1;
                continue;
            }

            match parse_line(line) {
                Ok(variant) => {
                    let key = (
                        variant.chromosome.clone(),
                        variant.position,
                        variant.reference.clone(),
                        variant.alternate.clone(),
                    );
                    if !seen.insert(key) {
                        debug!("Line {}: duplicate variant {}", line_number, variant.locus());
                        self.duplicate_count += 1;
                        continue;
                    }
                    variants.push(variant);
                }
                Err(e @ LineError::InvalidPosition(_)) => {
                    warn!("Line {}: {}", line_number, e);
                    self.error_count += 1;
                }
                Err(e) => {
                    warn!("Line {}: skipping malformed record: {}", line_number, e);
                    self.skipped_count += 1;
                }
            }
        }

        info!(
            "Parsed {} variants ({} skipped, {} errors, {} duplicates)",
            variants.len(),
            self.skipped_count,
            self.error_count,
            self.duplicate_count
        );

        Ok(variants)
    }
}

/// True when the bytes start with the gzip magic number
pub fn is_gzip(content: &[u8]) -> bool {
    content.len() >= GZIP_MAGIC.len() && content[..GZIP_MAGIC.len()] == GZIP_MAGIC
}

/// Decompress if needed, then decode as UTF-8
fn decode_content(content: &[u8]) -> Result<String, VcfParseError> {
    let bytes = if is_gzip(content) {
        let mut decoder = MultiGzDecoder::new(content);
        let mut buffer = Vec::new();
        decoder.read_to_end(&mut buffer)?;
        debug!("Decompressed {} -> {} bytes", content.len(), buffer.len());
        buffer
    } else {
        content.to_vec()
    };

    Ok(String::from_utf8(bytes)?)
}

/// Parse a single data line
fn parse_line(line: &str) -> Result<Variant, LineError> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() < MIN_FIELDS {
        return Err(LineError::TooFewFields(fields.len()));
    }

    let chromosome = fields[0].trim().to_string();
    let position_str = fields[1].trim();
    let reference = fields[3].trim();
    let alternate = fields[4].trim();

    let position = position_str
        .parse::<u64>()
        .map_err(|_| LineError::InvalidPosition(position_str.to_string()))?;

    if position == 0 {
        return Err(LineError::ZeroPosition);
    }

    if chromosome.is_empty() || !is_valid_allele(reference) || !is_valid_allele(alternate) {
        return Err(LineError::InvalidBases {
            reference: reference.to_string(),
            alternate: alternate.to_string(),
        });
    }

    let id = match fields[2].trim() {
        "" | "." => None,
        other => Some(other.to_string()),
    };

    let quality = fields
        .get(5)
        .map(|q| q.trim())
        .filter(|q| !q.is_empty() && *q != ".")
        .and_then(|q| q.parse::<f64>().ok());

    let filter = fields
        .get(6)
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .unwrap_or(".")
        .to_string();

    Ok(Variant {
        chromosome,
        position,
        id,
        reference: reference.to_string(),
        alternate: alternate.to_string(),
        quality,
        filter,
    })
}

/// Non-empty and only A/C/G/T/N (either case)
fn is_valid_allele(allele: &str) -> bool {
    !allele.is_empty()
        && allele
            .bytes()
            .all(|b| matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'N'))
}
