// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for uploaded genetic data files
// Created: 2025-11-03
// Modified: 2026-10-02
// Version: 2.0.0
// ==============================================================================

pub mod vcf;

pub use vcf::{is_gzip, LineError, VcfParseError, VcfParser, GZIP_MAGIC};
