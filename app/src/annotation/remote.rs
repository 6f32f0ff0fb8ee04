// ==============================================================================
// annotation/remote.rs - ClinVar and gnomAD lookups
// ==============================================================================
// Description: Async client for NCBI E-utilities (ClinVar) and gnomAD GraphQL
// Created: 2026-09-25
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// References:
// - E-utilities: https://www.ncbi.nlm.nih.gov/books/NBK25499/
// - gnomAD API: https://gnomad.broadinstitute.org/api
// - SPDI: https://www.ncbi.nlm.nih.gov/variation/notation/
// ==============================================================================
// Both services are queried on one reference assembly. ClinVar candidates at
// the position are accepted only when their location and alleles match the
// uploaded variant.
// ==============================================================================

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::heuristics::ClinicalCall;
use super::{AnnotationError, AnnotationSource, RemoteAnnotation, RequestRateLimiter};
use crate::models::{ClinicalSignificance, Variant};

pub const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const GNOMAD_API_URL: &str = "https://gnomad.broadinstitute.org/api";
pub const DEFAULT_GNOMAD_DATASET: &str = "gnomad_r4";

/// Lifetime of a cached lookup
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

const USER_AGENT: &str = "CuraGenie/2.0 (variant annotation)";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// ClinVar records fetched per position before allele matching
const CLINVAR_MAX_RECORDS: usize = 20;

/// Expired entries are swept once the cache reaches this size
const CACHE_SWEEP_THRESHOLD: usize = 100_000;

const GNOMAD_QUERY: &str = "\
query VariantFrequency($variantId: String!, $dataset: DatasetId!) {
  variant(variantId: $variantId, dataset: $dataset) {
    genome { af }
    exome { af }
  }
}";

// ============================================================================
// Reference assembly
// ============================================================================

/// Reference genome the uploaded coordinates are on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenomeAssembly {
    Grch37,
    Grch38,
}

impl GenomeAssembly {
    /// gnomAD v2 (and ExAC) are GRCh37; v3 onward are GRCh38
    pub fn for_gnomad_dataset(dataset: &str) -> Self {
        let dataset = dataset.to_lowercase();
        if dataset.starts_with("gnomad_r2") || dataset.starts_with("exac") {
            GenomeAssembly::Grch37
        } else {
            GenomeAssembly::Grch38
        }
    }

    /// Name used in ClinVar `variation_loc` entries
    pub fn name(&self) -> &'static str {
        match self {
            GenomeAssembly::Grch37 => "GRCh37",
            GenomeAssembly::Grch38 => "GRCh38",
        }
    }

    /// ClinVar esearch field for a base position on this assembly
    pub fn clinvar_position_field(&self) -> &'static str {
        match self {
            GenomeAssembly::Grch37 => "chrpos37",
            GenomeAssembly::Grch38 => "chrpos38",
        }
    }
}

impl fmt::Display for GenomeAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GenomeAssembly {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grch37" | "hg19" | "37" => Ok(GenomeAssembly::Grch37),
            "grch38" | "hg38" | "38" => Ok(GenomeAssembly::Grch38),
            other => Err(format!("Unknown genome assembly: {}", other)),
        }
    }
}

/// Endpoints and credentials for the remote client
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub eutils_base_url: String,
    pub gnomad_url: String,
    pub gnomad_dataset: String,
    pub assembly: GenomeAssembly,
    pub ncbi_api_key: Option<String>,

    /// Zero disables caching
    pub cache_ttl: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            eutils_base_url: EUTILS_BASE_URL.to_string(),
            gnomad_url: GNOMAD_API_URL.to_string(),
            gnomad_dataset: DEFAULT_GNOMAD_DATASET.to_string(),
            assembly: GenomeAssembly::for_gnomad_dataset(DEFAULT_GNOMAD_DATASET),
            ncbi_api_key: None,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

// ============================================================================
// Response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GnomadResponse {
    data: Option<GnomadData>,
}

#[derive(Debug, Deserialize)]
struct GnomadData {
    variant: Option<GnomadVariant>,
}

#[derive(Debug, Deserialize)]
struct GnomadVariant {
    genome: Option<GnomadPopulation>,
    exome: Option<GnomadPopulation>,
}

#[derive(Debug, Deserialize)]
struct GnomadPopulation {
    af: Option<f64>,
}

// ============================================================================
// Lookup cache
// ============================================================================

/// In-process TTL cache of complete lookups, keyed by gnomAD variant id
struct LookupCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, RemoteAnnotation)>>,
}

impl LookupCache {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    async fn get(&self, key: &str) -> Option<RemoteAnnotation> {
        if !self.enabled() {
            return None;
        }

        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((stored, annotation)) if stored.elapsed() < self.ttl => Some(annotation.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn insert(&self, key: String, annotation: RemoteAnnotation) {
        if !self.enabled() {
            return;
        }

        let mut entries = self.entries.lock().await;
        if entries.len() >= CACHE_SWEEP_THRESHOLD {
            let ttl = self.ttl;
            entries.retain(|_, (stored, _)| stored.elapsed() < ttl);
        }
        entries.insert(key, (Instant::now(), annotation));
    }
}

// ============================================================================
// Client
// ============================================================================

/// ClinVar + gnomAD annotation source
pub struct RemoteAnnotationClient {
    client: Client,
    config: RemoteConfig,
    rate_limiter: Arc<RequestRateLimiter>,
    cache: LookupCache,
}

impl RemoteAnnotationClient {
    pub fn new(config: RemoteConfig, rate_limiter: Arc<RequestRateLimiter>) -> Result<Self, AnnotationError> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self::with_http_client(client, config, rate_limiter))
    }

    /// Use a prebuilt HTTP client
    pub fn with_http_client(client: Client, config: RemoteConfig, rate_limiter: Arc<RequestRateLimiter>) -> Self {
        let dataset_assembly = GenomeAssembly::for_gnomad_dataset(&config.gnomad_dataset);
        if dataset_assembly != config.assembly {
            warn!(
                "gnomAD dataset {} is {} but variants are annotated as {}",
                config.gnomad_dataset, dataset_assembly, config.assembly
            );
        }

        Self {
            client,
            cache: LookupCache::new(config.cache_ttl),
            config,
            rate_limiter,
        }
    }

    /// ClinVar significance for the record matching this variant's alleles
    pub async fn clinvar(&self, variant: &Variant) -> Result<Option<ClinicalCall>, AnnotationError> {
        let term = format!(
            "{}[chr] AND {}[{}]",
            strip_chr(&variant.chromosome),
            variant.position,
            self.config.assembly.clinvar_position_field()
        );

        let mut params = vec![
            ("db", "clinvar".to_string()),
            ("term", term),
            ("retmode", "json".to_string()),
            ("retmax", CLINVAR_MAX_RECORDS.to_string()),
        ];
        self.push_api_key(&mut params);

        self.rate_limiter.acquire().await;
        let response = self
            .client
            .get(format!("{}/esearch.fcgi", self.config.eutils_base_url))
            .query(&params)
            .send()
            .await?;
        check_status("ClinVar esearch", response.status())?;

        let search: ESearchResponse = response.json().await?;
        let ids = search.esearchresult.idlist;
        if ids.is_empty() {
            debug!("{}: no ClinVar record", variant.locus());
            return Ok(None);
        }

        let mut params = vec![
            ("db", "clinvar".to_string()),
            ("id", ids.join(",")),
            ("retmode", "json".to_string()),
        ];
        self.push_api_key(&mut params);

        self.rate_limiter.acquire().await;
        let response = self
            .client
            .get(format!("{}/esummary.fcgi", self.config.eutils_base_url))
            .query(&params)
            .send()
            .await?;
        check_status("ClinVar esummary", response.status())?;

        let summary: Value = response.json().await?;
        let result = summary
            .get("result")
            .ok_or_else(|| AnnotationError::InvalidResponse {
                service: "ClinVar esummary",
                message: "missing result".to_string(),
            })?;

        let matched = ids
            .iter()
            .filter_map(|id| result.get(id))
            .find(|record| record_matches(record, variant, self.config.assembly));

        match matched {
            Some(record) => Ok(parse_clinvar_record(record)),
            None => {
                debug!(
                    "{}: {} ClinVar record(s) at position, none with matching alleles",
                    variant.locus(),
                    ids.len()
                );
                Ok(None)
            }
        }
    }

    /// gnomAD allele frequency, genome preferred over exome
    pub async fn gnomad(&self, variant: &Variant) -> Result<Option<f64>, AnnotationError> {
        let variant_id = gnomad_variant_id(variant);
        let body = json!({
            "query": GNOMAD_QUERY,
            "variables": {
                "variantId": variant_id,
                "dataset": self.config.gnomad_dataset,
            }
        });

        self.rate_limiter.acquire().await;
        let response = self
            .client
            .post(&self.config.gnomad_url)
            .json(&body)
            .send()
            .await?;
        check_status("gnomAD", response.status())?;

        let parsed: GnomadResponse = response.json().await?;
        let frequency = parsed
            .data
            .and_then(|d| d.variant)
            .and_then(|v| {
                v.genome
                    .and_then(|g| g.af)
                    .or_else(|| v.exome.and_then(|e| e.af))
            });

        debug!("{}: gnomAD frequency {:?}", variant_id, frequency);
        Ok(frequency)
    }

    fn push_api_key(&self, params: &mut Vec<(&'static str, String)>) {
        if let Some(key) = &self.config.ncbi_api_key {
            params.push(("api_key", key.clone()));
        }
    }
}

#[async_trait]
impl AnnotationSource for RemoteAnnotationClient {
    fn name(&self) -> &str {
        "clinvar+gnomad"
    }

    async fn lookup(&self, variant: &Variant) -> Result<RemoteAnnotation, AnnotationError> {
        let key = gnomad_variant_id(variant);
        if let Some(cached) = self.cache.get(&key).await {
            debug!("{}: cached annotation", key);
            return Ok(cached);
        }

        let clinvar = self.clinvar(variant).await;
        let gnomad = self.gnomad(variant).await;

        match (clinvar, gnomad) {
            (Err(e), Err(_)) => Err(e),
            (Ok(clinical), Ok(population_frequency)) => {
                let annotation = RemoteAnnotation {
                    clinical,
                    population_frequency,
                };
                self.cache.insert(key, annotation.clone()).await;
                Ok(annotation)
            }
            // Partial results are used but not cached
            (clinvar, gnomad) => {
                let clinical = clinvar.unwrap_or_else(|e| {
                    warn!("{}: ClinVar lookup failed: {}", variant.locus(), e);
                    None
                });
                let population_frequency = gnomad.unwrap_or_else(|e| {
                    warn!("{}: gnomAD lookup failed: {}", variant.locus(), e);
                    None
                });

                Ok(RemoteAnnotation {
                    clinical,
                    population_frequency,
                })
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn check_status(service: &'static str, status: reqwest::StatusCode) -> Result<(), AnnotationError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(AnnotationError::Status {
            service,
            status: status.as_u16(),
        })
    }
}

fn strip_chr(chromosome: &str) -> &str {
    chromosome
        .strip_prefix("chr")
        .or_else(|| chromosome.strip_prefix("CHR"))
        .unwrap_or(chromosome)
}

/// gnomAD variant id: `<chrom>-<pos>-<ref>-<alt>`
pub fn gnomad_variant_id(variant: &Variant) -> String {
    format!(
        "{}-{}-{}-{}",
        strip_chr(&variant.chromosome),
        variant.position,
        variant.reference.to_uppercase(),
        variant.alternate.to_uppercase()
    )
}

/// Does any measure in this esummary record describe `variant`?
///
/// The location must be on `assembly`, on the same chromosome, and start at
/// the variant position (or inside the reference span, for indels whose VCF
/// position is the anchor base). Alleles come from the location's ref/alt
/// when present, else from the canonical SPDI; both sides are compared after
/// trimming shared leading and trailing bases.
fn record_matches(record: &Value, variant: &Variant, assembly: GenomeAssembly) -> bool {
    let Some(measures) = record.get("variation_set").and_then(Value::as_array) else {
        return false;
    };

    let chromosome = strip_chr(&variant.chromosome);
    let first = variant.position;
    let last = variant.position + variant.reference.len().max(1) as u64;

    measures.iter().any(|measure| {
        let located = measure
            .get("variation_loc")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|loc| {
                loc.get("assembly_name")
                    .and_then(Value::as_str)
                    .is_some_and(|name| name.eq_ignore_ascii_case(assembly.name()))
            })
            .filter(|loc| {
                loc.get("chr")
                    .and_then(Value::as_str)
                    .is_some_and(|chr| strip_chr(chr).eq_ignore_ascii_case(chromosome))
            })
            .find(|loc| {
                loc.get("start")
                    .and_then(Value::as_str)
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .is_some_and(|start| (first..=last).contains(&start))
            });

        let Some(loc) = located else {
            return false;
        };

        match measure_alleles(loc, measure) {
            Some((reference, alternate)) => {
                same_change(&reference, &alternate, &variant.reference, &variant.alternate)
            }
            None => false,
        }
    })
}

fn measure_alleles(loc: &Value, measure: &Value) -> Option<(String, String)> {
    let field = |name: &str| {
        loc.get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    if let (Some(reference), Some(alternate)) = (field("ref"), field("alt")) {
        return Some((reference, alternate));
    }

    let spdi = measure.get("canonical_spdi").and_then(Value::as_str)?;
    parse_spdi_alleles(spdi)
}

/// Deleted and inserted sequences of `sequence:position:deleted:inserted`
fn parse_spdi_alleles(spdi: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = spdi.split(':').collect();
    match parts.as_slice() {
        [_, _, deleted, inserted] => Some((deleted.to_string(), inserted.to_string())),
        _ => None,
    }
}

/// Compare two ref/alt pairs after removing shared flanking bases
fn same_change(ref_a: &str, alt_a: &str, ref_b: &str, alt_b: &str) -> bool {
    let (ra, aa) = trim_shared(ref_a.as_bytes(), alt_a.as_bytes());
    let (rb, ab) = trim_shared(ref_b.as_bytes(), alt_b.as_bytes());
    ra.eq_ignore_ascii_case(rb) && aa.eq_ignore_ascii_case(ab)
}

fn trim_shared<'a>(reference: &'a [u8], alternate: &'a [u8]) -> (&'a [u8], &'a [u8]) {
    let prefix = reference
        .iter()
        .zip(alternate)
        .take_while(|(r, a)| r.eq_ignore_ascii_case(a))
        .count();
    let (reference, alternate) = (&reference[prefix..], &alternate[prefix..]);

    let suffix = reference
        .iter()
        .rev()
        .zip(alternate.iter().rev())
        .take_while(|(r, a)| r.eq_ignore_ascii_case(a))
        .count();

    (
        &reference[..reference.len() - suffix],
        &alternate[..alternate.len() - suffix],
    )
}

/// Significance and first trait name from one esummary record
fn parse_clinvar_record(record: &Value) -> Option<ClinicalCall> {
    let classification = record
        .get("germline_classification")
        .filter(|c| description_of(c).is_some())
        .or_else(|| record.get("clinical_significance"))?;

    let description = description_of(classification)?;

    let disease = classification
        .get("trait_set")
        .or_else(|| record.get("trait_set"))
        .and_then(Value::as_array)
        .and_then(|traits| traits.first())
        .and_then(|t| t.get("trait_name"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let review_status = classification
        .get("review_status")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Some(ClinicalCall {
        significance: ClinicalSignificance::from_description(description),
        disease,
        evidence_level: review_status,
    })
}

fn description_of(classification: &Value) -> Option<&str> {
    classification
        .get("description")
        .and_then(Value::as_str)
        .filter(|d| !d.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Mutex as StdMutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn variant(chromosome: &str) -> Variant {
        Variant {
            chromosome: chromosome.to_string(),
            position: 43044295,
            id: None,
            reference: "g".to_string(),
            alternate: "A".to_string(),
            quality: None,
            filter: ".".to_string(),
        }
    }

    fn brca1_snv() -> Variant {
        Variant {
            reference: "G".to_string(),
            ..variant("chr17")
        }
    }

    fn clinvar_record(description: &str, trait_name: &str, assembly: &str, start: u64, spdi: &str) -> Value {
        json!({
            "germline_classification": {
                "description": description,
                "review_status": "criteria provided, single submitter",
                "trait_set": [{"trait_name": trait_name}]
            },
            "variation_set": [{
                "canonical_spdi": spdi,
                "variation_loc": [
                    {"assembly_name": assembly, "chr": "17", "start": start.to_string(), "stop": start.to_string()}
                ]
            }]
        })
    }

    // ------------------------------------------------------------------
    // Local HTTP stub
    // ------------------------------------------------------------------

    type Route = fn(&str) -> (u16, String);

    struct StubServer {
        addr: SocketAddr,
        requests: Arc<StdMutex<Vec<String>>>,
    }

    impl StubServer {
        async fn start(route: Route) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let requests = Arc::new(StdMutex::new(Vec::new()));

            let seen = requests.clone();
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let seen = seen.clone();
                    tokio::spawn(async move {
                        let request = read_request(&mut socket).await;
                        seen.lock().unwrap().push(request.clone());

                        let (status, body) = route(&request);
                        let response = format!(
                            "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            body.len(),
                            body
                        );
                        socket.write_all(response.as_bytes()).await.unwrap();
                        let _ = socket.shutdown().await;
                    });
                }
            });

            Self { addr, requests }
        }

        fn client(&self, dataset: &str, cache_ttl: Duration) -> RemoteAnnotationClient {
            let config = RemoteConfig {
                eutils_base_url: format!("http://{}", self.addr),
                gnomad_url: format!("http://{}/gnomad", self.addr),
                gnomad_dataset: dataset.to_string(),
                assembly: GenomeAssembly::for_gnomad_dataset(dataset),
                ncbi_api_key: Some("secret".to_string()),
                cache_ttl,
            };
            let http = Client::builder().no_proxy().build().unwrap();
            RemoteAnnotationClient::with_http_client(http, config, Arc::new(RequestRateLimiter::new(Duration::ZERO)))
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.requests().iter().filter(|r| r.starts_with(prefix)).count()
        }
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .filter_map(|l| l.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn gnomad_body(af: f64) -> String {
        json!({"data": {"variant": {"genome": {"af": af}, "exome": null}}}).to_string()
    }

    fn clinvar_routes(request: &str) -> (u16, String) {
        if request.starts_with("GET /esearch.fcgi") {
            let body = json!({"esearchresult": {"idlist": ["111", "222"]}});
            (200, body.to_string())
        } else if request.starts_with("GET /esummary.fcgi") {
            let body = json!({"result": {
                "uids": ["111", "222"],
                "111": clinvar_record("Benign", "other allele", "GRCh38", 43044295, "NC_000017.11:43044294:G:C"),
                "222": clinvar_record("Pathogenic", "Hereditary breast ovarian cancer syndrome", "GRCh38", 43044295, "NC_000017.11:43044294:G:A"),
            }});
            (200, body.to_string())
        } else if request.starts_with("POST /gnomad") {
            (200, gnomad_body(0.0123))
        } else {
            (404, "{}".to_string())
        }
    }

    // ------------------------------------------------------------------
    // Pure helpers
    // ------------------------------------------------------------------

    #[test]
    fn test_gnomad_variant_id() {
        assert_eq!(gnomad_variant_id(&variant("chr17")), "17-43044295-G-A");
        assert_eq!(gnomad_variant_id(&variant("X")), "X-43044295-G-A");
    }

    #[test]
    fn test_assembly_follows_gnomad_dataset() {
        assert_eq!(GenomeAssembly::for_gnomad_dataset("gnomad_r2_1"), GenomeAssembly::Grch37);
        assert_eq!(GenomeAssembly::for_gnomad_dataset("gnomad_r3"), GenomeAssembly::Grch38);
        assert_eq!(GenomeAssembly::for_gnomad_dataset("gnomad_r4"), GenomeAssembly::Grch38);
        assert_eq!(RemoteConfig::default().assembly, GenomeAssembly::Grch38);

        assert_eq!("hg19".parse::<GenomeAssembly>().unwrap(), GenomeAssembly::Grch37);
        assert_eq!(GenomeAssembly::Grch37.clinvar_position_field(), "chrpos37");
        assert_eq!(GenomeAssembly::Grch38.clinvar_position_field(), "chrpos38");
    }

    #[test]
    fn test_record_matching_requires_alleles_and_assembly() {
        let snv = brca1_snv();
        let spdi = "NC_000017.11:43044294:G:A";

        let matching = clinvar_record("Pathogenic", "t", "GRCh38", 43044295, spdi);
        assert!(record_matches(&matching, &snv, GenomeAssembly::Grch38));

        // Same position, different alternate allele
        let other_allele = clinvar_record("Benign", "t", "GRCh38", 43044295, "NC_000017.11:43044294:G:T");
        assert!(!record_matches(&other_allele, &snv, GenomeAssembly::Grch38));

        // Position only known on the other assembly
        assert!(!record_matches(&matching, &snv, GenomeAssembly::Grch37));

        // No location or allele data at all
        assert!(!record_matches(&json!({"uid": "1"}), &snv, GenomeAssembly::Grch38));
    }

    #[test]
    fn test_record_matching_indels() {
        // VCF deletion with anchor base vs. SPDI with shared base
        let deletion = Variant {
            reference: "AT".to_string(),
            alternate: "A".to_string(),
            position: 1000,
            ..brca1_snv()
        };
        let record = clinvar_record("Pathogenic", "t", "GRCh38", 1001, "NC_000017.11:1000:TT:T");
        assert!(record_matches(&record, &deletion, GenomeAssembly::Grch38));

        // Explicit ref/alt on the location take precedence over SPDI
        let record = json!({"variation_set": [{
            "canonical_spdi": "NC_000017.11:1000:TT:T",
            "variation_loc": [{"assembly_name": "GRCh38", "chr": "17", "start": "1001", "ref": "TC", "alt": "T"}]
        }]});
        assert!(!record_matches(&record, &deletion, GenomeAssembly::Grch38));
    }

    #[test]
    fn test_parse_germline_classification() {
        let record = json!({
            "uid": "55555",
            "germline_classification": {
                "description": "Pathogenic",
                "review_status": "criteria provided, multiple submitters, no conflicts",
                "trait_set": [
                    {"trait_name": "Hereditary breast ovarian cancer syndrome"},
                    {"trait_name": "Breast-ovarian cancer, familial 1"}
                ]
            }
        });

        let call = parse_clinvar_record(&record).unwrap();
        assert_eq!(call.significance, ClinicalSignificance::Pathogenic);
        assert_eq!(
            call.disease.as_deref(),
            Some("Hereditary breast ovarian cancer syndrome")
        );
        assert!(call.evidence_level.is_some());
    }

    #[test]
    fn test_parse_legacy_clinical_significance() {
        let record = json!({
            "germline_classification": {"description": ""},
            "clinical_significance": {"description": "Likely benign"},
            "trait_set": [{"trait_name": "not provided"}]
        });

        let call = parse_clinvar_record(&record).unwrap();
        assert_eq!(call.significance, ClinicalSignificance::LikelyBenign);
        assert_eq!(call.disease.as_deref(), Some("not provided"));
        assert_eq!(call.evidence_level, None);
    }

    #[test]
    fn test_parse_record_without_classification() {
        assert!(parse_clinvar_record(&json!({"uid": "1"})).is_none());
    }

    #[test]
    fn test_gnomad_response_prefers_genome() {
        let parsed: GnomadResponse = serde_json::from_value(json!({
            "data": {"variant": {"genome": {"af": 0.0123}, "exome": {"af": 0.02}}}
        }))
        .unwrap();

        let variant = parsed.data.and_then(|d| d.variant).unwrap();
        assert_eq!(variant.genome.and_then(|g| g.af), Some(0.0123));
    }

    #[test]
    fn test_gnomad_missing_variant() {
        let parsed: GnomadResponse = serde_json::from_value(json!({
            "data": {"variant": null},
            "errors": [{"message": "Variant not found"}]
        }))
        .unwrap();

        assert!(parsed.data.and_then(|d| d.variant).is_none());
    }

    // ------------------------------------------------------------------
    // Client against the stub
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_clinvar_picks_record_with_matching_alleles() {
        let server = StubServer::start(clinvar_routes).await;
        let client = server.client("gnomad_r4", Duration::ZERO);

        let call = client.clinvar(&brca1_snv()).await.unwrap().unwrap();
        assert_eq!(call.significance, ClinicalSignificance::Pathogenic);
        assert_eq!(
            call.disease.as_deref(),
            Some("Hereditary breast ovarian cancer syndrome")
        );

        let requests = server.requests();
        let search = requests.iter().find(|r| r.starts_with("GET /esearch.fcgi")).unwrap();
        let search_line = search.lines().next().unwrap();
        assert!(search_line.contains("db=clinvar"));
        assert!(search_line.contains("43044295%5Bchrpos38%5D"));
        assert!(search_line.contains("retmax=20"));
        assert!(search_line.contains("api_key=secret"));

        let summary = requests.iter().find(|r| r.starts_with("GET /esummary.fcgi")).unwrap();
        let summary_line = summary.lines().next().unwrap();
        assert!(summary_line.contains("id=111%2C222"));
        assert!(summary_line.contains("api_key=secret"));
    }

    #[tokio::test]
    async fn test_clinvar_grch37_search_and_no_allele_match() {
        let server = StubServer::start(clinvar_routes).await;
        let client = server.client("gnomad_r2_1", Duration::ZERO);

        // Stubbed records only carry GRCh38 locations
        assert_eq!(client.clinvar(&brca1_snv()).await.unwrap(), None);

        let search = server.requests().into_iter().find(|r| r.starts_with("GET /esearch.fcgi")).unwrap();
        assert!(search.lines().next().unwrap().contains("%5Bchrpos37%5D"));
    }

    #[tokio::test]
    async fn test_gnomad_request_and_frequency() {
        let server = StubServer::start(clinvar_routes).await;
        let client = server.client("gnomad_r4", Duration::ZERO);

        assert_eq!(client.gnomad(&brca1_snv()).await.unwrap(), Some(0.0123));

        let request = server.requests().into_iter().find(|r| r.starts_with("POST /gnomad")).unwrap();
        assert!(request.contains("\"variantId\":\"17-43044295-G-A\""));
        assert!(request.contains("\"dataset\":\"gnomad_r4\""));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = StubServer::start(|_| (503, "{}".to_string())).await;
        let client = server.client("gnomad_r4", Duration::ZERO);

        let err = client.clinvar(&brca1_snv()).await.unwrap_err();
        assert!(matches!(
            err,
            AnnotationError::Status {
                service: "ClinVar esearch",
                status: 503
            }
        ));

        let err = client.gnomad(&brca1_snv()).await.unwrap_err();
        assert!(matches!(err, AnnotationError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_lookup_keeps_data_from_the_working_service() {
        let server = StubServer::start(|request| {
            if request.starts_with("POST /gnomad") {
                (200, gnomad_body(0.004))
            } else {
                (503, "{}".to_string())
            }
        })
        .await;
        let client = server.client("gnomad_r4", Duration::ZERO);

        let annotation = client.lookup(&brca1_snv()).await.unwrap();
        assert_eq!(annotation.clinical, None);
        assert_eq!(annotation.population_frequency, Some(0.004));
    }

    #[tokio::test]
    async fn test_lookup_fails_when_both_services_fail() {
        let server = StubServer::start(|_| (503, "{}".to_string())).await;
        let client = server.client("gnomad_r4", Duration::ZERO);

        let err = client.lookup(&brca1_snv()).await.unwrap_err();
        assert!(matches!(err, AnnotationError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_lookup_cache() {
        let server = StubServer::start(clinvar_routes).await;
        let cached = server.client("gnomad_r4", Duration::from_secs(60));

        let first = cached.lookup(&brca1_snv()).await.unwrap();
        let second = cached.lookup(&brca1_snv()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.population_frequency, Some(0.0123));
        assert_eq!(server.count("POST /gnomad"), 1);
        assert_eq!(server.count("GET /esearch.fcgi"), 1);

        let uncached = server.client("gnomad_r4", Duration::ZERO);
        uncached.lookup(&brca1_snv()).await.unwrap();
        uncached.lookup(&brca1_snv()).await.unwrap();
        assert_eq!(server.count("POST /gnomad"), 3);
    }

    #[tokio::test]
    async fn test_partial_results_are_not_cached() {
        let server = StubServer::start(|request| {
            if request.starts_with("POST /gnomad") {
                (200, gnomad_body(0.004))
            } else {
                (503, "{}".to_string())
            }
        })
        .await;
        let client = server.client("gnomad_r4", Duration::from_secs(60));

        client.lookup(&brca1_snv()).await.unwrap();
        client.lookup(&brca1_snv()).await.unwrap();
        assert_eq!(server.count("GET /esearch.fcgi"), 2);
    }
}
