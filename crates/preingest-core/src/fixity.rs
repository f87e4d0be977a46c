//! Client for the remote fixity service.
//!
//! Digests are never computed in-process. The utilities service exposes one
//! endpoint per algorithm:
//!
//! ```text
//! GET http://{host}:{port}/fixity/{algorithm}/{base64url(path)}
//! ```
//!
//! and answers with the hex digest as the response body.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::config::{ServiceEndpoint, Settings};
use crate::error::{PreingestError, Result};

// ---------------------------------------------------------------------------
// ChecksumAlgorithm
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl ChecksumAlgorithm {
    pub const ALL: [ChecksumAlgorithm; 6] = [
        ChecksumAlgorithm::Md5,
        ChecksumAlgorithm::Sha1,
        ChecksumAlgorithm::Sha224,
        ChecksumAlgorithm::Sha256,
        ChecksumAlgorithm::Sha384,
        ChecksumAlgorithm::Sha512,
    ];

    /// Parse a caller-supplied selector. Case-insensitive; the dash in the
    /// SHA family is optional (`sha1`, `SHA-1`, `Sha256` ...).
    pub fn parse(selector: &str) -> Option<Self> {
        match selector.trim().to_ascii_uppercase().as_str() {
            "MD5" => Some(ChecksumAlgorithm::Md5),
            "SHA1" | "SHA-1" => Some(ChecksumAlgorithm::Sha1),
            "SHA224" | "SHA-224" => Some(ChecksumAlgorithm::Sha224),
            "SHA256" | "SHA-256" => Some(ChecksumAlgorithm::Sha256),
            "SHA384" | "SHA-384" => Some(ChecksumAlgorithm::Sha384),
            "SHA512" | "SHA-512" => Some(ChecksumAlgorithm::Sha512),
            _ => None,
        }
    }

    /// Canonical display name.
    pub fn name(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "MD5",
            ChecksumAlgorithm::Sha1 => "SHA1",
            ChecksumAlgorithm::Sha224 => "SHA224",
            ChecksumAlgorithm::Sha256 => "SHA256",
            ChecksumAlgorithm::Sha384 => "SHA384",
            ChecksumAlgorithm::Sha512 => "SHA512",
        }
    }

    /// Path segment used by the fixity service.
    pub fn url_segment(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "md5",
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Sha224 => "sha224",
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Sha384 => "sha384",
            ChecksumAlgorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// FixityClient
// ---------------------------------------------------------------------------

/// Computes a digest for a file somewhere other than this process.
///
/// An `Ok` with an empty string means the service answered without a value;
/// callers decide how to classify that.
pub trait FixityClient: Send + Sync {
    fn calculate(&self, algorithm: ChecksumAlgorithm, path: &Path) -> Result<String>;
}

/// Encode a file path for use as a single URL path segment.
///
/// The service resolves the path itself, so it must be sent exactly; paths
/// that are not valid UTF-8 are rejected rather than approximated.
pub fn encode_path(path: &Path) -> Result<String> {
    let text = path
        .to_str()
        .ok_or_else(|| PreingestError::UnencodablePath(path.to_path_buf()))?;
    Ok(URL_SAFE.encode(text.as_bytes()))
}

/// Blocking HTTP client for the utilities service.
///
/// The underlying `reqwest` client is built on first use, so a
/// `HttpFixityClient` can be created (and dropped unused) inside an async
/// runtime. `calculate` itself must run on a blocking thread.
pub struct HttpFixityClient {
    base_url: String,
    timeout: Duration,
    http: OnceLock<reqwest::blocking::Client>,
}

impl HttpFixityClient {
    pub fn new(endpoint: &ServiceEndpoint, timeout: Duration) -> Self {
        Self::with_base_url(endpoint.base_url(), timeout)
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.services.utilities, settings.request_timeout())
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            http: OnceLock::new(),
        }
    }

    fn http(&self) -> Result<&reqwest::blocking::Client> {
        if let Some(client) = self.http.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        Ok(self.http.get_or_init(|| client))
    }

    pub fn fixity_url(&self, algorithm: ChecksumAlgorithm, path: &Path) -> Result<String> {
        Ok(format!(
            "{}/fixity/{}/{}",
            self.base_url,
            algorithm.url_segment(),
            encode_path(path)?
        ))
    }
}

impl FixityClient for HttpFixityClient {
    fn calculate(&self, algorithm: ChecksumAlgorithm, path: &Path) -> Result<String> {
        let url = self.fixity_url(algorithm, path)?;
        tracing::debug!(%url, %algorithm, "requesting fixity calculation");

        let response = self.http()?.get(&url).send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            let hint = body.chars().take(500).collect::<String>();
            return Err(PreingestError::FixityService(format!(
                "{status} from {url}: {hint}"
            )));
        }
        Ok(parse_digest(&body))
    }
}

/// Accept either a bare digest or a JSON string literal.
fn parse_digest(body: &str) -> String {
    let trimmed = body.trim();
    match serde_json::from_str::<String>(trimmed) {
        Ok(s) => s.trim().to_string(),
        Err(_) => trimmed.to_string(),
    }
}
