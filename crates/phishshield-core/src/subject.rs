use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{ScanError, ScanResult};

/// The thing being evaluated. Derived values such as the normalized domain
/// are computed on demand and never stored back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Url(String),
    FileHash(String),
}

impl Subject {
    /// A link as received. Blank links are rejected at the boundary.
    pub fn url(link: &str) -> ScanResult<Self> {
        if link.trim().is_empty() {
            return Err(ScanError::MissingInput("link"));
        }
        Ok(Self::Url(link.to_string()))
    }

    /// Digests raw file bytes into a file-hash subject.
    pub fn file(content: &[u8]) -> ScanResult<Self> {
        if content.is_empty() {
            return Err(ScanError::MissingInput("apk"));
        }
        Ok(Self::FileHash(sha256_hex(content)))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(v) | Self::FileHash(v) => v,
        }
    }

    pub fn normalized_domain(&self) -> Option<String> {
        match self {
            Self::Url(link) => Some(normalize_domain(link)),
            Self::FileHash(_) => None,
        }
    }
}

/// Host of the link, lowercased. Falls back to a best-effort split when the
/// link does not parse.
pub fn normalize_domain(link: &str) -> String {
    match parse_host(link) {
        Ok(host) => host,
        Err(_) => fallback_domain(link),
    }
}

fn parse_host(link: &str) -> ScanResult<String> {
    let parsed = Url::parse(link.trim()).map_err(|e| ScanError::MalformedSubject(e.to_string()))?;
    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.trim_end_matches('.').to_lowercase())
        .ok_or_else(|| ScanError::MalformedSubject("link has no host".to_string()))
}

fn fallback_domain(link: &str) -> String {
    let after_scheme = link.rsplit("//").next().unwrap_or(link);
    after_scheme
        .split('/')
        .next()
        .unwrap_or(after_scheme)
        .trim()
        .to_lowercase()
}

pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}
