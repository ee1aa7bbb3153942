use std::time::Duration;

use async_trait::async_trait;
use phishshield_core::signal::{SignalPayload, SourceId};
use serde::Deserialize;

use super::{join_url, SignalSource, SourceError, SubjectKind};

const API_KEY_HEADER: &str = "x-apikey";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct SubmittedAnalysis {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Analysis {
    attributes: AnalysisAttributes,
}

#[derive(Debug, Deserialize)]
struct AnalysisAttributes {
    stats: EngineStats,
}

#[derive(Debug, Deserialize)]
struct FileReport {
    attributes: FileAttributes,
}

#[derive(Debug, Deserialize)]
struct FileAttributes {
    last_analysis_stats: EngineStats,
}

#[derive(Debug, Default, Deserialize)]
struct EngineStats {
    #[serde(default)]
    malicious: u64,
}

/// Shared VirusTotal v3 plumbing for the URL and file-hash sources.
#[derive(Debug, Clone)]
pub struct VirusTotalClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl VirusTotalClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            request_timeout,
        }
    }

    fn key(&self) -> Result<&str, SourceError> {
        self.api_key.as_deref().ok_or(SourceError::MissingCredential)
    }

    async fn submit_url(&self, url: &str) -> Result<String, SourceError> {
        let submitted: Envelope<SubmittedAnalysis> = self
            .client
            .post(join_url(&self.base_url, "api/v3/urls"))
            .header(API_KEY_HEADER, self.key()?)
            .timeout(self.request_timeout)
            .form(&[("url", url)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if submitted.data.id.is_empty() {
            return Err(SourceError::Malformed("empty analysis id".to_string()));
        }
        Ok(submitted.data.id)
    }

    async fn analysis_malicious(&self, analysis_id: &str) -> Result<u64, SourceError> {
        let report: Envelope<Analysis> = self
            .client
            .get(join_url(&self.base_url, &format!("api/v3/analyses/{analysis_id}")))
            .header(API_KEY_HEADER, self.key()?)
            .timeout(self.request_timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(report.data.attributes.stats.malicious)
    }

    async fn file_malicious(&self, sha256_hex: &str) -> Result<u64, SourceError> {
        let report: Envelope<FileReport> = self
            .client
            .get(join_url(&self.base_url, &format!("api/v3/files/{sha256_hex}")))
            .header(API_KEY_HEADER, self.key()?)
            .timeout(self.request_timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(report.data.attributes.last_analysis_stats.malicious)
    }
}

/// Reputation source B: submit the link, wait, then read the analysis once.
#[derive(Debug, Clone)]
pub struct VirusTotalUrlSource {
    vt: VirusTotalClient,
    poll_delay: Duration,
}

impl VirusTotalUrlSource {
    pub fn new(vt: VirusTotalClient, poll_delay: Duration) -> Self {
        Self { vt, poll_delay }
    }
}

#[async_trait]
impl SignalSource for VirusTotalUrlSource {
    fn id(&self) -> SourceId {
        SourceId::VirusTotalUrl
    }

    fn subject_kind(&self) -> SubjectKind {
        SubjectKind::Url
    }

    async fn evaluate(&self, subject: &str) -> Result<SignalPayload, SourceError> {
        let analysis_id = self.vt.submit_url(subject).await?;
        tokio::time::sleep(self.poll_delay).await;
        let malicious = self.vt.analysis_malicious(&analysis_id).await?;
        Ok(SignalPayload::Flagged(malicious > 0))
    }
}

/// Hash reputation for uploaded APKs.
#[derive(Debug, Clone)]
pub struct VirusTotalFileSource {
    vt: VirusTotalClient,
}

impl VirusTotalFileSource {
    pub fn new(vt: VirusTotalClient) -> Self {
        Self { vt }
    }
}

#[async_trait]
impl SignalSource for VirusTotalFileSource {
    fn id(&self) -> SourceId {
        SourceId::VirusTotalFile
    }

    fn subject_kind(&self) -> SubjectKind {
        SubjectKind::FileHash
    }

    async fn evaluate(&self, subject: &str) -> Result<SignalPayload, SourceError> {
        if subject.len() != 64 || !subject.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SourceError::InvalidSubject("expected a sha256 hex digest".to_string()));
        }
        let malicious = self.vt.file_malicious(subject).await?;
        Ok(SignalPayload::Flagged(malicious > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_stats_default_missing_counts_to_zero() {
        let parsed: Envelope<Analysis> =
            serde_json::from_str(r#"{"data":{"attributes":{"stats":{"harmless":3}}}}"#).unwrap();
        assert_eq!(parsed.data.attributes.stats.malicious, 0);
    }

    #[tokio::test]
    async fn file_source_rejects_non_digest_subject() {
        let vt = VirusTotalClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            Some("k".to_string()),
            Duration::from_millis(50),
        );
        let err = VirusTotalFileSource::new(vt).evaluate("abc").await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidSubject(_)));
    }
}
