//! Signal source adapters.
//!
//! Every adapter implements [`SignalSource`] and returns either a typed
//! payload or a [`SourceError`]. Errors never cross the adapter boundary as
//! faults: [`evaluate_bounded`] turns them, timeouts and panics into
//! non-completed [`SignalOutcome`]s.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use phishshield_core::error::ScanError;
use phishshield_core::signal::{SignalOutcome, SignalPayload, SourceId};
use thiserror::Error;

pub mod ip_intel;
pub mod safe_browsing;
pub mod virustotal;

pub use ip_intel::IpApiSource;
pub use safe_browsing::SafeBrowsingSource;
pub use virustotal::{VirusTotalClient, VirusTotalFileSource, VirusTotalUrlSource};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no credential configured")]
    MissingCredential,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("invalid subject: {0}")]
    InvalidSubject(String),
}

impl SourceError {
    pub fn unavailable(self, source_id: SourceId) -> ScanError {
        ScanError::SourceUnavailable {
            source_id,
            reason: self.to_string(),
        }
    }
}

/// What an adapter wants to be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    ClientIp,
    Url,
    FileHash,
}

#[async_trait]
pub trait SignalSource: Send + Sync {
    fn id(&self) -> SourceId;

    fn subject_kind(&self) -> SubjectKind;

    async fn evaluate(&self, subject: &str) -> Result<SignalPayload, SourceError>;
}

pub type DynSource = Arc<dyn SignalSource>;

/// Runs one adapter on its own task under `timeout`. Expiry aborts only this
/// adapter's task.
pub async fn evaluate_bounded(
    source: DynSource,
    subject: String,
    timeout: Duration,
) -> SignalOutcome {
    let id = source.id();
    let mut task = tokio::spawn(async move { source.evaluate(&subject).await });
    match tokio::time::timeout(timeout, &mut task).await {
        Err(_) => {
            task.abort();
            tracing::warn!(source = %id, timeout_ms = timeout.as_millis() as u64, "signal source timed out");
            SignalOutcome::timed_out(id)
        }
        Ok(Err(join_err)) => {
            tracing::warn!(source = %id, error = %join_err, "signal source task failed");
            SignalOutcome::failed(id, "adapter task failed")
        }
        Ok(Ok(Err(err))) => {
            let reason = err.to_string();
            tracing::warn!(error = %err.unavailable(id), "signal source unavailable");
            SignalOutcome::failed(id, reason)
        }
        Ok(Ok(Ok(payload))) => SignalOutcome::completed(id, payload),
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use phishshield_core::signal::SignalStatus;

    struct Fixed(Result<bool, ()>, Duration);

    #[async_trait]
    impl SignalSource for Fixed {
        fn id(&self) -> SourceId {
            SourceId::SafeBrowsing
        }

        fn subject_kind(&self) -> SubjectKind {
            SubjectKind::Url
        }

        async fn evaluate(&self, _subject: &str) -> Result<SignalPayload, SourceError> {
            tokio::time::sleep(self.1).await;
            self.0
                .map(SignalPayload::Flagged)
                .map_err(|_| SourceError::MissingCredential)
        }
    }

    #[tokio::test]
    async fn timeout_yields_timed_out() {
        let source: DynSource = Arc::new(Fixed(Ok(true), Duration::from_secs(5)));
        let outcome =
            evaluate_bounded(source, "http://x".to_string(), Duration::from_millis(20)).await;
        assert_eq!(outcome.status, SignalStatus::TimedOut);
    }

    #[tokio::test]
    async fn error_yields_failed_with_reason() {
        let source: DynSource = Arc::new(Fixed(Err(()), Duration::ZERO));
        let outcome =
            evaluate_bounded(source, "http://x".to_string(), Duration::from_secs(1)).await;
        assert_eq!(
            outcome.status,
            SignalStatus::Failed {
                reason: "no credential configured".to_string()
            }
        );
    }

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("https://a.example/", "/x/y"), "https://a.example/x/y");
        assert_eq!(join_url("http://127.0.0.1:9", "x"), "http://127.0.0.1:9/x");
    }
}
