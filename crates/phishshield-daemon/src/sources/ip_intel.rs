use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use phishshield_core::anonymity::{classify, is_private_or_reserved, IpIntelRecord};
use phishshield_core::signal::{SignalPayload, SourceId};
use serde::Deserialize;

use super::{join_url, SignalSource, SourceError, SubjectKind};

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(default)]
    org: Option<String>,
    #[serde(default)]
    privacy: Option<IpApiPrivacy>,
    #[serde(default)]
    error: Option<bool>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    reserved: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct IpApiPrivacy {
    #[serde(default)]
    vpn: Option<bool>,
    #[serde(default)]
    tor: Option<bool>,
}

/// Network anonymity detector backed by an ipapi-compatible lookup
/// (`GET {base}/{ip}/json/`).
#[derive(Debug, Clone)]
pub struct IpApiSource {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl IpApiSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            request_timeout,
        }
    }

    async fn lookup(&self, ip: IpAddr) -> Result<IpIntelRecord, SourceError> {
        let url = join_url(&self.base_url, &format!("{ip}/json/"));
        let body: IpApiResponse = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        // ipapi reports reserved ranges as an error; there is no provider data
        // to add, but the address itself is still classified.
        if body.reserved.unwrap_or(false) {
            return Ok(IpIntelRecord::default());
        }
        if body.error.unwrap_or(false) {
            return Err(SourceError::Malformed(
                body.reason.unwrap_or_else(|| "lookup rejected".to_string()),
            ));
        }
        let privacy = body.privacy.unwrap_or_default();
        Ok(IpIntelRecord {
            org: body.org,
            vpn: privacy.vpn.unwrap_or(false),
            tor: privacy.tor.unwrap_or(false),
        })
    }
}

#[async_trait]
impl SignalSource for IpApiSource {
    fn id(&self) -> SourceId {
        SourceId::IpIntel
    }

    fn subject_kind(&self) -> SubjectKind {
        SubjectKind::ClientIp
    }

    async fn evaluate(&self, subject: &str) -> Result<SignalPayload, SourceError> {
        let ip: IpAddr = subject
            .trim()
            .parse()
            .map_err(|_| SourceError::InvalidSubject(format!("not an IP address: {subject}")))?;
        if is_private_or_reserved(ip) {
            return Ok(SignalPayload::Anonymity(classify(ip, &IpIntelRecord::default())));
        }
        let record = self.lookup(ip).await?;
        Ok(SignalPayload::Anonymity(classify(ip, &record)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn provider(body: Value) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/:ip/json/", get(move || async move { Json(body) }));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn source(base: String) -> IpApiSource {
        IpApiSource::new(reqwest::Client::new(), base, Duration::from_secs(2))
    }

    fn report(payload: SignalPayload) -> phishshield_core::anonymity::AnonymityReport {
        match payload {
            SignalPayload::Anonymity(report) => report,
            other => unreachable!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn private_address_is_classified_without_a_lookup() {
        // Nothing listens here; a request would fail the evaluation.
        let src = source("http://127.0.0.1:9".to_string());
        let r = report(src.evaluate("10.0.0.7").await.unwrap());
        assert!(r.vpn);
        assert_eq!(r.risk, 30);
    }

    #[tokio::test]
    async fn reserved_answer_completes_with_address_rules_only() {
        let base = provider(json!({
            "ip": "198.18.0.1",
            "error": true,
            "reason": "Reserved IP Address",
            "reserved": true
        }))
        .await;
        let r = report(source(base).evaluate("198.18.0.1").await.unwrap());
        assert!(!r.vpn && !r.hosting && !r.tor);
        assert_eq!(r.risk, 0);
    }

    #[tokio::test]
    async fn rejected_lookup_is_an_error() {
        let base = provider(json!({"error": true, "reason": "RateLimited"})).await;
        let err = source(base).evaluate("8.8.8.8").await.unwrap_err();
        assert!(matches!(err, SourceError::Malformed(ref reason) if reason == "RateLimited"));
    }

    #[tokio::test]
    async fn provider_flags_are_scored() {
        let base = provider(json!({
            "ip": "8.8.8.8",
            "org": "Example Cloud Hosting",
            "privacy": {"vpn": true, "tor": true}
        }))
        .await;
        let r = report(source(base).evaluate("8.8.8.8").await.unwrap());
        assert!(r.vpn && r.tor && r.hosting);
        assert_eq!(r.risk, 20 + 40 + 50);
    }
}
