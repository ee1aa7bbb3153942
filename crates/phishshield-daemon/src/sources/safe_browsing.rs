use std::time::Duration;

use async_trait::async_trait;
use phishshield_core::signal::{SignalPayload, SourceId};
use serde_json::{json, Value};

use super::{join_url, SignalSource, SourceError, SubjectKind};

const CLIENT_ID: &str = "phishshield";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reputation source A: Safe Browsing v4 `threatMatches:find`. A single call;
/// the link is flagged when the response carries a `matches` key.
#[derive(Debug, Clone)]
pub struct SafeBrowsingSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl SafeBrowsingSource {
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
}

fn lookup_body(url: &str) -> Value {
    json!({
        "client": {"clientId": CLIENT_ID, "clientVersion": CLIENT_VERSION},
        "threatInfo": {
            "threatTypes": ["MALWARE", "SOCIAL_ENGINEERING"],
            "platformTypes": ["ANY_PLATFORM"],
            "threatEntryTypes": ["URL"],
            "threatEntries": [{"url": url}]
        }
    })
}

#[async_trait]
impl SignalSource for SafeBrowsingSource {
    fn id(&self) -> SourceId {
        SourceId::SafeBrowsing
    }

    fn subject_kind(&self) -> SubjectKind {
        SubjectKind::Url
    }

    async fn evaluate(&self, subject: &str) -> Result<SignalPayload, SourceError> {
        let key = self.api_key.as_deref().ok_or(SourceError::MissingCredential)?;
        let body: Value = self
            .client
            .post(join_url(&self.base_url, "v4/threatMatches:find"))
            .query(&[("key", key)])
            .timeout(self.request_timeout)
            .json(&lookup_body(subject))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !body.is_object() {
            return Err(SourceError::Malformed("expected a JSON object".to_string()));
        }
        Ok(SignalPayload::Flagged(body.get("matches").is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_body_carries_the_link() {
        let body = lookup_body("http://evil.example/");
        assert_eq!(body["threatInfo"]["threatEntries"][0]["url"], "http://evil.example/");
        assert_eq!(body["client"]["clientId"], "phishshield");
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let source = SafeBrowsingSource::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            None,
            Duration::from_millis(50),
        );
        let err = source.evaluate("http://x.example").await.unwrap_err();
        assert!(matches!(err, SourceError::MissingCredential));
    }
}
