use std::sync::Arc;
use std::time::Duration;

use phishshield_core::anonymity::AnonymityReport;
use phishshield_core::apk::{ApkAction, ApkVerdict};
use phishshield_core::error::ScanResult;
use phishshield_core::ledger::{Clock, FlagLedger, FlaggedEntry, LedgerSnapshot, SystemClock};
use phishshield_core::policy::{decide, Action, RiskScore, Verdict};
use phishshield_core::presentation::{Presentation, SessionGuard};
use phishshield_core::signal::{SignalOutcome, SourceId};
use phishshield_core::subject::Subject;
use serde::Serialize;

use crate::aggregator::Aggregator;
use crate::config::DaemonConfig;
use crate::sources::{
    evaluate_bounded, DynSource, IpApiSource, SafeBrowsingSource, VirusTotalClient,
    VirusTotalFileSource, VirusTotalUrlSource,
};
use crate::telemetry::Telemetry;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LinkScanReport {
    pub verdict: Verdict,
    pub risk_score: RiskScore,
    pub action: Action,
    pub dns_block: bool,
    pub block_domain: Option<String>,
    pub network_security: AnonymityReport,
    pub explanation: Vec<String>,
    pub warning_text: String,
    pub voice_alert: String,
    pub session_guard: SessionGuard,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApkScanReport {
    pub hash: String,
    pub verdict: ApkVerdict,
    pub action: ApkAction,
}

/// Aggregate, decide, record, present.
pub struct ScanService {
    aggregator: Aggregator,
    hash_source: Option<(DynSource, Duration)>,
    ledger: Arc<dyn FlagLedger>,
    clock: Arc<dyn Clock>,
    telemetry: Telemetry,
    default_lang: String,
}

impl ScanService {
    pub fn new(aggregator: Aggregator, ledger: Arc<dyn FlagLedger>) -> Self {
        Self {
            aggregator,
            hash_source: None,
            ledger,
            clock: Arc::new(SystemClock),
            telemetry: Telemetry::new(),
            default_lang: phishshield_core::presentation::DEFAULT_LANG.to_string(),
        }
    }

    /// Wires the production providers from `cfg`.
    pub fn from_config(
        cfg: &DaemonConfig,
        ledger: Arc<dyn FlagLedger>,
        telemetry: Telemetry,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("phishshield/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let ip_intel = IpApiSource::new(
            client.clone(),
            cfg.ip_intel_url.clone(),
            Duration::from_millis(cfg.ip_intel_timeout_ms),
        );
        let safe_browsing = SafeBrowsingSource::new(
            client.clone(),
            cfg.safe_browsing_url.clone(),
            cfg.safe_browsing_api_key.clone(),
            Duration::from_millis(cfg.safe_browsing_timeout_ms),
        );
        let vt = VirusTotalClient::new(
            client,
            cfg.virustotal_url.clone(),
            cfg.virustotal_api_key.clone(),
            Duration::from_millis(cfg.virustotal_timeout_ms),
        );
        let vt_url = VirusTotalUrlSource::new(
            vt.clone(),
            Duration::from_millis(cfg.virustotal_poll_delay_ms),
        );

        let aggregator = Aggregator::new()
            .with_source(
                Arc::new(ip_intel),
                Duration::from_millis(cfg.ip_intel_timeout_ms),
            )
            .with_source(
                Arc::new(safe_browsing),
                Duration::from_millis(cfg.safe_browsing_timeout_ms),
            )
            .with_source(Arc::new(vt_url), cfg.virustotal_url_budget());

        Ok(Self::new(aggregator, ledger)
            .with_hash_source(
                Arc::new(VirusTotalFileSource::new(vt)),
                Duration::from_millis(cfg.hash_lookup_timeout_ms),
            )
            .with_telemetry(telemetry)
            .with_default_lang(cfg.default_lang.clone()))
    }

    pub fn with_hash_source(mut self, source: DynSource, timeout: Duration) -> Self {
        self.hash_source = Some((source, timeout));
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_default_lang(mut self, lang: impl Into<String>) -> Self {
        self.default_lang = lang.into();
        self
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub async fn scan_link(
        &self,
        link: &str,
        lang: Option<&str>,
        client_ip: Option<&str>,
    ) -> ScanResult<LinkScanReport> {
        let subject = Subject::url(link)?;
        let domain = subject.normalized_domain().unwrap_or_default();

        let result = self.aggregator.aggregate(subject.as_str(), client_ip).await;
        self.telemetry.record_source_outcomes(&result);
        let decision = decide(result);

        if let Some(entry) =
            FlaggedEntry::from_decision(subject.as_str(), &domain, &decision, self.clock.now())
        {
            self.ledger.record(entry);
            self.telemetry.record_flagged_entry();
        }
        self.telemetry.record_scan("scan_link", decision.verdict.as_str());

        tracing::info!(
            target: "phishshield.scan.audit",
            domain = %domain,
            verdict = %decision.verdict,
            risk_score = decision.risk_score.value(),
            reasons = decision.explanation.len(),
            "link scan verdict"
        );

        let presentation = Presentation::for_verdict(
            decision.verdict,
            lang.unwrap_or(self.default_lang.as_str()),
            &self.default_lang,
        );
        Ok(LinkScanReport {
            verdict: decision.verdict,
            risk_score: decision.risk_score,
            action: decision.action(),
            dns_block: decision.dns_block(),
            block_domain: decision.block_domain(&domain).map(str::to_string),
            network_security: decision.network,
            explanation: decision.explanation,
            warning_text: presentation.warning_text,
            voice_alert: presentation.voice_alert,
            session_guard: presentation.session_guard,
        })
    }

    pub async fn scan_apk(&self, content: &[u8]) -> ScanResult<ApkScanReport> {
        let subject = Subject::file(content)?;
        let outcome = match &self.hash_source {
            Some((source, timeout)) => {
                evaluate_bounded(source.clone(), subject.as_str().to_string(), *timeout).await
            }
            None => SignalOutcome::failed(SourceId::VirusTotalFile, "no hash source configured"),
        };
        self.telemetry
            .record_source_outcome(outcome.source.as_str(), outcome.status.as_str());

        let verdict = ApkVerdict::from_outcome(&outcome);
        self.telemetry.record_scan("scan_apk", verdict.as_str());
        tracing::info!(
            target: "phishshield.scan.audit",
            hash = %subject.as_str(),
            verdict = verdict.as_str(),
            lookup = outcome.status.as_str(),
            "apk scan verdict"
        );
        Ok(ApkScanReport {
            hash: subject.as_str().to_string(),
            verdict,
            action: verdict.action(),
        })
    }

    pub fn flagged(&self) -> LedgerSnapshot {
        self.ledger.list()
    }
}
