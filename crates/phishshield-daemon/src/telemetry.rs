use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use phishshield_core::signal::AggregateResult;

const LATENCY_BUCKETS_MS: [u64; 10] = [5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000];

#[derive(Debug, Default)]
struct TelemetryState {
    scans_total: HashMap<(String, String), u64>,
    source_outcomes_total: HashMap<(String, String), u64>,
    scan_latency_ms_bucket: BTreeMap<u64, u64>,
    request_failures_total: HashMap<String, u64>,
    flagged_entries_total: u64,
}

/// Process counters rendered in Prometheus text format at `GET /metrics`.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    state: Arc<Mutex<TelemetryState>>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_scan(&self, endpoint: &str, verdict: &str) {
        let mut guard = self.state.lock();
        let entry = guard
            .scans_total
            .entry((endpoint.to_string(), verdict.to_string()))
            .or_insert(0);
        *entry = entry.saturating_add(1);
    }

    pub fn record_source_outcomes(&self, result: &AggregateResult) {
        let mut guard = self.state.lock();
        for outcome in result.iter() {
            let entry = guard
                .source_outcomes_total
                .entry((
                    outcome.source.as_str().to_string(),
                    outcome.status.as_str().to_string(),
                ))
                .or_insert(0);
            *entry = entry.saturating_add(1);
        }
    }

    pub fn record_source_outcome(&self, source: &str, status: &str) {
        let mut guard = self.state.lock();
        let entry = guard
            .source_outcomes_total
            .entry((source.to_string(), status.to_string()))
            .or_insert(0);
        *entry = entry.saturating_add(1);
    }

    pub fn record_scan_latency_ms(&self, latency_ms: u64) {
        let mut guard = self.state.lock();
        let bucket = LATENCY_BUCKETS_MS
            .into_iter()
            .find(|bound| latency_ms <= *bound)
            .unwrap_or(u64::MAX);
        let entry = guard.scan_latency_ms_bucket.entry(bucket).or_insert(0);
        *entry = entry.saturating_add(1);
    }

    pub fn record_request_failure(&self, kind: &str) {
        let mut guard = self.state.lock();
        let entry = guard
            .request_failures_total
            .entry(kind.to_string())
            .or_insert(0);
        *entry = entry.saturating_add(1);
    }

    pub fn record_flagged_entry(&self) {
        let mut guard = self.state.lock();
        guard.flagged_entries_total = guard.flagged_entries_total.saturating_add(1);
    }

    pub fn render(&self) -> String {
        let guard = self.state.lock();
        let mut out = String::new();
        out.push_str("# TYPE phishshield_scans_total counter\n");
        for ((endpoint, verdict), value) in sorted(&guard.scans_total) {
            let _ = writeln!(
                out,
                "phishshield_scans_total{{endpoint=\"{}\",verdict=\"{}\"}} {}",
                endpoint, verdict, value
            );
        }
        out.push_str("# TYPE phishshield_source_outcomes_total counter\n");
        for ((source, status), value) in sorted(&guard.source_outcomes_total) {
            let _ = writeln!(
                out,
                "phishshield_source_outcomes_total{{source=\"{}\",status=\"{}\"}} {}",
                source, status, value
            );
        }
        out.push_str("# TYPE phishshield_scan_latency_ms_bucket counter\n");
        for (bucket, value) in &guard.scan_latency_ms_bucket {
            let bucket_label = if *bucket == u64::MAX {
                "+Inf".to_string()
            } else {
                bucket.to_string()
            };
            let _ = writeln!(
                out,
                "phishshield_scan_latency_ms_bucket{{le=\"{}\"}} {}",
                bucket_label, value
            );
        }
        out.push_str("# TYPE phishshield_request_failures_total counter\n");
        for (kind, value) in sorted(&guard.request_failures_total) {
            let _ = writeln!(
                out,
                "phishshield_request_failures_total{{kind=\"{}\"}} {}",
                kind, value
            );
        }
        out.push_str("# TYPE phishshield_flagged_entries_total counter\n");
        let _ = writeln!(
            out,
            "phishshield_flagged_entries_total {}",
            guard.flagged_entries_total
        );
        out
    }
}

fn sorted<K: Ord + Clone, V: Copy>(map: &HashMap<K, V>) -> Vec<(K, V)> {
    let mut items: Vec<(K, V)> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
    items.sort_by(|a, b| a.0.cmp(&b.0));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use phishshield_core::signal::{SignalOutcome, SourceId};

    #[test]
    fn renders_source_outcomes_by_status() {
        let telemetry = Telemetry::new();
        telemetry.record_source_outcomes(&AggregateResult::from_outcomes(vec![
            SignalOutcome::timed_out(SourceId::SafeBrowsing),
            SignalOutcome::flagged(SourceId::LexicalHeuristic, true),
        ]));
        telemetry.record_scan("scan_link", "suspicious");
        telemetry.record_scan_latency_ms(7_000);
        let text = telemetry.render();
        assert!(text.contains(
            "phishshield_source_outcomes_total{source=\"safe_browsing\",status=\"timed_out\"} 1"
        ));
        assert!(text.contains(
            "phishshield_scans_total{endpoint=\"scan_link\",verdict=\"suspicious\"} 1"
        ));
        assert!(text.contains("phishshield_scan_latency_ms_bucket{le=\"+Inf\"} 1"));
    }
}
