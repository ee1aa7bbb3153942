use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::policy::{Decision, Verdict};

/// A recorded non-safe verdict. Entries are never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedEntry {
    pub url: String,
    pub domain: String,
    pub verdict: Verdict,
    pub risk: u8,
    pub time: DateTime<Utc>,
}

impl FlaggedEntry {
    /// Returns `None` for a Safe decision; only non-safe verdicts are recorded.
    pub fn from_decision(
        url: &str,
        domain: &str,
        decision: &Decision,
        time: DateTime<Utc>,
    ) -> Option<Self> {
        if decision.verdict == Verdict::Safe {
            return None;
        }
        Some(Self {
            url: url.to_string(),
            domain: domain.to_string(),
            verdict: decision.verdict,
            risk: decision.risk_score.value(),
            time,
        })
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Immutable view of the ledger at one point in time.
pub type LedgerSnapshot = Arc<Vec<FlaggedEntry>>;

/// Append-only store of flagged entries.
pub trait FlagLedger: Send + Sync {
    fn record(&self, entry: FlaggedEntry);

    /// Entries in insertion order. Appends that happen after the call are not
    /// visible in the returned snapshot.
    fn list(&self) -> LedgerSnapshot;

    fn len(&self) -> usize {
        self.list().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Copy-on-write ledger. The lock is held only to push or to clone the
/// `Arc`; iterating a snapshot never blocks a writer. No eviction.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: Mutex<LedgerSnapshot>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<FlaggedEntry>) -> Self {
        Self {
            entries: Mutex::new(Arc::new(entries)),
        }
    }
}

impl FlagLedger for InMemoryLedger {
    fn record(&self, entry: FlaggedEntry) {
        let mut guard = self.entries.lock();
        // Clones the vector only while an outstanding snapshot shares it.
        Arc::make_mut(&mut guard).push(entry);
    }

    fn list(&self) -> LedgerSnapshot {
        self.entries.lock().clone()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RiskScore;
    use crate::anonymity::AnonymityReport;
    use chrono::TimeZone;

    fn decision(verdict: Verdict, score: u32) -> Decision {
        Decision {
            verdict,
            risk_score: RiskScore::from_total(score),
            explanation: Vec::new(),
            network: AnonymityReport::default(),
        }
    }

    fn entry(n: usize) -> FlaggedEntry {
        FlaggedEntry {
            url: format!("http://host{n}.example/login"),
            domain: format!("host{n}.example"),
            verdict: Verdict::Suspicious,
            risk: 20,
            time: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn safe_decision_produces_no_entry() {
        let now = Utc::now();
        assert!(FlaggedEntry::from_decision("u", "d", &decision(Verdict::Safe, 50), now).is_none());
        let e = FlaggedEntry::from_decision("u", "d", &decision(Verdict::Dangerous, 90), now)
            .unwrap();
        assert_eq!(e.risk, 90);
        assert_eq!(e.verdict, Verdict::Dangerous);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_appends() {
        let ledger = InMemoryLedger::new();
        ledger.record(entry(0));
        let snapshot = ledger.list();
        ledger.record(entry(1));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(ledger.list().len(), 2);
        assert_eq!(ledger.list()[1], entry(1));
    }

    #[test]
    fn concurrent_appends_are_all_kept() {
        let ledger = Arc::new(InMemoryLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        ledger.record(entry(t * 100 + i));
                        let _ = ledger.list();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ledger.len(), 400);
    }

    #[test]
    fn entry_serializes_with_rfc3339_time() {
        let json = serde_json::to_value(entry(3)).unwrap();
        assert_eq!(json["verdict"], "suspicious");
        assert_eq!(json["domain"], "host3.example");
        assert_eq!(json["time"], "2023-11-14T22:13:20Z");
    }
}
