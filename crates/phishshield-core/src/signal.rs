use std::fmt;

use serde::{Deserialize, Serialize};

use crate::anonymity::AnonymityReport;

/// Identifies one signal source. The declaration order is not significant;
/// explanation order comes from [`SourceId::explanation_rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    IpIntel,
    SafeBrowsing,
    VirusTotalUrl,
    LexicalHeuristic,
    VirusTotalFile,
}

impl SourceId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IpIntel => "ip_intel",
            Self::SafeBrowsing => "safe_browsing",
            Self::VirusTotalUrl => "virustotal_url",
            Self::LexicalHeuristic => "lexical_heuristic",
            Self::VirusTotalFile => "virustotal_file",
        }
    }

    /// Human name used in explanation strings.
    pub const fn label(self) -> &'static str {
        match self {
            Self::IpIntel => "IP intelligence",
            Self::SafeBrowsing => "Google Safe Browsing",
            Self::VirusTotalUrl | Self::VirusTotalFile => "VirusTotal",
            Self::LexicalHeuristic => "local heuristic",
        }
    }

    /// Anonymity first, then reputation A, reputation B, heuristic.
    pub const fn explanation_rank(self) -> u8 {
        match self {
            Self::IpIntel => 0,
            Self::SafeBrowsing => 1,
            Self::VirusTotalUrl => 2,
            Self::LexicalHeuristic => 3,
            Self::VirusTotalFile => 4,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalPayload {
    Flagged(bool),
    Anonymity(AnonymityReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalStatus {
    Completed(SignalPayload),
    TimedOut,
    Failed { reason: String },
}

impl SignalStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::TimedOut => "timed_out",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalOutcome {
    pub source: SourceId,
    pub status: SignalStatus,
}

impl SignalOutcome {
    pub fn completed(source: SourceId, payload: SignalPayload) -> Self {
        Self {
            source,
            status: SignalStatus::Completed(payload),
        }
    }

    pub fn flagged(source: SourceId, flagged: bool) -> Self {
        Self::completed(source, SignalPayload::Flagged(flagged))
    }

    pub fn timed_out(source: SourceId) -> Self {
        Self {
            source,
            status: SignalStatus::TimedOut,
        }
    }

    pub fn failed(source: SourceId, reason: impl Into<String>) -> Self {
        Self {
            source,
            status: SignalStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn payload(&self) -> Option<&SignalPayload> {
        match &self.status {
            SignalStatus::Completed(payload) => Some(payload),
            SignalStatus::TimedOut | SignalStatus::Failed { .. } => None,
        }
    }

    /// True only for a completed boolean signal that fired.
    pub fn is_flagged(&self) -> bool {
        matches!(self.payload(), Some(SignalPayload::Flagged(true)))
    }
}

/// One outcome per dispatched source, in dispatch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateResult {
    outcomes: Vec<SignalOutcome>,
}

impl AggregateResult {
    /// Builds the result for `dispatched` sources. Outcomes for sources that
    /// were not dispatched are dropped, a repeated source keeps its first
    /// outcome, and a dispatched source with no outcome is recorded as failed.
    pub fn collect<I>(dispatched: &[SourceId], outcomes: I) -> Self
    where
        I: IntoIterator<Item = SignalOutcome>,
    {
        let mut slots: Vec<Option<SignalOutcome>> = vec![None; dispatched.len()];
        for outcome in outcomes {
            let Some(idx) = dispatched.iter().position(|s| *s == outcome.source) else {
                continue;
            };
            if slots[idx].is_none() {
                slots[idx] = Some(outcome);
            }
        }
        let outcomes = dispatched
            .iter()
            .zip(slots)
            .map(|(source, slot)| {
                slot.unwrap_or_else(|| SignalOutcome::failed(*source, "no outcome reported"))
            })
            .collect();
        Self { outcomes }
    }

    /// Dispatch order is the order of first appearance.
    pub fn from_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = SignalOutcome>,
    {
        let outcomes: Vec<SignalOutcome> = outcomes.into_iter().collect();
        let mut dispatched = Vec::with_capacity(outcomes.len());
        for outcome in &outcomes {
            if !dispatched.contains(&outcome.source) {
                dispatched.push(outcome.source);
            }
        }
        Self::collect(&dispatched, outcomes)
    }

    pub fn get(&self, source: SourceId) -> Option<&SignalOutcome> {
        self.outcomes.iter().find(|o| o.source == source)
    }

    pub fn is_flagged(&self, source: SourceId) -> bool {
        self.get(source).is_some_and(SignalOutcome::is_flagged)
    }

    /// The anonymity report, if the IP intelligence source completed.
    pub fn anonymity(&self) -> Option<&AnonymityReport> {
        match self.get(SourceId::IpIntel)?.payload()? {
            SignalPayload::Anonymity(report) => Some(report),
            SignalPayload::Flagged(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalOutcome> {
        self.outcomes.iter()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
