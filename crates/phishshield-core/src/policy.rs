use std::fmt;

use serde::{Deserialize, Serialize};

use crate::anonymity::AnonymityReport;
use crate::signal::{AggregateResult, SourceId};

pub const SAFE_BROWSING_RISK: u32 = 50;
pub const VIRUSTOTAL_URL_RISK: u32 = 40;
pub const HEURISTIC_RISK: u32 = 20;

pub const HEURISTIC_REASON: &str = "Credential-harvesting pattern detected";
pub const ANONYMIZED_REASON: &str = "Anonymized network detected";

/// Ordered so that `Dangerous > Suspicious > Safe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Safe,
    Suspicious,
    Dangerous,
}

impl Verdict {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Suspicious => "suspicious",
            Self::Dangerous => "dangerous",
        }
    }

    pub const fn action(self) -> Action {
        match self {
            Self::Safe => Action::Allow,
            Self::Suspicious => Action::Warn,
            Self::Dangerous => Action::Block,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Warn,
    Block,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Warn => "warn",
            Self::Block => "block",
        }
    }
}

/// Risk score in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(u8);

impl RiskScore {
    pub const MAX: u8 = 100;

    pub fn from_total(total: u32) -> Self {
        Self(total.min(u32::from(Self::MAX)) as u8)
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    pub risk_score: RiskScore,
    pub explanation: Vec<String>,
    /// Report from the anonymity detector, zeroed when it did not complete.
    pub network: AnonymityReport,
}

impl Decision {
    pub fn action(&self) -> Action {
        self.verdict.action()
    }

    pub fn dns_block(&self) -> bool {
        self.verdict == Verdict::Dangerous
    }

    pub fn block_domain<'a>(&self, domain: &'a str) -> Option<&'a str> {
        self.dns_block().then_some(domain)
    }
}

struct Contribution {
    rank: u8,
    risk: u32,
    reason: String,
}

/// Computes verdict, clamped score and explanation from the collected
/// outcomes.
///
/// The verdict is decided by the first matching rule: Safe Browsing, then
/// VirusTotal, then the lexical heuristic. The anonymity contribution is
/// scored independently, so a Safe verdict can carry a non-zero score.
/// Outcomes that did not complete contribute nothing.
pub fn decide(result: AggregateResult) -> Decision {
    let mut contributions = Vec::with_capacity(2);

    let verdict = if result.is_flagged(SourceId::SafeBrowsing) {
        contributions.push(flagged_by(SourceId::SafeBrowsing, SAFE_BROWSING_RISK));
        Verdict::Dangerous
    } else if result.is_flagged(SourceId::VirusTotalUrl) {
        contributions.push(flagged_by(SourceId::VirusTotalUrl, VIRUSTOTAL_URL_RISK));
        Verdict::Dangerous
    } else if result.is_flagged(SourceId::LexicalHeuristic) {
        contributions.push(Contribution {
            rank: SourceId::LexicalHeuristic.explanation_rank(),
            risk: HEURISTIC_RISK,
            reason: HEURISTIC_REASON.to_string(),
        });
        Verdict::Suspicious
    } else {
        Verdict::Safe
    };

    let network = result.anonymity().copied().unwrap_or_default();
    if network.is_anonymized() {
        contributions.push(Contribution {
            rank: SourceId::IpIntel.explanation_rank(),
            risk: network.risk,
            reason: ANONYMIZED_REASON.to_string(),
        });
    }

    contributions.sort_by_key(|c| c.rank);
    let total = contributions
        .iter()
        .fold(0u32, |acc, c| acc.saturating_add(c.risk));

    Decision {
        verdict,
        risk_score: RiskScore::from_total(total),
        explanation: contributions.into_iter().map(|c| c.reason).collect(),
        network,
    }
}

fn flagged_by(source: SourceId, risk: u32) -> Contribution {
    Contribution {
        rank: source.explanation_rank(),
        risk,
        reason: format!("Flagged by {}", source.label()),
    }
}
