use serde::Serialize;

use crate::signal::SignalOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApkVerdict {
    Clean,
    Malicious,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApkAction {
    AllowInstall,
    BlockInstall,
}

impl ApkVerdict {
    /// Only a completed, flagged hash lookup is malicious. A failed or timed
    /// out lookup is reported clean.
    pub fn from_outcome(outcome: &SignalOutcome) -> Self {
        if outcome.is_flagged() {
            Self::Malicious
        } else {
            Self::Clean
        }
    }

    pub const fn action(self) -> ApkAction {
        match self {
            Self::Clean => ApkAction::AllowInstall,
            Self::Malicious => ApkAction::BlockInstall,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Malicious => "malicious",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SourceId;

    #[test]
    fn unavailable_lookup_fails_open() {
        let verdict = ApkVerdict::from_outcome(&SignalOutcome::timed_out(SourceId::VirusTotalFile));
        assert_eq!(verdict, ApkVerdict::Clean);
        assert_eq!(verdict.action(), ApkAction::AllowInstall);
    }

    #[test]
    fn flagged_lookup_blocks_install() {
        let verdict =
            ApkVerdict::from_outcome(&SignalOutcome::flagged(SourceId::VirusTotalFile, true));
        assert_eq!(verdict, ApkVerdict::Malicious);
        assert_eq!(verdict.action(), ApkAction::BlockInstall);
    }
}
