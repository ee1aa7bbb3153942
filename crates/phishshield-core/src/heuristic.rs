use crate::signal::{SignalOutcome, SourceId};

/// Terms that commonly appear in credential-harvesting links.
pub const CREDENTIAL_KEYWORDS: [&str; 9] = [
    "login", "verify", "secure", "update", "account", "bank", "wallet", "otp", "signin",
];

/// Local lexical heuristic. Pure and infallible, so every scan has at least
/// one completed signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalHeuristic;

impl LexicalHeuristic {
    /// Returns the first keyword found in the lowercased subject.
    pub fn matched_keyword(&self, subject: &str) -> Option<&'static str> {
        let lowered = subject.to_lowercase();
        CREDENTIAL_KEYWORDS
            .iter()
            .copied()
            .find(|keyword| lowered.contains(keyword))
    }

    pub fn evaluate(&self, subject: &str) -> SignalOutcome {
        SignalOutcome::flagged(
            SourceId::LexicalHeuristic,
            self.matched_keyword(subject).is_some(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalStatus;

    #[test]
    fn matches_case_insensitively() {
        let h = LexicalHeuristic;
        assert_eq!(h.matched_keyword("http://example.com/LOGIN"), Some("login"));
        assert_eq!(h.matched_keyword("https://MyBank.example"), Some("bank"));
        assert_eq!(h.matched_keyword("https://example.com/docs"), None);
    }

    #[test]
    fn always_completes() {
        let outcome = LexicalHeuristic.evaluate("");
        assert_eq!(outcome.source, SourceId::LexicalHeuristic);
        assert!(matches!(outcome.status, SignalStatus::Completed(_)));
        assert!(!outcome.is_flagged());
        assert!(LexicalHeuristic.evaluate("wallet-connect.example").is_flagged());
    }
}
