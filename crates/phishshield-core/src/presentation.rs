use serde::Serialize;

use crate::policy::Verdict;

pub const DEFAULT_LANG: &str = "en";

/// Seconds sensitive inputs stay disabled after a non-safe verdict.
pub const SESSION_GUARD_TIMEOUT_SECS: u32 = 120;

// (code, [safe, suspicious, dangerous])
const WARNING_TEXT: [(&str, [&str; 3]); 3] = [
    (
        "en",
        [
            "This link appears to be safe.",
            "Suspicious link detected. Please be cautious.",
            "Dangerous phishing link blocked for your safety.",
        ],
    ),
    (
        "ta",
        [
            "இந்த இணைப்பு பாதுகாப்பானதாக உள்ளது.",
            "சந்தேகமான இணைப்பு கண்டறியப்பட்டது. கவனமாக இருங்கள்.",
            "ஆபத்தான பிஷிங் இணைப்பு தடுக்கப்பட்டது.",
        ],
    ),
    (
        "hi",
        [
            "यह लिंक सुरक्षित प्रतीत होता है।",
            "संदिग्ध लिंक पाया गया है। सावधान रहें।",
            "खतरनाक फ़िशिंग लिंक को ब्लॉक कर दिया गया है।",
        ],
    ),
];

pub fn supported_languages() -> impl Iterator<Item = &'static str> {
    WARNING_TEXT.iter().map(|(code, _)| *code)
}

fn lookup(verdict: Verdict, lang: &str) -> Option<&'static str> {
    let idx = match verdict {
        Verdict::Safe => 0,
        Verdict::Suspicious => 1,
        Verdict::Dangerous => 2,
    };
    WARNING_TEXT
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(lang.trim()))
        .map(|(_, texts)| texts[idx])
}

/// Localized warning. Unknown codes fall back to `fallback_lang`, then to
/// English.
pub fn warning_text(verdict: Verdict, lang: &str, fallback_lang: &str) -> &'static str {
    lookup(verdict, lang)
        .or_else(|| lookup(verdict, fallback_lang))
        .or_else(|| lookup(verdict, DEFAULT_LANG))
        .unwrap_or_default()
}

pub fn voice_alert(verdict: Verdict, text: &str) -> String {
    match verdict {
        Verdict::Dangerous => format!("Warning! {text} Do not open this link."),
        Verdict::Suspicious => format!("Alert! {text}"),
        Verdict::Safe => text.to_string(),
    }
}

/// Client-side input lock recommendation. Enforcement is up to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionGuard {
    pub disable_sensitive_inputs: bool,
    pub timeout_seconds: u32,
}

impl SessionGuard {
    pub fn for_verdict(verdict: Verdict) -> Self {
        let guarded = verdict != Verdict::Safe;
        Self {
            disable_sensitive_inputs: guarded,
            timeout_seconds: if guarded { SESSION_GUARD_TIMEOUT_SECS } else { 0 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub warning_text: String,
    pub voice_alert: String,
    pub session_guard: SessionGuard,
}

impl Presentation {
    pub fn for_verdict(verdict: Verdict, lang: &str, fallback_lang: &str) -> Self {
        let text = warning_text(verdict, lang, fallback_lang);
        Self {
            warning_text: text.to_string(),
            voice_alert: voice_alert(verdict, text),
            session_guard: SessionGuard::for_verdict(verdict),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_falls_back() {
        assert_eq!(
            warning_text(Verdict::Safe, "fr", "en"),
            "This link appears to be safe."
        );
        assert_eq!(
            warning_text(Verdict::Safe, "fr", "hi"),
            "यह लिंक सुरक्षित प्रतीत होता है।"
        );
        assert_eq!(
            warning_text(Verdict::Suspicious, "xx", "yy"),
            "Suspicious link detected. Please be cautious."
        );
    }

    #[test]
    fn voice_alert_wraps_by_verdict() {
        let p = Presentation::for_verdict(Verdict::Dangerous, "en", DEFAULT_LANG);
        assert_eq!(
            p.voice_alert,
            "Warning! Dangerous phishing link blocked for your safety. Do not open this link."
        );
        let p = Presentation::for_verdict(Verdict::Suspicious, "TA", DEFAULT_LANG);
        assert!(p.voice_alert.starts_with("Alert! சந்தேகமான"));
        let p = Presentation::for_verdict(Verdict::Safe, "en", DEFAULT_LANG);
        assert_eq!(p.voice_alert, p.warning_text);
    }

    #[test]
    fn session_guard_only_for_non_safe() {
        assert_eq!(
            SessionGuard::for_verdict(Verdict::Safe),
            SessionGuard {
                disable_sensitive_inputs: false,
                timeout_seconds: 0
            }
        );
        assert_eq!(SessionGuard::for_verdict(Verdict::Dangerous).timeout_seconds, 120);
    }

    #[test]
    fn every_language_covers_every_verdict() {
        for lang in supported_languages() {
            for verdict in [Verdict::Safe, Verdict::Suspicious, Verdict::Dangerous] {
                assert!(lookup(verdict, lang).is_some_and(|t| !t.is_empty()));
            }
        }
    }
}
