use std::time::Duration;

use phishshield_core::presentation::DEFAULT_LANG;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub safe_browsing_api_key: Option<String>,
    pub virustotal_api_key: Option<String>,
    pub ip_intel_url: String,
    pub safe_browsing_url: String,
    pub virustotal_url: String,
    pub ip_intel_timeout_ms: u64,
    pub safe_browsing_timeout_ms: u64,
    pub virustotal_timeout_ms: u64,
    pub virustotal_poll_delay_ms: u64,
    pub hash_lookup_timeout_ms: u64,
    pub max_link_body_bytes: usize,
    pub max_apk_body_bytes: usize,
    pub default_lang: String,
    pub trust_forwarded_for: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            safe_browsing_api_key: None,
            virustotal_api_key: None,
            ip_intel_url: "https://ipapi.co".to_string(),
            safe_browsing_url: "https://safebrowsing.googleapis.com".to_string(),
            virustotal_url: "https://www.virustotal.com".to_string(),
            ip_intel_timeout_ms: 3_000,
            safe_browsing_timeout_ms: 3_000,
            virustotal_timeout_ms: 5_000,
            virustotal_poll_delay_ms: 1_000,
            hash_lookup_timeout_ms: 5_000,
            max_link_body_bytes: 16_384,
            max_apk_body_bytes: 64 * 1024 * 1024,
            default_lang: DEFAULT_LANG.to_string(),
            trust_forwarded_for: true,
        }
    }
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.safe_browsing_api_key = read_env_string("PHISHSHIELD_SAFE_BROWSING_API_KEY")
            .or_else(|| read_env_string("GOOGLE_SAFE_BROWSING_API_KEY"));
        cfg.virustotal_api_key = read_env_string("PHISHSHIELD_VIRUSTOTAL_API_KEY")
            .or_else(|| read_env_string("VIRUSTOTAL_API_KEY"));
        if let Some(url) = read_env_string("PHISHSHIELD_IP_INTEL_URL") {
            cfg.ip_intel_url = url;
        }
        if let Some(url) = read_env_string("PHISHSHIELD_SAFE_BROWSING_URL") {
            cfg.safe_browsing_url = url;
        }
        if let Some(url) = read_env_string("PHISHSHIELD_VIRUSTOTAL_URL") {
            cfg.virustotal_url = url;
        }
        cfg.ip_intel_timeout_ms =
            read_env_u64("PHISHSHIELD_IP_INTEL_TIMEOUT_MS", cfg.ip_intel_timeout_ms);
        cfg.safe_browsing_timeout_ms = read_env_u64(
            "PHISHSHIELD_SAFE_BROWSING_TIMEOUT_MS",
            cfg.safe_browsing_timeout_ms,
        );
        cfg.virustotal_timeout_ms =
            read_env_u64("PHISHSHIELD_VIRUSTOTAL_TIMEOUT_MS", cfg.virustotal_timeout_ms);
        cfg.virustotal_poll_delay_ms = read_env_u64(
            "PHISHSHIELD_VIRUSTOTAL_POLL_DELAY_MS",
            cfg.virustotal_poll_delay_ms,
        );
        cfg.hash_lookup_timeout_ms = read_env_u64(
            "PHISHSHIELD_HASH_LOOKUP_TIMEOUT_MS",
            cfg.hash_lookup_timeout_ms,
        );
        cfg.max_link_body_bytes =
            read_env_usize("PHISHSHIELD_MAX_LINK_BODY_BYTES", cfg.max_link_body_bytes);
        cfg.max_apk_body_bytes =
            read_env_usize("PHISHSHIELD_MAX_APK_BODY_BYTES", cfg.max_apk_body_bytes);
        if let Some(lang) = read_env_string("PHISHSHIELD_DEFAULT_LANG") {
            cfg.default_lang = lang;
        }
        cfg.trust_forwarded_for =
            read_env_bool("PHISHSHIELD_TRUST_FORWARDED_FOR", cfg.trust_forwarded_for);
        cfg
    }

    /// Budget for the whole submit, wait, poll round trip.
    pub fn virustotal_url_budget(&self) -> Duration {
        Duration::from_millis(
            self.virustotal_timeout_ms
                .saturating_mul(2)
                .saturating_add(self.virustotal_poll_delay_ms),
        )
    }
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn read_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn read_env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) if v.eq_ignore_ascii_case("true") || v == "1" => true,
        Ok(v) if v.eq_ignore_ascii_case("false") || v == "0" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virustotal_budget_covers_both_calls_and_poll_delay() {
        let cfg = DaemonConfig {
            virustotal_timeout_ms: 500,
            virustotal_poll_delay_ms: 100,
            ..DaemonConfig::default()
        };
        assert_eq!(cfg.virustotal_url_budget(), Duration::from_millis(1_100));
    }

    #[test]
    fn defaults_have_no_credentials() {
        let cfg = DaemonConfig::default();
        assert!(cfg.safe_browsing_api_key.is_none());
        assert!(cfg.virustotal_api_key.is_none());
        assert_eq!(cfg.default_lang, "en");
    }
}
