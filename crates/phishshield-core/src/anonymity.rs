use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

pub const PRIVATE_ADDRESS_RISK: u32 = 30;
pub const HOSTING_ORG_RISK: u32 = 20;
pub const PROVIDER_VPN_RISK: u32 = 40;
pub const PROVIDER_TOR_RISK: u32 = 50;

const HOSTING_ORG_KEYWORDS: [&str; 4] = ["vpn", "proxy", "hosting", "cloud"];

/// Network anonymity flags for the originating IP plus the accumulated risk
/// contribution. `risk` is not clamped here; the decision policy clamps the
/// total score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymityReport {
    pub vpn: bool,
    pub proxy: bool,
    pub tor: bool,
    pub hosting: bool,
    pub risk: u32,
}

impl AnonymityReport {
    /// Only VPN or Tor counts as anonymized; a hosting provider alone does not.
    pub fn is_anonymized(&self) -> bool {
        self.vpn || self.tor
    }
}

/// What an IP intelligence provider says about an address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpIntelRecord {
    pub org: Option<String>,
    pub vpn: bool,
    pub tor: bool,
}

/// Applies the additive anonymity rules. The private-address rule and the
/// provider VPN rule both set `vpn` and both contribute.
pub fn classify(ip: IpAddr, record: &IpIntelRecord) -> AnonymityReport {
    let mut report = AnonymityReport::default();

    if is_private_or_reserved(ip) {
        report.vpn = true;
        report.risk += PRIVATE_ADDRESS_RISK;
    }

    let org = record.org.as_deref().unwrap_or_default().to_lowercase();
    if HOSTING_ORG_KEYWORDS.iter().any(|k| org.contains(k)) {
        report.hosting = true;
        report.risk += HOSTING_ORG_RISK;
    }

    if record.vpn {
        report.vpn = true;
        report.risk += PROVIDER_VPN_RISK;
    }

    if record.tor {
        report.tor = true;
        report.risk += PROVIDER_TOR_RISK;
    }

    report
}

pub fn is_private_or_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_or_reserved_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_private_or_reserved_v4(v4),
            None => is_private_or_reserved_v6(v6),
        },
    }
}

fn is_private_or_reserved_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (b & 0xc0) == 64)
        // 240.0.0.0/4
        || a >= 240
        || a == 0
}

fn is_private_or_reserved_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
        // 2001:db8::/32 documentation
        || (first == 0x2001 && ip.segments()[1] == 0x0db8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn public_address_with_clean_record_is_quiet() {
        let report = classify(ip("8.8.8.8"), &IpIntelRecord::default());
        assert_eq!(report, AnonymityReport::default());
        assert!(!report.is_anonymized());
    }

    #[test]
    fn private_address_sets_vpn() {
        for addr in ["10.0.0.7", "192.168.1.1", "127.0.0.1", "100.64.3.2", "::1", "fd00::1"] {
            let report = classify(ip(addr), &IpIntelRecord::default());
            assert!(report.vpn, "{addr}");
            assert_eq!(report.risk, PRIVATE_ADDRESS_RISK, "{addr}");
        }
    }

    #[test]
    fn private_and_provider_vpn_are_additive() {
        let record = IpIntelRecord {
            org: None,
            vpn: true,
            tor: false,
        };
        let report = classify(ip("10.1.2.3"), &record);
        assert!(report.vpn);
        assert_eq!(report.risk, PRIVATE_ADDRESS_RISK + PROVIDER_VPN_RISK);
    }

    #[test]
    fn hosting_org_alone_is_not_anonymized() {
        let record = IpIntelRecord {
            org: Some("Example Cloud Services LLC".to_string()),
            ..IpIntelRecord::default()
        };
        let report = classify(ip("203.0.114.9"), &record);
        assert!(report.hosting);
        assert_eq!(report.risk, HOSTING_ORG_RISK);
        assert!(!report.is_anonymized());
    }

    #[test]
    fn every_rule_firing_sums_past_one_hundred() {
        let record = IpIntelRecord {
            org: Some("NordVPN".to_string()),
            vpn: true,
            tor: true,
        };
        let report = classify(ip("192.168.0.2"), &record);
        assert!(report.vpn && report.tor && report.hosting);
        assert_eq!(report.risk, 140);
    }
}
