// Copyright 2026 PhishShield Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![no_main]

use std::net::{IpAddr, Ipv4Addr};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use phishshield_core::anonymity::{classify, IpIntelRecord};
use phishshield_core::policy::{decide, Verdict};
use phishshield_core::signal::{AggregateResult, SignalOutcome, SignalPayload, SourceId};

#[derive(Arbitrary, Debug)]
enum Status {
    Flagged(bool),
    TimedOut,
    Failed,
}

#[derive(Arbitrary, Debug)]
struct Input {
    ip: [u8; 4],
    org: Option<String>,
    vpn: bool,
    tor: bool,
    ip_completed: bool,
    safe_browsing: Status,
    virustotal: Status,
    heuristic: bool,
}

fn outcome(source: SourceId, status: Status) -> SignalOutcome {
    match status {
        Status::Flagged(hit) => SignalOutcome::flagged(source, hit),
        Status::TimedOut => SignalOutcome::timed_out(source),
        Status::Failed => SignalOutcome::failed(source, "fuzz"),
    }
}

fuzz_target!(|input: Input| {
    let ip = if input.ip_completed {
        let addr = IpAddr::V4(Ipv4Addr::from(input.ip));
        let record = IpIntelRecord {
            org: input.org,
            vpn: input.vpn,
            tor: input.tor,
        };
        SignalOutcome::completed(SourceId::IpIntel, SignalPayload::Anonymity(classify(addr, &record)))
    } else {
        SignalOutcome::failed(SourceId::IpIntel, "fuzz")
    };
    let a_hit = matches!(input.safe_browsing, Status::Flagged(true));
    let result = AggregateResult::from_outcomes(vec![
        ip,
        outcome(SourceId::SafeBrowsing, input.safe_browsing),
        outcome(SourceId::VirusTotalUrl, input.virustotal),
        SignalOutcome::flagged(SourceId::LexicalHeuristic, input.heuristic),
    ]);

    let decision = decide(result.clone());
    assert!(decision.risk_score.value() <= 100);
    if a_hit {
        assert_eq!(decision.verdict, Verdict::Dangerous);
    }
    assert_eq!(decision, decide(result));
});
