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

use libfuzzer_sys::fuzz_target;
use phishshield_core::heuristic::LexicalHeuristic;
use phishshield_core::subject::{normalize_domain, Subject};

fuzz_target!(|data: &[u8]| {
    let Ok(link) = std::str::from_utf8(data) else {
        return;
    };
    let domain = normalize_domain(link);
    assert!(!domain.contains('/'));

    if let Ok(subject) = Subject::url(link) {
        let _ = subject.normalized_domain();
        let _ = LexicalHeuristic.evaluate(subject.as_str());
    }
});
