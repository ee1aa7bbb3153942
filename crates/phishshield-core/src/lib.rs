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

//! phishshield-core
//!
//! The pure half of the PhishShield link scanner. Nothing in this crate
//! performs I/O; provider adapters and transport live in the daemon.
//!
//! This crate implements:
//! - the signal data model (`SignalOutcome`, `AggregateResult`)
//! - the anonymity classification rules and the lexical heuristic
//! - the decision policy: verdict precedence, clamped risk score, ordered explanation
//! - the append-only flagged-entry ledger contract
//! - presentation lookups (localized warning text, voice alert, session guard)

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod anonymity;
pub mod apk;
pub mod error;
pub mod heuristic;
pub mod ledger;
pub mod policy;
pub mod presentation;
pub mod signal;
pub mod subject;

pub use crate::error::{ScanError, ScanResult};
pub use crate::policy::{decide, Action, Decision, RiskScore, Verdict};
pub use crate::signal::{AggregateResult, SignalOutcome, SignalPayload, SignalStatus, SourceId};
