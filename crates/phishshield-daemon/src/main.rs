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

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use phishshield_core::ledger::{FlagLedger, InMemoryLedger};
use phishshield_daemon::config::DaemonConfig;
use phishshield_daemon::flag_log::NdjsonFlagLedger;
use phishshield_daemon::http::{bind_listener, serve, HttpState};
use phishshield_daemon::scan::ScanService;
use phishshield_daemon::telemetry::Telemetry;

#[derive(Debug, Parser)]
#[command(name = "phishshield-daemon")]
#[command(about = "PhishShield link and APK scanning daemon")]
struct Args {
    #[arg(long, env = "PHISHSHIELD_LISTEN", default_value = "127.0.0.1:5000")]
    listen: String,

    /// Append flagged entries to this NDJSON file and replay it on start.
    /// Without it the flagged list lives only in memory.
    #[arg(long, env = "PHISHSHIELD_FLAGGED_LOG")]
    flagged_log: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.log))
        .init();

    let cfg = DaemonConfig::from_env();
    if cfg.safe_browsing_api_key.is_none() {
        tracing::warn!("no Safe Browsing key configured; reputation A will report failed");
    }
    if cfg.virustotal_api_key.is_none() {
        tracing::warn!("no VirusTotal key configured; reputation B and APK lookups will report failed");
    }

    let ledger: Arc<dyn FlagLedger> = match &args.flagged_log {
        Some(path) => {
            let ledger = NdjsonFlagLedger::open(path)?;
            tracing::info!(path = %path.display(), replayed = ledger.len(), "flagged log opened");
            Arc::new(ledger)
        }
        None => Arc::new(InMemoryLedger::new()),
    };

    let service = ScanService::from_config(&cfg, ledger, Telemetry::new())?;
    let listener = bind_listener(&args.listen).await?;
    tracing::info!(addr = %listener.local_addr()?, "starting PhishShield HTTP server");

    serve(listener, HttpState::new(cfg, service), async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for shutdown signal");
        }
    })
    .await?;

    tracing::info!("PhishShield HTTP server stopped");
    Ok(())
}
