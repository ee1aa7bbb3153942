use std::time::Duration;

use phishshield_core::heuristic::LexicalHeuristic;
use phishshield_core::signal::{AggregateResult, SignalOutcome, SourceId};
use tokio::task::JoinSet;

use crate::sources::{evaluate_bounded, DynSource, SubjectKind};

/// Fans a link scan out to every registered source at once, each under its
/// own timeout, and waits for all of them. The lexical heuristic is always
/// evaluated, last in dispatch order.
#[derive(Default)]
pub struct Aggregator {
    sources: Vec<(DynSource, Duration)>,
    heuristic: LexicalHeuristic,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a remote source. File-hash sources and repeated ids are
    /// ignored since link scans cannot use them.
    pub fn with_source(mut self, source: DynSource, timeout: Duration) -> Self {
        let id = source.id();
        if source.subject_kind() == SubjectKind::FileHash
            || id == SourceId::LexicalHeuristic
            || self.sources.iter().any(|(s, _)| s.id() == id)
        {
            tracing::warn!(source = %id, "signal source not registered for link scans");
            return self;
        }
        self.sources.push((source, timeout));
        self
    }

    pub fn dispatch_order(&self) -> Vec<SourceId> {
        self.sources
            .iter()
            .map(|(s, _)| s.id())
            .chain(std::iter::once(SourceId::LexicalHeuristic))
            .collect()
    }

    pub async fn aggregate(&self, link: &str, client_ip: Option<&str>) -> AggregateResult {
        let dispatched = self.dispatch_order();
        let mut outcomes = Vec::with_capacity(dispatched.len());
        let mut tasks = JoinSet::new();

        for (source, timeout) in &self.sources {
            let subject = match (source.subject_kind(), client_ip) {
                (SubjectKind::Url, _) => link.to_string(),
                (SubjectKind::ClientIp, Some(ip)) => ip.to_string(),
                (SubjectKind::ClientIp, None) => {
                    outcomes.push(SignalOutcome::failed(
                        source.id(),
                        "client address unavailable",
                    ));
                    continue;
                }
                (SubjectKind::FileHash, _) => continue,
            };
            tasks.spawn(evaluate_bounded(source.clone(), subject, *timeout));
        }

        // Evaluated inline while the remote sources are in flight.
        outcomes.push(self.heuristic.evaluate(link));

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    tracing::debug!(source = %outcome.source, status = outcome.status.as_str(), "signal source settled");
                    outcomes.push(outcome);
                }
                Err(err) => tracing::warn!(error = %err, "aggregation task failed"),
            }
        }

        AggregateResult::collect(&dispatched, outcomes)
    }
}
