//! Fallback orchestrator: runs adapters in priority order until one answers.
//!
//! Every chain is an explicit ordered list of boxed [`SourceAdapter`]s. The
//! loop below is the only place that decides which source wins:
//!
//!   1. Run the adapter at the current position (fetch + extract).
//!   2. Records → done, tagged with the adapter's source name.
//!   3. Explicit "no data" answer → done, nothing to return.
//!   4. Failure or empty table → log it and move to the next adapter.
//!
//! Adapters are never raced; the first source in the list always wins when it
//! has data.

pub mod service;
pub mod snapshot;

use crate::scraper::extract::ParseReport;
use crate::scraper::{Extraction, PageFetcher, SourceAdapter};
use crate::utils::Timer;
use tracing::{debug, info, warn};

pub type AdapterChain<T> = Vec<Box<dyn SourceAdapter<Record = T>>>;

/// What happened when one adapter was tried.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Records(usize),
    /// Table found but every row was skipped.
    NoRows { skipped: usize },
    ExplicitlyEmpty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub position: usize,
    pub source: &'static str,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Found {
        source: &'static str,
        report: ParseReport<T>,
    },
    ExplicitlyEmpty {
        source: &'static str,
    },
    Exhausted,
}

/// Result of one chain run plus the attempt log.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub resolution: Resolution<T>,
    pub attempts: Vec<Attempt>,
}

impl<T> Outcome<T> {
    /// Position of the last adapter that gave a well-formed answer, even an
    /// empty one.
    pub fn last_answered(&self) -> Option<usize> {
        self.attempts
            .iter()
            .rev()
            .find(|a| !matches!(a.outcome, AttemptOutcome::Failed(_)))
            .map(|a| a.position)
    }
}

/// Try `chain` in order against `fetcher`.
pub async fn resolve<T: Send + 'static>(
    label: &str,
    chain: &[Box<dyn SourceAdapter<Record = T>>],
    fetcher: &dyn PageFetcher,
) -> Outcome<T> {
    let _t = Timer::start(label);
    let mut attempts = Vec::with_capacity(chain.len());

    for (position, adapter) in chain.iter().enumerate() {
        let source = adapter.source();
        debug!("{}: trying {} (#{})", label, source, position + 1);

        match adapter.run(fetcher).await {
            Ok(Extraction::Records(report)) if !report.is_empty() => {
                info!("{}: {} records from {}", label, report.count(), source);
                attempts.push(Attempt {
                    position,
                    source,
                    outcome: AttemptOutcome::Records(report.count()),
                });
                return Outcome {
                    resolution: Resolution::Found { source, report },
                    attempts,
                };
            }
            Ok(Extraction::Records(report)) => {
                warn!("{}: {} returned no usable rows ({} skipped)", label, source, report.skipped.len());
                attempts.push(Attempt {
                    position,
                    source,
                    outcome: AttemptOutcome::NoRows {
                        skipped: report.skipped.len(),
                    },
                });
            }
            Ok(Extraction::ExplicitlyEmpty) => {
                info!("{}: {} reports no data", label, source);
                attempts.push(Attempt {
                    position,
                    source,
                    outcome: AttemptOutcome::ExplicitlyEmpty,
                });
                return Outcome {
                    resolution: Resolution::ExplicitlyEmpty { source },
                    attempts,
                };
            }
            Err(e) => {
                warn!("{}: {} failed: {}", label, source, e);
                attempts.push(Attempt {
                    position,
                    source,
                    outcome: AttemptOutcome::Failed(e.to_string()),
                });
            }
        }
    }

    warn!("{}: all {} sources exhausted", label, chain.len());
    Outcome {
        resolution: Resolution::Exhausted,
        attempts,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
