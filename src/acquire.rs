//! Multi-pass article acquisition.
//!
//! The orchestrator walks the configured sources in order, pass after pass,
//! until it has collected `min_total` unseen articles, has run `max_passes`
//! passes, or has used up its wall-clock budget. Every accepted article is
//! marked in the [`SeenStore`] before it is handed on, so a crash later in the
//! run never brings the same URL back.
//!
//! # Failure isolation
//!
//! | Failure | Effect |
//! |---------|--------|
//! | No adapter for a source | source skipped, logged as a configuration gap |
//! | Adapter error (listing unreachable, timeout) | source yields nothing this pass |
//! | Budget exhausted | in-flight source counts as failed, acquisition stops |
//!
//! None of these abort the run; an under-yield is reported, not raised.

use crate::error::ScrapeError;
use crate::models::Article;
use crate::scrapers::session::Session;
use crate::scrapers::{Adapter, Registry};
use crate::seen::SeenStore;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Stopping rules for one acquisition.
#[derive(Debug, Clone)]
pub struct AcquirePolicy {
    /// Stop as soon as this many new articles are collected.
    pub min_total: usize,
    /// Upper bound on full traversals of the source list.
    pub max_passes: usize,
    /// Wall-clock budget for the whole acquisition. `None` means unbounded.
    pub deadline: Option<Duration>,
}

impl Default for AcquirePolicy {
    fn default() -> Self {
        Self {
            min_total: 5,
            max_passes: 2,
            deadline: Some(Duration::from_secs(600)),
        }
    }
}

/// Outcome of one acquisition.
#[derive(Debug, Default)]
pub struct AcquisitionReport {
    /// New articles in collection order.
    pub articles: Vec<Article>,
    /// Passes started.
    pub passes: usize,
    /// Adapter invocations.
    pub sources_attempted: usize,
    /// Adapter invocations that failed as a whole.
    pub source_failures: usize,
    /// Whether the wall-clock budget cut acquisition short.
    pub deadline_hit: bool,
    pub elapsed: Duration,
}

impl AcquisitionReport {
    pub fn target_met(&self, min_total: usize) -> bool {
        self.articles.len() >= min_total
    }
}

/// Drives adapters over the source list and filters through the seen store.
pub struct Orchestrator<'a, A> {
    registry: &'a Registry<A>,
    seen: &'a mut SeenStore,
    policy: AcquirePolicy,
}

impl<'a, A: Adapter> Orchestrator<'a, A> {
    pub fn new(registry: &'a Registry<A>, seen: &'a mut SeenStore, policy: AcquirePolicy) -> Self {
        Self {
            registry,
            seen,
            policy,
        }
    }

    /// Run acquisition over `sources`, then close `session`.
    ///
    /// The session is closed exactly once, whatever happened to the sources.
    #[instrument(
        level = "info",
        skip_all,
        fields(
            sources = sources.len(),
            min_total = self.policy.min_total,
            max_passes = self.policy.max_passes
        )
    )]
    pub async fn run<S: Session>(&mut self, sources: &[String], session: &mut S) -> AcquisitionReport {
        let report = self.run_passes(sources, session).await;
        session.close().await;

        if report.target_met(self.policy.min_total) {
            info!(
                collected = report.articles.len(),
                passes = report.passes,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Acquisition reached target"
            );
        } else {
            warn!(
                collected = report.articles.len(),
                target = self.policy.min_total,
                passes = report.passes,
                failures = report.source_failures,
                deadline_hit = report.deadline_hit,
                "Acquisition under target; continuing with what was collected"
            );
        }
        report
    }

    async fn run_passes<S: Session>(&mut self, sources: &[String], session: &mut S) -> AcquisitionReport {
        let started = Instant::now();
        let deadline = self.policy.deadline.map(|d| started + d);
        let min_total = self.policy.min_total;
        let mut report = AcquisitionReport::default();

        'passes: while report.passes < self.policy.max_passes && report.articles.len() < min_total {
            report.passes += 1;
            let before = report.articles.len();
            info!(pass = report.passes, collected = before, "Starting acquisition pass");

            for url in sources {
                if report.articles.len() >= min_total {
                    debug!(pass = report.passes, "Target reached; skipping remaining sources");
                    break;
                }

                let remaining = match deadline {
                    Some(at) => match at.checked_duration_since(Instant::now()) {
                        Some(left) if !left.is_zero() => Some(left),
                        _ => {
                            warn!(%url, "Acquisition budget exhausted before source");
                            report.deadline_hit = true;
                            break 'passes;
                        }
                    },
                    None => None,
                };

                let adapter = match self.registry.resolve(url) {
                    Ok(adapter) => adapter,
                    Err(e) => {
                        warn!(%url, error = %e, "Skipping source without adapter");
                        continue;
                    }
                };

                report.sources_attempted += 1;
                debug!(%url, adapter = adapter.name(), "Extracting source");
                let extracted = match remaining {
                    Some(left) => {
                        match tokio::time::timeout(left, adapter.extract(url, session, &*self.seen))
                            .await
                        {
                            Ok(res) => res,
                            Err(_) => {
                                report.deadline_hit = true;
                                Err(ScrapeError::Timeout {
                                    url: url.clone(),
                                    after: left,
                                })
                            }
                        }
                    }
                    None => adapter.extract(url, session, &*self.seen).await,
                };

                let articles = match extracted {
                    Ok(articles) => articles,
                    Err(e) => {
                        report.source_failures += 1;
                        warn!(%url, adapter = adapter.name(), error = %e, "Source failed this pass");
                        if report.deadline_hit {
                            break 'passes;
                        }
                        continue;
                    }
                };

                let offered = articles.len();
                let mut accepted = 0usize;
                for article in articles {
                    if self.seen.contains(article.url()) {
                        debug!(url = %article.url(), "Already seen; dropping");
                        continue;
                    }
                    self.seen.mark(article.url());
                    report.articles.push(article);
                    accepted += 1;
                    if report.articles.len() >= min_total {
                        break;
                    }
                }
                info!(
                    %url,
                    adapter = adapter.name(),
                    offered,
                    accepted,
                    collected = report.articles.len(),
                    "Source done"
                );
            }

            info!(
                pass = report.passes,
                yield_this_pass = report.articles.len() - before,
                collected = report.articles.len(),
                "Finished acquisition pass"
            );
        }

        report.elapsed = started.elapsed();
        report
    }
}
