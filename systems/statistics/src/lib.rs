#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Running performance statistics for the current level.
//!
//! The aggregator folds every finalized trial into a [`StatisticsSnapshot`]
//! and recomputes derived metrics from the running totals on demand.
//! Observers are notified once per recorded trial and once more when the
//! level summary is published.

mod metrics;

use log::{debug, info};
use sorting_board_core::{Event, Subscribers, Subscription, TrialId, TrialRecord};
use thiserror::Error;

use crate::metrics::TrialSample;

pub use crate::metrics::{LevelSummary, StatisticsSnapshot};

/// Errors raised while recording trials.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StatisticsError {
    /// Only finalized trials contribute to the statistics.
    #[error("trial {trial} has not been finalized")]
    Unfinalized {
        /// Identifier of the rejected trial.
        trial: TrialId,
    },
}

/// Aggregates finalized trials into level statistics.
#[derive(Debug, Default)]
pub struct Statistics {
    snapshot: StatisticsSnapshot,
    samples: Vec<TrialSample>,
    updates: Subscribers<StatisticsSnapshot>,
    summaries: Subscribers<LevelSummary>,
    last_summary: Option<LevelSummary>,
}

impl Statistics {
    /// Creates an aggregator with no recorded trials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current running totals.
    #[must_use]
    pub fn snapshot(&self) -> StatisticsSnapshot {
        self.snapshot
    }

    /// Summary most recently published through [`Statistics::publish_summary`].
    #[must_use]
    pub fn last_summary(&self) -> Option<LevelSummary> {
        self.last_summary
    }

    /// Folds a finalized trial into the running totals and notifies observers.
    pub fn record_finalized(&mut self, record: &TrialRecord) -> Result<(), StatisticsError> {
        if !record.is_finalized() {
            return Err(StatisticsError::Unfinalized {
                trial: record.trial(),
            });
        }
        let sample = TrialSample::from_record(record);
        self.snapshot.fold(sample);
        self.samples.push(sample);
        debug!(
            "recorded trial {}: {} of {} successful",
            record.trial(),
            self.snapshot.successes(),
            self.snapshot.total()
        );
        let snapshot = self.snapshot;
        self.updates.notify(&snapshot);
        Ok(())
    }

    /// Consumes world events, accumulating play time and finalized trials.
    ///
    /// Every record that was folded in is appended to `forwarded` in event
    /// order, so downstream consumers see exactly the trials counted here.
    pub fn handle(&mut self, events: &[Event], forwarded: &mut Vec<TrialRecord>) {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => self.snapshot.advance(*dt),
                Event::TrialFinalized { record, .. } => {
                    if self.record_finalized(record).is_ok() {
                        forwarded.push(record.clone());
                    }
                }
                _ => {}
            }
        }
    }

    /// Clears every accumulated value. Observers stay subscribed.
    pub fn reset(&mut self) {
        self.snapshot = StatisticsSnapshot::default();
        self.samples.clear();
        self.last_summary = None;
        let snapshot = self.snapshot;
        self.updates.notify(&snapshot);
    }

    /// Summary over every trial recorded since the last reset.
    #[must_use]
    pub fn summary(&self) -> LevelSummary {
        LevelSummary::from(&self.snapshot)
    }

    /// Summary restricted to the most recent `n` trials.
    ///
    /// Play time is not tracked per trial, so the window reports zero
    /// throughput and level time.
    #[must_use]
    pub fn summary_of_last(&self, n: usize) -> LevelSummary {
        let start = self.samples.len().saturating_sub(n);
        let window = StatisticsSnapshot::from_samples(&self.samples[start..], Default::default());
        LevelSummary::from(&window)
    }

    /// Registers an observer called with the totals after every change.
    pub fn subscribe_updates<F>(&mut self, observer: F) -> Subscription
    where
        F: FnMut(&StatisticsSnapshot) + 'static,
    {
        self.updates.subscribe(observer)
    }

    /// Removes an update observer. Returns whether it was registered.
    pub fn unsubscribe_updates(&mut self, subscription: Subscription) -> bool {
        self.updates.unsubscribe(subscription)
    }

    /// Registers an observer called when the level summary is published.
    pub fn subscribe_summary<F>(&mut self, observer: F) -> Subscription
    where
        F: FnMut(&LevelSummary) + 'static,
    {
        self.summaries.subscribe(observer)
    }

    /// Removes a summary observer. Returns whether it was registered.
    pub fn unsubscribe_summary(&mut self, subscription: Subscription) -> bool {
        self.summaries.unsubscribe(subscription)
    }

    /// Computes the level summary and hands it to summary observers once.
    pub fn publish_summary(&mut self) -> LevelSummary {
        let summary = self.summary();
        info!("level summary: {summary}");
        self.last_summary = Some(summary);
        self.summaries.notify(&summary);
        summary
    }
}
