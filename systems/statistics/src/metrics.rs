use std::time::Duration;

use sorting_board_core::TrialRecord;

/// Contribution of one finalized trial to the running totals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TrialSample {
    pub(crate) success: bool,
    pub(crate) error: f64,
    pub(crate) duration: Duration,
}

impl TrialSample {
    pub(crate) fn from_record(record: &TrialRecord) -> Self {
        Self {
            success: record.outcome().is_some_and(|outcome| outcome.is_success()),
            error: f64::from(record.placement_error()),
            duration: record.completion_time().unwrap_or(Duration::ZERO),
        }
    }
}

/// Running totals from which every derived metric is computed.
///
/// Totals are never stored pre-divided, so percentages and means stay exact
/// no matter how many trials are folded in.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatisticsSnapshot {
    total: u32,
    successes: u32,
    cumulative_error: f64,
    cumulative_duration: Duration,
    elapsed: Duration,
}

impl StatisticsSnapshot {
    pub(crate) fn fold(&mut self, sample: TrialSample) {
        self.total = self.total.saturating_add(1);
        if sample.success {
            self.successes = self.successes.saturating_add(1);
        }
        self.cumulative_error += sample.error;
        self.cumulative_duration = self.cumulative_duration.saturating_add(sample.duration);
    }

    pub(crate) fn advance(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    pub(crate) fn from_samples<'a, I>(samples: I, elapsed: Duration) -> Self
    where
        I: IntoIterator<Item = &'a TrialSample>,
    {
        let mut snapshot = Self {
            elapsed,
            ..Self::default()
        };
        for sample in samples {
            snapshot.fold(*sample);
        }
        snapshot
    }

    /// Number of finalized trials.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }

    /// Number of successful trials.
    #[must_use]
    pub const fn successes(&self) -> u32 {
        self.successes
    }

    /// Number of trials that did not succeed.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.total - self.successes
    }

    /// Sum of placement errors across all trials.
    #[must_use]
    pub const fn cumulative_error(&self) -> f64 {
        self.cumulative_error
    }

    /// Sum of completion durations across all trials.
    #[must_use]
    pub const fn cumulative_duration(&self) -> Duration {
        self.cumulative_duration
    }

    /// Unpaused play time observed since the last reset.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Share of successful trials as a percentage in `[0, 100]`.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.successes) / f64::from(self.total) * 100.0
    }

    /// Mean placement error across trials.
    #[must_use]
    pub fn mean_error(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.cumulative_error / f64::from(self.total)
    }

    /// Mean completion duration across trials.
    #[must_use]
    pub fn mean_duration(&self) -> Duration {
        if self.total == 0 {
            return Duration::ZERO;
        }
        self.cumulative_duration / self.total
    }

    /// Trials completed per minute of play.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds <= 0.0 {
            return 0.0;
        }
        f64::from(self.total) / seconds * 60.0
    }
}

/// End-of-level report derived from a [`StatisticsSnapshot`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelSummary {
    /// Share of successful trials as a percentage.
    pub accuracy: f64,
    /// Mean placement error in board units.
    pub mean_error: f64,
    /// Mean time from spawn to release.
    pub mean_duration: Duration,
    /// Trials per minute of unpaused play.
    pub throughput: f64,
    /// Number of finalized trials.
    pub total: u32,
    /// Number of successful trials.
    pub successes: u32,
    /// Number of failed trials.
    pub failures: u32,
    /// Unpaused play time covered by the summary.
    pub level_time: Duration,
}

impl From<&StatisticsSnapshot> for LevelSummary {
    fn from(snapshot: &StatisticsSnapshot) -> Self {
        Self {
            accuracy: snapshot.accuracy(),
            mean_error: snapshot.mean_error(),
            mean_duration: snapshot.mean_duration(),
            throughput: snapshot.throughput(),
            total: snapshot.total(),
            successes: snapshot.successes(),
            failures: snapshot.failures(),
            level_time: snapshot.elapsed(),
        }
    }
}

impl std::fmt::Display for LevelSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "accuracy {:.1}% | mean error {:.1} | mean time {:.2}s | throughput {:.1}/min | success {}/{}",
            self.accuracy,
            self.mean_error,
            self.mean_duration.as_secs_f64(),
            self.throughput,
            self.successes,
            self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(success: bool, error: f64, millis: u64) -> TrialSample {
        TrialSample {
            success,
            error,
            duration: Duration::from_millis(millis),
        }
    }

    #[test]
    fn empty_snapshot_reports_zeroes() {
        let snapshot = StatisticsSnapshot::default();
        assert_eq!(snapshot.accuracy(), 0.0);
        assert_eq!(snapshot.mean_error(), 0.0);
        assert_eq!(snapshot.mean_duration(), Duration::ZERO);
        assert_eq!(snapshot.throughput(), 0.0);
    }

    #[test]
    fn derived_metrics_follow_totals() {
        let samples = [
            sample(true, 10.0, 1_000),
            sample(false, 30.0, 3_000),
            sample(true, 20.0, 2_000),
            sample(true, 0.0, 2_000),
        ];
        let snapshot = StatisticsSnapshot::from_samples(&samples, Duration::from_secs(60));
        assert_eq!(snapshot.total(), 4);
        assert_eq!(snapshot.failures(), 1);
        assert!((snapshot.accuracy() - 75.0).abs() < 1e-9);
        assert!((snapshot.mean_error() - 15.0).abs() < 1e-9);
        assert_eq!(snapshot.mean_duration(), Duration::from_millis(2_000));
        assert!((snapshot.throughput() - 4.0).abs() < 1e-9);
    }
}
