//! Game-clock scheduler for deferred continuations.
//!
//! Entries only move forward when [`Scheduler::advance`] is called, so a
//! scheduler driven by game time stays frozen while the level is paused.

use std::time::Duration;

/// Handle that identifies a scheduled entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

/// Entry that reached its due time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Due<K> {
    /// Clock value the entry was scheduled for.
    pub at: Duration,
    /// Payload supplied when the entry was scheduled.
    pub key: K,
}

#[derive(Clone, Debug)]
struct Entry<K> {
    handle: TaskHandle,
    at: Duration,
    key: K,
}

/// Ordered collection of deferred entries keyed to a private clock.
#[derive(Clone, Debug)]
pub struct Scheduler<K> {
    now: Duration,
    next_handle: u64,
    entries: Vec<Entry<K>>,
}

impl<K> Default for Scheduler<K> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_handle: 0,
            entries: Vec::new(),
        }
    }
}

impl<K> Scheduler<K> {
    /// Creates an empty scheduler whose clock starts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of the scheduler clock.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Number of entries that have not fired yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Schedules `key` to fire once `delay` has elapsed on the scheduler clock.
    pub fn schedule_after(&mut self, delay: Duration, key: K) -> TaskHandle {
        let at = self.now.saturating_add(delay);
        self.schedule_at(at, key)
    }

    /// Schedules `key` to fire at the absolute clock value `at`.
    pub fn schedule_at(&mut self, at: Duration, key: K) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.entries.push(Entry { handle, at, key });
        handle
    }

    /// Cancels a pending entry, returning whether it was still scheduled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        self.entries.len() != before
    }

    /// Cancels every entry whose key matches `predicate`.
    pub fn cancel_where<P>(&mut self, mut predicate: P) -> usize
    where
        P: FnMut(&K) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|entry| !predicate(&entry.key));
        before - self.entries.len()
    }

    /// Drops every pending entry without firing it.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Time left until the entry fires, or `None` when it is no longer pending.
    #[must_use]
    pub fn remaining(&self, handle: TaskHandle) -> Option<Duration> {
        self.entries
            .iter()
            .find(|entry| entry.handle == handle)
            .map(|entry| entry.at.saturating_sub(self.now))
    }

    /// Advances the clock and appends every entry that became due to `out`.
    ///
    /// Due entries are emitted ordered by due time, then by scheduling order.
    pub fn advance(&mut self, dt: Duration, out: &mut Vec<Due<K>>) {
        self.now = self.now.saturating_add(dt);
        let now = self.now;

        let mut due: Vec<Entry<K>> = Vec::new();
        let mut index = 0;
        while index < self.entries.len() {
            if self.entries[index].at <= now {
                due.push(self.entries.remove(index));
            } else {
                index += 1;
            }
        }
        due.sort_by(|a, b| a.at.cmp(&b.at).then(a.handle.cmp(&b.handle)));
        out.extend(due.into_iter().map(|entry| Due {
            at: entry.at,
            key: entry.key,
        }));
    }
}
