//! Periodic task registry (spec §4.1): named recurring jobs whose next
//! run is tracked independently of the ad-hoc task queues, and whose
//! ticks are handed to the scheduler for dispatch when due.

use crate::scheduler::task::{Priority, Task};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A registered recurring job: fires `handler_name` into a fresh `Task`
/// every `interval`, at the declared `priority`.
#[derive(Debug, Clone)]
pub struct PeriodicJob {
    pub name: String,
    pub interval: Duration,
    pub priority: Priority,
    pub next_fire: DateTime<Utc>,
}

impl PeriodicJob {
    #[must_use]
    pub fn new(name: impl Into<String>, interval: Duration, priority: Priority) -> Self {
        let next_fire = Utc::now()
            + chrono::Duration::from_std(interval).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            name: name.into(),
            interval,
            priority,
            next_fire,
        }
    }

    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_fire
    }

    /// Advance `next_fire` by one interval from `now` and build the
    /// `Task` for this tick.
    pub fn fire(&mut self, now: DateTime<Utc>) -> Task {
        self.next_fire = now
            + chrono::Duration::from_std(self.interval).unwrap_or_else(|_| chrono::Duration::zero());
        Task::new(self.name.clone(), self.priority)
    }
}

/// Holds every registered periodic job and drains due ticks.
#[derive(Debug, Default)]
pub struct PeriodicRegistry {
    jobs: Vec<PeriodicJob>,
}

impl PeriodicRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, interval: Duration, priority: Priority) {
        self.jobs.push(PeriodicJob::new(name, interval, priority));
    }

    /// Fire every job whose `next_fire` has passed, returning one `Task`
    /// per due job and advancing its schedule. The caller enqueues each
    /// returned task into the queue matching its priority (spec §4.1:
    /// "periodic ticks write into whichever queue matches their declared
    /// priority at fire time").
    pub fn drain_due(&mut self, now: DateTime<Utc>) -> Vec<Task> {
        self.jobs
            .iter_mut()
            .filter(|job| job.is_due(now))
            .map(|job| job.fire(now))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
