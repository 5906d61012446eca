//! Task records and the priority levels driving the four queues (spec §4.1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Declared urgency of a task. Numeric level (critical=1 ... deferred=5,
/// lower is more urgent) is used directly in the priority-score formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Normal,
    Low,
    Deferred,
}

impl Priority {
    /// Numeric level used as the base priority score (spec §4.1).
    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Priority::Critical => 1,
            Priority::High => 2,
            Priority::Normal => 3,
            Priority::Low => 4,
            Priority::Deferred => 5,
        }
    }
}

/// Lifecycle state of a submitted task (spec §4.1 state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    FailedRetryable,
    FailedTerminal,
    Deferred,
    Cancelled,
}

/// A task as submitted to the scheduler.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub user_triggered: bool,
    pub dependencies: HashSet<Uuid>,
    pub max_retries: u32,
}

impl Task {
    /// Start building a task with the given name and handler priority.
    #[must_use]
    pub fn new(name: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            priority,
            created_at: Utc::now(),
            deadline: None,
            user_triggered: false,
            dependencies: HashSet::new(),
            max_retries: 3,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn user_triggered(mut self) -> Self {
        self.user_triggered = true;
        self
    }

    #[must_use]
    pub fn depends_on(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.dependencies.extend(ids);
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Whether every dependency is in `completed`.
    #[must_use]
    pub fn dependencies_met(&self, completed: &HashSet<Uuid>) -> bool {
        self.dependencies.iter().all(|d| completed.contains(d))
    }
}

/// A task plus its mutable scheduling state: the unit tracked in queues
/// and returned by `status(id)`.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub task: Task,
    pub status: TaskStatus,
    pub retries: u32,
    pub last_error: Option<String>,
    pub result: Option<String>,
}

impl TaskRecord {
    #[must_use]
    pub fn new(task: Task) -> Self {
        Self {
            task,
            status: TaskStatus::Queued,
            retries: 0,
            last_error: None,
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_levels_ordered_critical_first() {
        assert!(Priority::Critical.level() < Priority::High.level());
        assert!(Priority::High.level() < Priority::Normal.level());
        assert!(Priority::Normal.level() < Priority::Low.level());
        assert!(Priority::Low.level() < Priority::Deferred.level());
    }

    #[test]
    fn dependencies_met_requires_all_present() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let task = Task::new("t", Priority::Normal).depends_on([a, b]);

        let mut completed = HashSet::new();
        assert!(!task.dependencies_met(&completed));

        completed.insert(a);
        assert!(!task.dependencies_met(&completed));

        completed.insert(b);
        assert!(task.dependencies_met(&completed));
    }
}
