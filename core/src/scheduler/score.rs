//! Computed priority score (spec §4.1): lower score is more urgent.

use crate::scheduler::task::TaskRecord;
use chrono::Utc;

/// Compute the priority score for `record`, given whether any other queued
/// task declares it as a dependency.
///
/// - base = numeric priority level (critical=1 ... deferred=5)
/// - x0.5 if `user_triggered`
/// - x0.66 if another queued task depends on this one
/// - x `1 / max(0.5, 0.8^retry_count)` (retries lower priority, i.e. raise score)
/// - if `deadline` set, x `min(3, 1/hours_until_deadline)`
#[must_use]
pub fn compute_priority_score(record: &TaskRecord, is_a_dependency_of_other: bool) -> f64 {
    let mut score = f64::from(record.task.priority.level());

    if record.task.user_triggered {
        score *= 0.5;
    }
    if is_a_dependency_of_other {
        score *= 0.66;
    }

    let retry_factor = 1.0 / 0.8f64.powi(record.retries as i32).max(0.5);
    score *= retry_factor;

    if let Some(deadline) = record.task.deadline {
        let hours_until = (deadline - Utc::now()).num_milliseconds() as f64 / 3_600_000.0;
        if hours_until > 0.0 {
            score *= (1.0 / hours_until).min(3.0);
        } else {
            // Past deadline: treat as maximally urgent.
            score *= 3.0;
        }
    }

    score
}
