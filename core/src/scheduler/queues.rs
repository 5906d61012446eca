//! The four internal queues and the selection policy (spec §4.1).

use crate::scheduler::score::compute_priority_score;
use crate::scheduler::task::{Priority, TaskRecord, TaskStatus};
use std::collections::HashSet;
use uuid::Uuid;

/// Holds the priority, regular, and deferred queues. The periodic-due
/// "queue" has no separate storage here: periodic ticks are pushed
/// directly into whichever of these three queues matches their declared
/// priority at fire time (spec §4.1).
#[derive(Debug, Default)]
pub struct Queues {
    priority: Vec<TaskRecord>,
    regular: Vec<TaskRecord>,
    deferred: Vec<TaskRecord>,
}

impl Queues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `record` into the queue matching its priority level.
    /// `critical` goes to the priority queue, `deferred` to the deferred
    /// queue, everything else to the regular queue.
    pub fn enqueue(&mut self, mut record: TaskRecord) {
        record.status = TaskStatus::Queued;
        match record.task.priority {
            Priority::Critical => self.priority.push(record),
            Priority::Deferred => self.deferred.push(record),
            Priority::High | Priority::Normal | Priority::Low => self.regular.push(record),
        }
    }

    /// Directly place a task into the deferred queue (used when a task's
    /// dependencies are unmet at submission time; spec §4.1 "Dependency
    /// unmet → task goes straight to deferred").
    pub fn defer(&mut self, mut record: TaskRecord) {
        record.status = TaskStatus::Deferred;
        self.deferred.push(record);
    }

    /// Remove a queued task by id, if present and not yet running.
    pub fn remove(&mut self, id: Uuid) -> Option<TaskRecord> {
        for queue in [&mut self.priority, &mut self.regular, &mut self.deferred] {
            if let Some(pos) = queue.iter().position(|r| r.task.id == id) {
                return Some(queue.remove(pos));
            }
        }
        None
    }

    /// Find a queued task's current record without removing it.
    #[must_use]
    pub fn peek(&self, id: Uuid) -> Option<&TaskRecord> {
        [&self.priority, &self.regular, &self.deferred]
            .into_iter()
            .flat_map(|q| q.iter())
            .find(|r| r.task.id == id)
    }

    fn all_declared_dependencies(&self) -> HashSet<Uuid> {
        [&self.priority, &self.regular, &self.deferred]
            .into_iter()
            .flatten()
            .flat_map(|r| r.task.dependencies.iter().copied())
            .collect()
    }

    fn pop_best(queue: &mut Vec<TaskRecord>, dependency_ids: &HashSet<Uuid>) -> Option<TaskRecord> {
        if queue.is_empty() {
            return None;
        }
        let best_idx = queue
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let is_dep = dependency_ids.contains(&r.task.id);
                (i, compute_priority_score(r, is_dep), r.task.created_at)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.2.cmp(&b.2)))
            .map(|(i, _, _)| i)?;
        Some(queue.remove(best_idx))
    }

    fn pop_best_ready(
        queue: &mut Vec<TaskRecord>,
        completed: &HashSet<Uuid>,
        dependency_ids: &HashSet<Uuid>,
    ) -> Option<TaskRecord> {
        if queue.is_empty() {
            return None;
        }
        let best_idx = queue
            .iter()
            .enumerate()
            .filter(|(_, r)| r.task.dependencies_met(completed))
            .map(|(i, r)| {
                let is_dep = dependency_ids.contains(&r.task.id);
                (i, compute_priority_score(r, is_dep), r.task.created_at)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.2.cmp(&b.2)))
            .map(|(i, _, _)| i)?;
        Some(queue.remove(best_idx))
    }

    /// Select the next task to run, per spec §4.1's selection policy.
    ///
    /// `resource_constrained` corresponds to "system CPU > 80% or memory >
    /// 85%": when true, only the priority queue is served.
    pub fn select_next(
        &mut self,
        resource_constrained: bool,
        completed: &HashSet<Uuid>,
    ) -> Option<TaskRecord> {
        let dependency_ids = self.all_declared_dependencies();

        if let Some(record) = Self::pop_best(&mut self.priority, &dependency_ids) {
            return Some(record);
        }
        if resource_constrained {
            return None;
        }
        if let Some(record) = Self::pop_best(&mut self.regular, &dependency_ids) {
            return Some(record);
        }
        Self::pop_best_ready(&mut self.deferred, completed, &dependency_ids)
    }

    /// Total number of queued (not running) tasks across all queues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.priority.len() + self.regular.len() + self.deferred.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::task::Task;

    fn record(priority: Priority) -> TaskRecord {
        TaskRecord::new(Task::new("t", priority))
    }

    #[test]
    fn critical_goes_to_priority_queue_and_is_selected_first() {
        let mut queues = Queues::new();
        queues.enqueue(record(Priority::Low));
        queues.enqueue(record(Priority::Critical));

        let next = queues.select_next(false, &HashSet::new()).unwrap();
        assert_eq!(next.task.priority, Priority::Critical);
    }

    #[test]
    fn resource_constrained_only_serves_priority_queue() {
        let mut queues = Queues::new();
        queues.enqueue(record(Priority::Normal));

        assert!(queues.select_next(true, &HashSet::new()).is_none());
        assert_eq!(queues.len(), 1);
    }

    #[test]
    fn deferred_task_with_unmet_dependencies_is_skipped() {
        let mut queues = Queues::new();
        let blocked = Task::new("t", Priority::Deferred).depends_on([Uuid::new_v4()]);
        queues.defer(TaskRecord::new(blocked));

        assert!(queues.select_next(false, &HashSet::new()).is_none());
        assert_eq!(queues.len(), 1);
    }

    #[test]
    fn deferred_task_runs_once_dependencies_complete() {
        let mut queues = Queues::new();
        let dep_id = Uuid::new_v4();
        let blocked = Task::new("t", Priority::Deferred).depends_on([dep_id]);
        queues.defer(TaskRecord::new(blocked));

        let mut completed = HashSet::new();
        completed.insert(dep_id);

        let next = queues.select_next(false, &completed);
        assert!(next.is_some());
    }

    #[test]
    fn remove_deletes_queued_task() {
        let mut queues = Queues::new();
        let rec = record(Priority::Normal);
        let id = rec.task.id;
        queues.enqueue(rec);

        assert!(queues.remove(id).is_some());
        assert!(queues.is_empty());
    }
}
