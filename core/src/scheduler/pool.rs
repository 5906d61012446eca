//! Adaptive worker pool: samples real CPU/memory pressure and grows or
//! shrinks the number of active workers accordingly (spec §4.1).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use sysinfo::System;
use tokio::sync::Notify;

/// Current system load, as sampled by `LoadSampler`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemLoad {
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

impl SystemLoad {
    /// Spec §4.1 step 1: CPU > 80% or memory > 85% restricts the
    /// scheduler to the priority queue only.
    #[must_use]
    pub fn is_resource_constrained(self) -> bool {
        self.cpu_percent > 80.0 || self.memory_percent > 85.0
    }

    /// Spec §4.1 worker-pool rule: CPU > 90% or memory > 90% sheds a
    /// worker.
    #[must_use]
    pub fn should_shrink(self) -> bool {
        self.cpu_percent > 90.0 || self.memory_percent > 90.0
    }

    /// Spec §4.1 worker-pool rule: CPU < 50% and memory < 70% allows
    /// growing up to `max_workers`.
    #[must_use]
    pub fn should_grow(self) -> bool {
        self.cpu_percent < 50.0 && self.memory_percent < 70.0
    }
}

/// Wraps `sysinfo::System` to report current CPU/memory pressure.
pub struct LoadSampler {
    system: System,
}

impl LoadSampler {
    #[must_use]
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self { system }
    }

    /// Refresh and return the current system load. Callers are expected
    /// to call this roughly every 30s (spec §4.1's pool re-evaluation
    /// interval); `sysinfo` requires a settling interval between CPU
    /// refreshes to report accurate usage.
    pub fn sample(&mut self) -> SystemLoad {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let cpu_percent = if self.system.cpus().is_empty() {
            0.0
        } else {
            self.system.cpus().iter().map(sysinfo::Cpu::cpu_usage).sum::<f32>()
                / self.system.cpus().len() as f32
        };
        let memory_percent = if self.system.total_memory() == 0 {
            0.0
        } else {
            (self.system.used_memory() as f64 / self.system.total_memory() as f64 * 100.0) as f32
        };

        SystemLoad {
            cpu_percent,
            memory_percent,
        }
    }
}

impl Default for LoadSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks how many workers are currently active, bounded to
/// `[1, max_workers]`, and a shutdown signal workers watch cooperatively.
pub struct WorkerPool {
    active: AtomicUsize,
    max_workers: usize,
    shutdown: Arc<Notify>,
}

impl WorkerPool {
    #[must_use]
    pub fn new(max_workers: usize) -> Self {
        Self {
            active: AtomicUsize::new(1),
            max_workers: max_workers.max(1),
            shutdown: Arc::new(Notify::new()),
        }
    }

    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Apply one pool-sizing decision based on `load`. Returns the signed
    /// delta actually applied (e.g. `1` for a spawn, `-1` for a shrink,
    /// `0` if at a bound or load is in the steady band).
    pub fn adjust(&self, load: SystemLoad) -> i64 {
        if load.should_shrink() {
            let mut current = self.active.load(Ordering::Relaxed);
            loop {
                if current <= 1 {
                    return 0;
                }
                match self.active.compare_exchange(
                    current,
                    current - 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        self.shutdown.notify_one();
                        return -1;
                    }
                    Err(observed) => current = observed,
                }
            }
        } else if load.should_grow() {
            let mut current = self.active.load(Ordering::Relaxed);
            loop {
                if current >= self.max_workers {
                    return 0;
                }
                match self.active.compare_exchange(
                    current,
                    current + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return 1,
                    Err(observed) => current = observed,
                }
            }
        } else {
            0
        }
    }

    /// Cooperative shutdown signal a worker can `.notified().await` on at
    /// suspension points (spec §5's cancellation model).
    #[must_use]
    pub fn shutdown_signal(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(cpu: f32, mem: f32) -> SystemLoad {
        SystemLoad {
            cpu_percent: cpu,
            memory_percent: mem,
        }
    }

    #[test]
    fn high_cpu_is_resource_constrained() {
        assert!(load(85.0, 10.0).is_resource_constrained());
        assert!(!load(10.0, 10.0).is_resource_constrained());
    }

    #[test]
    fn pool_grows_under_light_load_up_to_max() {
        let pool = WorkerPool::new(3);
        assert_eq!(pool.adjust(load(10.0, 10.0)), 1);
        assert_eq!(pool.active(), 2);
        assert_eq!(pool.adjust(load(10.0, 10.0)), 1);
        assert_eq!(pool.active(), 3);
        assert_eq!(pool.adjust(load(10.0, 10.0)), 0);
        assert_eq!(pool.active(), 3);
    }

    #[test]
    fn pool_shrinks_under_heavy_load_but_never_below_one() {
        let pool = WorkerPool::new(3);
        pool.adjust(load(10.0, 10.0));
        pool.adjust(load(10.0, 10.0));
        assert_eq!(pool.active(), 3);

        assert_eq!(pool.adjust(load(95.0, 10.0)), -1);
        assert_eq!(pool.adjust(load(95.0, 10.0)), -1);
        assert_eq!(pool.active(), 1);
        assert_eq!(pool.adjust(load(95.0, 10.0)), 0);
        assert_eq!(pool.active(), 1);
    }

    #[test]
    fn steady_band_does_not_change_pool_size() {
        let pool = WorkerPool::new(3);
        assert_eq!(pool.adjust(load(65.0, 75.0)), 0);
        assert_eq!(pool.active(), 1);
    }
}
