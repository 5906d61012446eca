//! Configuration tree mirroring `config.json`'s recognized keys (spec §6).
//!
//! Parsing `config.json` off disk and wiring CLI flags is the external
//! config-loader collaborator named in spec §1; the core only consumes an
//! already-populated [`Config`].

use serde::{Deserialize, Serialize};

/// Top-level configuration for the background intelligence core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub session_continuity: SessionContinuityConfig,
    #[serde(default)]
    pub contemplation: ContemplationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            indexing: IndexingConfig::default(),
            session_continuity: SessionContinuityConfig::default(),
            contemplation: ContemplationConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// `scheduler.*` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// `scheduler.max_workers` — upper bound on the worker pool.
    pub max_workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { max_workers: 4 }
    }
}

/// `daemon.services.indexing.*` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// `daemon.services.indexing.batch_size`.
    pub batch_size: usize,
    /// `daemon.services.indexing.batch_timeout_s`.
    pub batch_timeout_s: u64,
    /// Bounded-channel capacity backing the indexing input (spec §5).
    pub input_channel_capacity: usize,
    /// Per-path debounce for change-detection events (spec §5, default 200ms).
    pub watcher_debounce_ms: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_timeout_s: 5,
            input_channel_capacity: 1000,
            watcher_debounce_ms: 200,
        }
    }
}

/// `daemon.services.sessionContinuity.*` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContinuityConfig {
    /// `bridgeRetentionDays` — activated bridges older than this are pruned;
    /// unactivated bridges are pruned at `2x` this horizon (spec §4.4).
    pub bridge_retention_days: u32,
    /// `autoHandoff` — capture a bridge automatically on session close.
    pub auto_handoff: bool,
}

impl Default for SessionContinuityConfig {
    fn default() -> Self {
        Self {
            bridge_retention_days: 30,
            auto_handoff: true,
        }
    }
}

/// How the contemplation interval varies over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RhythmPattern {
    /// Variable, CPU-sensitive.
    Natural,
    /// Fixed, shorter interval.
    Focused,
    /// Fixed, longer interval.
    Exploratory,
}

/// `consciousness.contemplationIntegration.*` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContemplationConfig {
    /// `intervalMs` — base contemplation interval.
    pub interval_ms: u64,
    /// `rhythmPattern`.
    pub rhythm_pattern: RhythmPattern,
    /// `depthLevel` — in `[0, 1]`; influences the Insight Synthesizer's
    /// novelty threshold.
    pub depth_level: f32,
    /// `batch_size` items gathered per cycle (spec §4.3 step 1).
    pub batch_size: usize,
    /// CPU percent below which a cycle may proceed (spec §4.3).
    pub cpu_threshold_pct: f32,
    /// Memory percent below which a cycle may proceed (spec §4.3).
    pub memory_threshold_pct: f32,
}

impl Default for ContemplationConfig {
    fn default() -> Self {
        Self {
            interval_ms: 300_000,
            rhythm_pattern: RhythmPattern::Natural,
            depth_level: 0.5,
            batch_size: 100,
            cpu_threshold_pct: 30.0,
            memory_threshold_pct: 70.0,
        }
    }
}

/// `storage.*` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `storage.chroma_dimensions` — embedding dimension, must match the
    /// Embedding Service.
    pub chroma_dimensions: usize,
    /// Root directory for `databases/`, `conversations/`, etc (spec §6).
    pub home_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            chroma_dimensions: 768,
            home_dir: "~/.noesis".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.scheduler.max_workers, 4);
        assert_eq!(cfg.indexing.batch_size, 10);
        assert_eq!(cfg.indexing.batch_timeout_s, 5);
        assert_eq!(cfg.session_continuity.bridge_retention_days, 30);
        assert_eq!(cfg.contemplation.interval_ms, 300_000);
        assert_eq!(cfg.storage.chroma_dimensions, 768);
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let json = r#"{ "scheduler": { "max_workers": 8 } }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.scheduler.max_workers, 8);
        assert_eq!(cfg.indexing.batch_size, 10);
    }
}
