#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unused_self)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::assigning_clones)]
#![allow(clippy::borrowed_box)]
#![allow(clippy::float_cmp)]
#![allow(clippy::ref_option)]

//! # Noesis Core
//!
//! Core data structures and subsystems for a background intelligence core:
//! a per-user daemon that schedules its own upkeep work, indexes
//! conversations and codebases into searchable memory, periodically
//! reflects on what it has indexed, and bridges context across sessions.
//!
//! ## Module Organization
//!
//! - [`types`]: The shared data model — conversations, chunks, facts,
//!   patterns, insights, session bridges.
//! - [`config`]: Daemon configuration, mirroring the on-disk config file.
//! - [`error`]: The error taxonomy shared by every subsystem.
//! - [`retry`]: Generic exponential-backoff retry policy for recoverable
//!   storage failures.
//! - [`storage`]: The Storage Orchestrator — routes writes between the Raw
//!   Store and Semantic Store and enforces the privacy partition.
//! - [`scheduler`]: The Task Scheduler — priority queues, adaptive worker
//!   pool, periodic jobs.
//! - [`indexing`]: The Indexing Pipeline — conversation, codebase, and
//!   memory indexers, the search contract, and the change-detection layer.
//! - [`contemplation`]: The Contemplation Engine — the gather/extract/
//!   recognize/synthesize/cache cycle.
//! - [`bridge`]: The Session-Continuity Bridge — capture, handoff
//!   derivation, activation, and retention across sessions.
//! - [`retrieval`]: Search-result and insight caching shared across
//!   subsystems.
//!
//! ## Error Handling
//!
//! Most functions return [`Result<T>`] for proper error handling:
//!
//! ```no_run
//! use noesis_core::{Error, Result};
//!
//! async fn example() -> Result<()> {
//!     // Operations that can fail
//!     // .await?
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod contemplation;
pub mod error;
pub mod indexing;
pub mod retrieval;
pub mod retry;
pub mod scheduler;
pub mod storage;
pub mod types;

pub use bridge::BridgeManager;
pub use config::Config;
pub use contemplation::{ContemplationEngine, Mode};
pub use error::{Error, Result};
pub use retrieval::{CacheKey, CacheMetrics, QueryCache};
pub use retry::{RetryConfig, RetryMetrics, RetryPolicy, Retryable};
pub use scheduler::score::compute_priority_score;
pub use scheduler::task::{Priority, Task, TaskRecord, TaskStatus};
pub use scheduler::Scheduler;
pub use storage::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use storage::{Orchestrator, StoreOutcome, StoreRequest};
