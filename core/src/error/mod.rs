//! Error taxonomy for the background intelligence core.
//!
//! Mirrors the classification in the design's error-handling section: input
//! errors are non-fatal and recorded on the item, transient store errors are
//! retried with backoff, permanent errors fail the task terminally, and
//! privacy-boundary violations are never retried.

use uuid::Uuid;

/// Result type alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types produced by the scheduler, indexing pipeline, contemplation
/// engine, session bridge, and storage orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A store operation failed in a way that is worth retrying
    /// (timeout, busy connection, transient network failure).
    #[error("transient storage error: {0}")]
    TransientStorage(String),

    /// A store operation failed in a way retrying cannot fix
    /// (schema mismatch, auth denied, disk full).
    #[error("permanent storage error: {0}")]
    PermanentStorage(String),

    /// Input could not be parsed (malformed session file, unparseable code,
    /// unknown encoding). The item is skipped, not the whole batch.
    #[error("input error: {0}")]
    InvalidInput(String),

    /// An operation was attempted against a record in the wrong lifecycle
    /// state (e.g. appending to a sealed session).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A referenced entity (task, session, fact, bridge, ...) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A non-private code path attempted to read Raw Store private-blob
    /// content. Treated as a bug, never retried, always logged at alert
    /// level by the caller.
    #[error("privacy boundary violation: {0}")]
    PrivacyViolation(String),

    /// A `SessionBridge` failed its checksum on activation. Never fatal —
    /// callers fall back to the partial-restore path.
    #[error("bridge checksum mismatch: {bridge_id}")]
    ChecksumMismatch {
        /// The bridge whose checksum failed to verify.
        bridge_id: Uuid,
    },

    /// The embedding service is unavailable; callers queue the write with
    /// `embedding_pending = true` and degrade reads to keyword-only search.
    #[error("embedding service unavailable")]
    EmbeddingUnavailable,

    /// The storage circuit breaker is open; the call was rejected without
    /// reaching the backend.
    #[error("circuit breaker open")]
    CircuitBreakerOpen,

    /// A scheduled task's dependency graph could not be satisfied without a
    /// cycle.
    #[error("task dependency cycle involving {0}")]
    DependencyCycle(Uuid),

    /// Serialization/deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem or other I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error represents a condition worth retrying with
    /// backoff (scheduler-level retry, storage circuit breaker).
    ///
    /// Matches spec §7: transient store errors and embedding-service
    /// unavailability are recoverable; malformed input, invalid state,
    /// not-found, privacy violations, checksum mismatches, and dependency
    /// cycles are not.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::TransientStorage(_)
            | Error::EmbeddingUnavailable
            | Error::CircuitBreakerOpen
            | Error::Io(_) => true,
            Error::PermanentStorage(_)
            | Error::InvalidInput(_)
            | Error::InvalidState(_)
            | Error::NotFound(_)
            | Error::PrivacyViolation(_)
            | Error::ChecksumMismatch { .. }
            | Error::DependencyCycle(_)
            | Error::Serialization(_) => false,
        }
    }

    /// Whether this error must never be silently retried and should be
    /// surfaced as an alert-level log event (spec §7: "treated as a bug,
    /// not a runtime recoverable condition").
    #[must_use]
    pub fn is_privacy_violation(&self) -> bool {
        matches!(self, Error::PrivacyViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_storage_is_recoverable() {
        assert!(Error::TransientStorage("timeout".into()).is_recoverable());
    }

    #[test]
    fn permanent_storage_is_not_recoverable() {
        assert!(!Error::PermanentStorage("disk full".into()).is_recoverable());
    }

    #[test]
    fn privacy_violation_is_never_recoverable() {
        let err = Error::PrivacyViolation("attempted read-through".into());
        assert!(!err.is_recoverable());
        assert!(err.is_privacy_violation());
    }

    #[test]
    fn checksum_mismatch_is_not_recoverable() {
        let err = Error::ChecksumMismatch {
            bridge_id: Uuid::new_v4(),
        };
        assert!(!err.is_recoverable());
    }
}
