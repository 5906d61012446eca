//! Change-detection layer (design note §9): a capability trait any
//! source of file-change events can implement, plus a polling reference
//! implementation that content-hashes watched paths and debounces rapid
//! successive changes.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::instrument;

/// Debounce window: a path that changes again within this window of its
/// last reported change is not reported a second time (design note §9).
pub const DEBOUNCE: Duration = Duration::from_millis(200);

/// One observed filesystem change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
}

/// Capability a change source exposes to the indexing pipeline. A real
/// implementation might sit on inotify/FSEvents; [`PollingWatcher`] is a
/// portable reference implementation for sources without one.
pub trait ChangeWatcher: Send + Sync {
    fn on_created(&mut self, path: &Path);
    fn on_modified(&mut self, path: &Path);
    fn on_deleted(&mut self, path: &Path);
}

/// Debounced content-hash records the poller compares each path against.
#[derive(Debug, Clone)]
struct WatchedState {
    hash: Option<String>,
    last_reported: Option<Instant>,
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Polls a fixed set of paths on demand, diffing content hashes against
/// the previous poll to produce [`ChangeEvent`]s, debounced per path.
pub struct PollingWatcher {
    state: HashMap<PathBuf, WatchedState>,
    debounce: Duration,
}

impl Default for PollingWatcher {
    fn default() -> Self {
        Self::new(DEBOUNCE)
    }
}

impl PollingWatcher {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: HashMap::new(),
            debounce,
        }
    }

    /// Poll `paths`, reading each with `read` (injected so callers can
    /// test without touching the real filesystem), and return the
    /// debounced set of changes since the last call.
    #[instrument(skip(self, paths, read))]
    pub fn poll<R>(&mut self, paths: &[PathBuf], read: R, now: Instant) -> Result<Vec<ChangeEvent>>
    where
        R: Fn(&Path) -> std::io::Result<Vec<u8>>,
    {
        let mut events = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for path in paths {
            seen.insert(path.clone());
            let content = match read(path) {
                Ok(bytes) => Some(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(Error::Io(e)),
            };
            let new_hash = content.as_deref().map(hash_bytes);

            let entry = self.state.entry(path.clone()).or_insert(WatchedState {
                hash: None,
                last_reported: None,
            });

            let debounced = entry
                .last_reported
                .is_some_and(|last| now.saturating_duration_since(last) < self.debounce);

            if new_hash != entry.hash && !debounced {
                let event = match (&entry.hash, &new_hash) {
                    (None, Some(_)) => ChangeEvent::Created(path.clone()),
                    (Some(_), Some(_)) => ChangeEvent::Modified(path.clone()),
                    (Some(_), None) => ChangeEvent::Deleted(path.clone()),
                    (None, None) => continue,
                };
                events.push(event);
                entry.last_reported = Some(now);
            }
            entry.hash = new_hash;
        }

        // Paths dropped from the watch list are treated as deleted once,
        // then forgotten.
        let vanished: Vec<PathBuf> = self
            .state
            .keys()
            .filter(|p| !seen.contains(*p))
            .cloned()
            .collect();
        for path in vanished {
            if self.state.get(&path).and_then(|s| s.hash.as_ref()).is_some() {
                events.push(ChangeEvent::Deleted(path.clone()));
            }
            self.state.remove(&path);
        }

        Ok(events)
    }
}

/// Dispatches a batch of [`ChangeEvent`]s to a [`ChangeWatcher`].
pub fn dispatch(watcher: &mut dyn ChangeWatcher, events: &[ChangeEvent]) {
    for event in events {
        match event {
            ChangeEvent::Created(p) => watcher.on_created(p),
            ChangeEvent::Modified(p) => watcher.on_modified(p),
            ChangeEvent::Deleted(p) => watcher.on_deleted(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn reader(files: &HashMap<PathBuf, Vec<u8>>) -> impl Fn(&Path) -> io::Result<Vec<u8>> + '_ {
        move |path: &Path| {
            files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
    }

    #[test]
    fn first_poll_reports_created_for_every_existing_path() {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("a.rs"), b"fn main() {}".to_vec());
        let mut watcher = PollingWatcher::new(DEBOUNCE);

        let events = watcher
            .poll(&[PathBuf::from("a.rs")], reader(&files), Instant::now())
            .unwrap();
        assert_eq!(events, vec![ChangeEvent::Created(PathBuf::from("a.rs"))]);
    }

    #[test]
    fn unchanged_content_reports_nothing_on_second_poll() {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("a.rs"), b"fn main() {}".to_vec());
        let mut watcher = PollingWatcher::new(DEBOUNCE);
        let t0 = Instant::now();

        watcher.poll(&[PathBuf::from("a.rs")], reader(&files), t0).unwrap();
        let events = watcher
            .poll(&[PathBuf::from("a.rs")], reader(&files), t0 + Duration::from_secs(1))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn modified_content_is_reported_after_debounce_window() {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("a.rs"), b"fn main() {}".to_vec());
        let mut watcher = PollingWatcher::new(DEBOUNCE);
        let t0 = Instant::now();
        watcher.poll(&[PathBuf::from("a.rs")], reader(&files), t0).unwrap();

        files.insert(PathBuf::from("a.rs"), b"fn main() { changed() }".to_vec());
        let events = watcher
            .poll(&[PathBuf::from("a.rs")], reader(&files), t0 + Duration::from_millis(300))
            .unwrap();
        assert_eq!(events, vec![ChangeEvent::Modified(PathBuf::from("a.rs"))]);
    }

    #[test]
    fn modification_within_debounce_window_is_suppressed() {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("a.rs"), b"v1".to_vec());
        let mut watcher = PollingWatcher::new(DEBOUNCE);
        let t0 = Instant::now();
        watcher.poll(&[PathBuf::from("a.rs")], reader(&files), t0).unwrap();

        files.insert(PathBuf::from("a.rs"), b"v2".to_vec());
        let events = watcher
            .poll(&[PathBuf::from("a.rs")], reader(&files), t0 + Duration::from_millis(50))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn removed_path_is_reported_deleted_once() {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("a.rs"), b"v1".to_vec());
        let mut watcher = PollingWatcher::new(DEBOUNCE);
        let t0 = Instant::now();
        watcher.poll(&[PathBuf::from("a.rs")], reader(&files), t0).unwrap();

        let events = watcher.poll(&[], reader(&files), t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(events, vec![ChangeEvent::Deleted(PathBuf::from("a.rs"))]);

        let events2 = watcher.poll(&[], reader(&files), t0 + Duration::from_secs(2)).unwrap();
        assert!(events2.is_empty());
    }

    struct RecordingWatcher {
        created: Vec<PathBuf>,
        modified: Vec<PathBuf>,
        deleted: Vec<PathBuf>,
    }

    impl ChangeWatcher for RecordingWatcher {
        fn on_created(&mut self, path: &Path) {
            self.created.push(path.to_path_buf());
        }
        fn on_modified(&mut self, path: &Path) {
            self.modified.push(path.to_path_buf());
        }
        fn on_deleted(&mut self, path: &Path) {
            self.deleted.push(path.to_path_buf());
        }
    }

    #[test]
    fn dispatch_routes_events_to_matching_callback() {
        let mut watcher = RecordingWatcher {
            created: vec![],
            modified: vec![],
            deleted: vec![],
        };
        dispatch(
            &mut watcher,
            &[
                ChangeEvent::Created(PathBuf::from("a")),
                ChangeEvent::Modified(PathBuf::from("b")),
                ChangeEvent::Deleted(PathBuf::from("c")),
            ],
        );
        assert_eq!(watcher.created, vec![PathBuf::from("a")]);
        assert_eq!(watcher.modified, vec![PathBuf::from("b")]);
        assert_eq!(watcher.deleted, vec![PathBuf::from("c")]);
    }
}
