//! Watch mode
//!
//! Re-runs annotation when a watched file changes. Filesystem events from
//! `notify` are coalesced by a [`Debouncer`]: every change restarts the quiet
//! period, and the file is handed to the handler only once edits stop. The
//! loop is single-threaded; the handler runs to completion before the next
//! event is looked at, and in-flight work is never cancelled. The session runs
//! until the process is interrupted or the watcher goes away.

use crate::error::ApiError;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default quiet period before a change is acted on.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Longest wait for an event while nothing is pending.
const IDLE_TICK: Duration = Duration::from_millis(250);

/// Coalesces bursts of triggers per key into one firing after a quiet period.
#[derive(Debug)]
pub struct Debouncer<K> {
    quiet: Duration,
    pending: HashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: HashMap::new(),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Schedule `key`, replacing any deadline it already had.
    pub fn trigger(&mut self, key: K, now: Instant) {
        self.pending.insert(key, now + self.quiet);
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every key whose deadline has passed, earliest first.
    pub fn poll(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(Instant, K)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (*deadline, key.clone()))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);
        for (_, key) in &due {
            self.pending.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Handle for a registered listener. Disposing (or dropping) unregisters it.
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.teardown.is_some()
    }

    /// Unregister. Later calls are no-ops.
    pub fn dispose(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Owns every outstanding subscription of a session.
#[derive(Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn dispose_all(&mut self) {
        for mut subscription in self.subscriptions.drain(..) {
            subscription.dispose();
        }
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// Watches a single file and calls a handler once per burst of edits.
pub struct WatchSession {
    target: PathBuf,
    config: WatchConfig,
    subscriptions: SubscriptionSet,
}

impl WatchSession {
    pub fn new(target: &Path, config: WatchConfig) -> Self {
        Self {
            target: target.to_path_buf(),
            config,
            subscriptions: SubscriptionSet::new(),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Block, calling `on_change` after each quiet period following an edit.
    ///
    /// The parent directory is watched so editors that save by rename are
    /// still seen. Returns when the watcher goes away.
    pub fn run<F>(&mut self, mut on_change: F) -> Result<(), ApiError>
    where
        F: FnMut(&Path),
    {
        let directory = self
            .target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let (tx, rx) = mpsc::channel();
        let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
            if let Err(e) = tx.send(res) {
                error!("Error sending watch event: {}", e);
            }
        })
        .map_err(|e| ApiError::ConfigError(format!("Failed to create watcher: {}", e)))?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| {
                ApiError::ConfigError(format!(
                    "Failed to watch {}: {}",
                    directory.display(),
                    e
                ))
            })?;

        let watched = directory.clone();
        self.subscriptions.push(Subscription::new(move || {
            let mut watcher = watcher;
            if let Err(e) = watcher.unwatch(&watched) {
                debug!(error = %e, "Watcher already detached");
            }
        }));

        let mut debouncer = Debouncer::new(Duration::from_millis(self.config.debounce_ms));
        info!(
            file = %self.target.display(),
            debounce_ms = debouncer.quiet_period().as_millis() as u64,
            "Watching file"
        );
        loop {
            let timeout = debouncer
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_TICK);

            match rx.recv_timeout(timeout) {
                Ok(Ok(event)) => {
                    if is_relevant(&event, &self.target) {
                        debug!(kind = ?event.kind, "Change detected");
                        debouncer.trigger(self.target.clone(), Instant::now());
                    }
                }
                Ok(Err(e)) => {
                    warn!("Watch error: {}", e);
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    error!("Watcher channel disconnected");
                    break;
                }
            }

            for path in debouncer.poll(Instant::now()) {
                on_change(&path);
            }
        }

        self.subscriptions.dispose_all();
        Ok(())
    }
}

/// True when `event` is a content change, creation or rename touching `target`.
fn is_relevant(event: &Event, target: &Path) -> bool {
    let kind_matches = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_)
    );
    kind_matches && event.paths.iter().any(|p| same_file(p, target))
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.file_name().is_some() && a.file_name() == b.file_name() && a.parent() == b.parent(),
    }
}
