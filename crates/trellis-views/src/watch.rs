//! Reload-on-change for development.
//!
//! Editors emit several events per save, so changes are debounced: the
//! registry is reloaded once the tree has been quiet for a short period.

use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use notify::{RecursiveMode, Watcher};

use crate::error::{LoadError, WatchError};
use crate::handle::RegistryHandle;
use crate::registry::Registry;

/// Default quiet period before a reload.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(100);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Tracks the deadline of a pending reload.
///
/// Every recorded change pushes the deadline out by the quiet period.
pub(crate) struct ReloadDebouncer {
    deadline: Mutex<Option<Instant>>,
    quiet: Duration,
}

impl ReloadDebouncer {
    pub(crate) fn new(quiet: Duration) -> Self {
        Self {
            deadline: Mutex::new(None),
            quiet,
        }
    }

    pub(crate) fn record(&self) {
        let mut deadline = self.deadline.lock().unwrap_or_else(PoisonError::into_inner);
        *deadline = Some(Instant::now() + self.quiet);
    }

    /// Whether a pending reload is due. Clears it if so.
    pub(crate) fn take_ready(&self) -> bool {
        let mut deadline = self.deadline.lock().unwrap_or_else(PoisonError::into_inner);
        match *deadline {
            Some(at) if at <= Instant::now() => {
                *deadline = None;
                true
            }
            _ => false,
        }
    }
}

fn is_change(kind: notify::EventKind) -> bool {
    matches!(
        kind,
        notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
    )
}

/// Guard for a running watcher.
///
/// Dropping it stops watching; an in-flight reload still completes.
pub struct ReloadWatcher {
    shutdown: Option<mpsc::Sender<()>>,
}

impl ReloadWatcher {
    /// Stop watching now.
    pub fn stop(mut self) {
        self.shutdown.take();
    }
}

impl RegistryHandle {
    /// Watch the views root and reload after each burst of changes.
    ///
    /// `on_reload` is called from the watcher thread with the outcome of
    /// every reload. A failed reload leaves the previous registry live.
    pub fn watch<F>(
        self: &Arc<Self>,
        quiet: Duration,
        on_reload: F,
    ) -> Result<ReloadWatcher, WatchError>
    where
        F: Fn(&Result<Arc<Registry>, LoadError>) + Send + 'static,
    {
        let watch_error = |source| WatchError {
            path: self.root().to_path_buf(),
            source,
        };

        let debouncer = Arc::new(ReloadDebouncer::new(quiet));
        let watcher_debouncer = Arc::clone(&debouncer);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res
                && is_change(event.kind)
            {
                watcher_debouncer.record();
            }
        })
        .map_err(watch_error)?;
        watcher
            .watch(self.root(), RecursiveMode::Recursive)
            .map_err(watch_error)?;

        tracing::info!(root = %self.root().display(), "Watching views for changes");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let handle = Arc::clone(self);
        std::thread::spawn(move || {
            let _watcher = watcher;
            loop {
                match shutdown_rx.recv_timeout(POLL_INTERVAL) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                }
                if debouncer.take_ready() {
                    tracing::debug!(root = %handle.root().display(), "Views changed");
                    on_reload(&handle.reload());
                }
            }
            tracing::debug!(root = %handle.root().display(), "Stopped watching views");
        });

        Ok(ReloadWatcher {
            shutdown: Some(shutdown_tx),
        })
    }
}
