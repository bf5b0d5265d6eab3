use std::path::{Path, PathBuf};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use hlive_model::{ChangeEvent, ChangeKind};

use crate::{WatchError, WatchState, changes};

const EVENT_BUFFER: usize = 256;
const ERROR_BUFFER: usize = 32;

/// Receiving ends handed to the restart loop.
///
/// Both channels close once the detector stops (cancellation or backend
/// shutdown).
pub struct ChangeStream {
    pub events: mpsc::Receiver<ChangeEvent>,
    pub errors: mpsc::Receiver<WatchError>,
}

pub struct ChangeDetector {
    root: PathBuf,
}

impl ChangeDetector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register the tree and start forwarding events until `cancel` fires.
    ///
    /// Every directory is registered before this returns, so no change made
    /// afterwards is missed. Failing subdirectories are logged and skipped;
    /// failing to watch the root itself is an error.
    pub fn spawn(self, cancel: CancellationToken) -> Result<ChangeStream, WatchError> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = raw_tx.send(res);
            },
            Config::default(),
        )
        .map_err(WatchError::Init)?;

        let mut state = WatchState::new(&self.root);
        let mut errors = state.register_tree(&self.root, |dir| {
            watcher.watch(dir, RecursiveMode::NonRecursive)
        });
        if !state.contains(&self.root) {
            let pos = errors
                .iter()
                .position(|e| matches!(e, WatchError::Register { path, .. } if *path == self.root));
            return Err(match pos {
                Some(pos) => errors.swap_remove(pos),
                None => WatchError::register(&self.root, notify::Error::path_not_found()),
            });
        }
        for err in &errors {
            warn!(target: "hlive.watch", error = %err, "directory left unmonitored");
        }
        info!(target: "hlive.watch", root = %self.root.display(), dirs = state.len(), "watching for changes");

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (error_tx, error_rx) = mpsc::channel(ERROR_BUFFER);
        let pump = Pump {
            watcher,
            state,
            events: event_tx,
            errors: error_tx,
        };
        tokio::spawn(pump.run(raw_rx, cancel));

        Ok(ChangeStream {
            events: event_rx,
            errors: error_rx,
        })
    }
}

/// Owns the backend watcher; dropping it closes every watch.
struct Pump {
    watcher: RecommendedWatcher,
    state: WatchState,
    events: mpsc::Sender<ChangeEvent>,
    errors: mpsc::Sender<WatchError>,
}

impl Pump {
    async fn run(
        mut self,
        mut raw: mpsc::UnboundedReceiver<notify::Result<Event>>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(target: "hlive.watch", "detector cancelled");
                    break;
                }
                res = raw.recv() => match res {
                    Some(Ok(event)) => {
                        if !self.handle(event).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        if self.errors.send(WatchError::Backend(e)).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        debug!(target: "hlive.watch", "backend channel closed");
                        break;
                    }
                }
            }
        }
    }

    /// Returns `false` once the consumer is gone.
    async fn handle(&mut self, event: Event) -> bool {
        let kind = event.kind;
        let found = changes(event);
        if found.is_empty() {
            trace!(target: "hlive.watch", kind = ?kind, "ignored event");
            return true;
        }

        // A directory moved in arrives as one create; its subtree is walked here.
        for (path, kind) in found {
            match kind {
                ChangeKind::Create if path.is_dir() => self.register_new_dir(&path).await,
                ChangeKind::Remove => {
                    self.state.forget(&path);
                }
                _ => {}
            }
            if self.events.send(ChangeEvent::new(path, kind)).await.is_err() {
                return false;
            }
        }
        true
    }

    async fn register_new_dir(&mut self, dir: &Path) {
        let watcher = &mut self.watcher;
        let errors = self
            .state
            .register_tree(dir, |d| watcher.watch(d, RecursiveMode::NonRecursive));
        debug!(target: "hlive.watch", dir = %dir.display(), "registered new directory");
        for err in errors {
            let _ = self.errors.send(err).await;
        }
    }
}
