use std::time::Duration;

use tokio::{
    task::{JoinError, JoinHandle},
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hlive_watch::ChangeStream;

use crate::{Debounce, RestartOutcome, launcher::Launcher};

/// Turns bursts of change events into single restarts.
///
/// At most one restart is in flight. Events that arrive meanwhile keep
/// re-arming the debounce; an elapsed deadline fires once the in-flight
/// restart has finished.
pub struct RestartCoordinator {
    launcher: Launcher,
    window: Duration,
    cancel: CancellationToken,
}

impl RestartCoordinator {
    pub(crate) fn new(launcher: Launcher, window: Duration, cancel: CancellationToken) -> Self {
        Self {
            launcher,
            window,
            cancel,
        }
    }

    /// Run until cancelled or until the change stream closes.
    ///
    /// Returns the number of restarts attempted.
    pub async fn run(self, mut stream: ChangeStream) -> usize {
        let mut debounce = Debounce::Idle;
        let mut inflight: Option<JoinHandle<RestartOutcome>> = None;
        let mut errors_open = true;
        let mut attempts = 0;

        loop {
            let deadline = debounce.deadline();
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!(target: "hlive.core", "coordinator cancelled");
                    break;
                }
                res = join(&mut inflight), if inflight.is_some() => {
                    inflight = None;
                    if let Err(e) = res {
                        warn!(target: "hlive.core", error = %e, "restart task aborted");
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() && inflight.is_none() => {
                    if debounce.fire(Instant::now()).is_some() {
                        attempts += 1;
                        let launcher = self.launcher.clone();
                        inflight = Some(tokio::spawn(launcher.restart(self.cancel.clone())));
                    }
                }
                ev = stream.events.recv() => match ev {
                    Some(ev) => {
                        info!(target: "hlive.core", path = %ev.path.display(), kind = %ev.kind, "file change detected");
                        debounce.arm(Instant::now(), self.window);
                    }
                    None => {
                        debug!(target: "hlive.core", "change stream closed");
                        break;
                    }
                },
                err = stream.errors.recv(), if errors_open => match err {
                    Some(e) => warn!(target: "hlive.core", error = %e, "watch error"),
                    None => errors_open = false,
                },
            }
        }

        if let Some(task) = inflight {
            if let Err(e) = task.await {
                warn!(target: "hlive.core", error = %e, "restart task aborted");
            }
        }
        attempts
    }
}

async fn join(task: &mut Option<JoinHandle<RestartOutcome>>) -> Result<RestartOutcome, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hlive_engine::{
        ContainerSupervisor, InputPump,
        testing::{Call, FakeEngine},
    };
    use hlive_model::{BindMount, ChangeEvent, ChangeKind, PortMapping, RunSpec};
    use hlive_watch::WatchError;
    use tokio::sync::mpsc;

    use crate::{HandleSlot, TerminationHandler};

    const WINDOW: Duration = Duration::from_secs(2);

    fn spec() -> RunSpec {
        RunSpec::new("fortinet-hugo:latest", ["server", "--poll"])
            .with_mount(BindMount::new("/tmp", "/home/UserRepo"))
            .with_port(PortMapping::new(1313, 1313))
    }

    struct Harness {
        engine: Arc<FakeEngine>,
        supervisor: ContainerSupervisor,
        slot: HandleSlot,
        cancel: CancellationToken,
        events: mpsc::Sender<ChangeEvent>,
        _errors: mpsc::Sender<WatchError>,
        task: JoinHandle<usize>,
        t0: Instant,
    }

    impl Harness {
        async fn start() -> Self {
            let engine = Arc::new(FakeEngine::new());
            let supervisor = ContainerSupervisor::new(engine.clone())
                .with_input(InputPump::new(tokio::io::empty()));
            let slot = HandleSlot::new();
            let launcher = Launcher::new(supervisor.clone(), Arc::new(spec()), slot.clone());

            launcher
                .replace_current(&CancellationToken::new())
                .await
                .unwrap()
                .unwrap();

            let (events, events_rx) = mpsc::channel(64);
            let (errors, errors_rx) = mpsc::channel(8);
            let cancel = CancellationToken::new();
            let stream = ChangeStream {
                events: events_rx,
                errors: errors_rx,
            };
            let coordinator = RestartCoordinator::new(launcher, WINDOW, cancel.clone());
            let task = tokio::spawn(coordinator.run(stream));

            Self {
                engine,
                supervisor,
                slot,
                cancel,
                events,
                _errors: errors,
                task,
                t0: Instant::now(),
            }
        }

        async fn change(&self, name: &str) {
            self.events
                .send(ChangeEvent::new(format!("/site/{name}"), ChangeKind::Write))
                .await
                .unwrap();
        }

        fn creates(&self) -> Vec<Instant> {
            self.engine
                .timed_calls()
                .into_iter()
                .filter(|(_, c)| matches!(c, Call::Create(_)))
                .map(|(at, _)| at)
                .collect()
        }

        async fn finish(self) -> (Arc<FakeEngine>, HandleSlot, usize) {
            self.cancel.cancel();
            let attempts = self.task.await.unwrap();
            (self.engine, self.slot, attempts)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_yields_one_restart_after_last_event() {
        let h = Harness::start().await;
        let offsets = [0u64, 300, 600, 1000, 1400];
        for ms in offsets {
            tokio::time::sleep_until(h.t0 + Duration::from_millis(ms)).await;
            h.change("content/post.md").await;
        }
        tokio::time::sleep(Duration::from_secs(10)).await;

        let creates = h.creates();
        assert_eq!(creates.len(), 2, "initial start plus one restart");
        assert_eq!(creates[1] - h.t0, Duration::from_millis(3400));

        let (engine, slot, attempts) = h.finish().await;
        assert_eq!(attempts, 1);
        assert_eq!(engine.running().len(), 1);
        assert_eq!(slot.current_id().await, engine.running().first().cloned());
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_tree_never_restarts() {
        let h = Harness::start().await;
        tokio::time::sleep(Duration::from_secs(600)).await;

        assert_eq!(h.creates().len(), 1);
        let (_, _, attempts) = h.finish().await;
        assert_eq!(attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_reuses_identical_spec() {
        let h = Harness::start().await;
        h.change("a.md").await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        h.change("b.md").await;
        tokio::time::sleep(Duration::from_secs(3)).await;

        let specs = h.engine.created_specs();
        assert_eq!(specs.len(), 3);
        let first = serde_json::to_vec(&specs[0]).unwrap();
        for spec in &specs[1..] {
            assert_eq!(serde_json::to_vec(spec).unwrap(), first);
        }
        h.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn old_container_is_removed_before_the_new_one_starts() {
        let h = Harness::start().await;
        let first = h.slot.current_id().await.unwrap();
        h.change("a.md").await;
        tokio::time::sleep(Duration::from_secs(3)).await;

        let calls = h.engine.calls();
        let removed = calls
            .iter()
            .position(|c| *c == Call::Remove(first.clone()))
            .unwrap();
        let created = calls
            .iter()
            .rposition(|c| matches!(c, Call::Create(_)))
            .unwrap();
        assert!(removed < created);
        assert!(!h.engine.existing().contains(&first));
        h.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_restart_recovers_on_next_change() {
        let h = Harness::start().await;
        h.engine
            .fail_next_start(hlive_engine::EngineError::PortInUse("1313".into()));
        h.change("a.md").await;
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(h.slot.is_empty().await);
        assert!(h.engine.running().is_empty());

        h.change("b.md").await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!h.slot.is_empty().await);
        assert_eq!(h.engine.running().len(), 1);

        let (_, _, attempts) = h.finish().await;
        assert_eq!(attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn changes_during_restart_schedule_another() {
        let h = Harness::start().await;
        h.engine.set_start_delay(Duration::from_secs(5));

        h.change("a.md").await;
        // Restart begins at 2s and holds the slot until 7s.
        tokio::time::sleep(Duration::from_secs(3)).await;
        h.change("b.md").await;
        tokio::time::sleep(Duration::from_secs(20)).await;

        let creates = h.creates();
        assert_eq!(creates.len(), 3);
        assert_eq!(creates[1] - h.t0, Duration::from_secs(2));
        // Deadline for b.md (5s) elapsed mid-restart; fires when it ends at 7s.
        assert_eq!(creates[2] - h.t0, Duration::from_secs(7));
        assert_eq!(h.engine.running().len(), 1);
        h.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn closed_stream_ends_the_loop() {
        let h = Harness::start().await;
        let Harness {
            events,
            _errors,
            task,
            ..
        } = h;
        drop(events);
        drop(_errors);
        assert_eq!(task.await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn termination_during_restart_leaves_nothing_running() {
        let h = Harness::start().await;
        h.engine.set_start_delay(Duration::from_secs(5));

        h.change("a.md").await;
        // Restart begins at 2s and is blocked in start until 7s.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(h.creates().len(), 2, "restart is in flight");

        let handler = TerminationHandler::new(h.supervisor.clone(), h.slot.clone(), h.cancel.clone());
        handler.shutdown().await;
        assert_eq!(h.t0.elapsed(), Duration::from_secs(3), "shutdown does not wait out the start");

        let attempts = h.task.await.unwrap();
        assert_eq!(attempts, 1);
        assert!(h.engine.running().is_empty());
        assert!(h.engine.existing().is_empty());
        assert!(h.slot.is_empty().await);
    }
}
