use std::{future::Future, io, path::PathBuf, sync::Arc, time::Duration};

use tokio::{io::AsyncWrite, task::JoinHandle, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hlive_engine::{ContainerSupervisor, StopReport};
use hlive_model::RunSpec;
use hlive_watch::ChangeDetector;

use crate::{
    CoreError, DEFAULT_DEBOUNCE, HandleSlot, RestartCoordinator, TerminationHandler,
    launcher::Launcher,
};

/// Status reported by a one-shot run that was interrupted.
pub const INTERRUPTED_STATUS: i64 = 130;

/// How long a finished one-shot run waits for buffered output.
const OUTPUT_DRAIN: Duration = Duration::from_secs(5);

/// Wires supervisor, detector, coordinator and termination handler into the
/// serve loop.
pub struct Orchestrator {
    supervisor: ContainerSupervisor,
    spec: Arc<RunSpec>,
    watch_root: PathBuf,
    window: Duration,
}

impl Orchestrator {
    pub fn new(supervisor: ContainerSupervisor, spec: RunSpec, watch_root: impl Into<PathBuf>) -> Self {
        Self {
            supervisor,
            spec: Arc::new(spec),
            watch_root: watch_root.into(),
            window: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Start the container and keep it fresh until `signal` resolves.
    ///
    /// The signal listener is installed before the first start, so an early
    /// interrupt tears down whatever was created and returns `Ok`. Fails only
    /// before the loop is running: engine unreachable, first start failed, or
    /// the watch root could not be registered. Whatever ends the loop, no
    /// container is left running on return.
    pub async fn serve<F>(self, signal: F) -> Result<(), CoreError>
    where
        F: Future<Output = io::Result<()>> + Send + 'static,
    {
        self.supervisor
            .ensure_engine()
            .await
            .map_err(CoreError::EngineUnavailable)?;

        let cancel = CancellationToken::new();
        let slot = HandleSlot::new();
        let launcher = Launcher::new(self.supervisor.clone(), self.spec.clone(), slot.clone());

        let termination = TerminationHandler::new(self.supervisor.clone(), slot, cancel.clone());
        let termination = tokio::spawn(termination.run(signal));

        match launcher.replace_current(&cancel).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                info!(target: "hlive.core", "interrupted before the first start");
                finish(termination).await;
                return Ok(());
            }
            Err(e) => {
                cancel.cancel();
                finish(termination).await;
                return Err(CoreError::InitialStart(e));
            }
        }

        let stream = match ChangeDetector::new(&self.watch_root).spawn(cancel.child_token()) {
            Ok(stream) => stream,
            Err(e) => {
                cancel.cancel();
                finish(termination).await;
                return Err(e.into());
            }
        };

        let attempts = RestartCoordinator::new(launcher, self.window, cancel.clone())
            .run(stream)
            .await;
        debug!(target: "hlive.core", restarts = attempts, "restart loop finished");

        cancel.cancel();
        finish(termination).await;
        info!(target: "hlive.core", "stopped");
        Ok(())
    }
}

async fn finish(termination: JoinHandle<Option<StopReport>>) {
    match termination.await {
        Ok(Some(report)) if !report.is_clean() => {
            warn!(target: "hlive.core", errors = report.errors.len(), "shutdown finished with errors");
        }
        Ok(_) => {}
        Err(e) => warn!(target: "hlive.core", error = %e, "termination task aborted"),
    }
}

/// Run the workload once, stream its output to stdout and return its exit status.
///
/// Never restarts. When `signal` resolves first the container is stopped and
/// [`INTERRUPTED_STATUS`] is returned.
pub async fn run_once<F>(
    supervisor: &ContainerSupervisor,
    spec: &RunSpec,
    signal: F,
) -> Result<i64, CoreError>
where
    F: Future<Output = io::Result<()>>,
{
    run_once_with(supervisor, spec, signal, tokio::io::stdout()).await
}

/// [`run_once`] with an explicit output sink.
///
/// Output is attached before the container starts so nothing a short-lived
/// command prints is lost.
pub async fn run_once_with<F, W>(
    supervisor: &ContainerSupervisor,
    spec: &RunSpec,
    signal: F,
    sink: W,
) -> Result<i64, CoreError>
where
    F: Future<Output = io::Result<()>>,
    W: AsyncWrite + Unpin + Send + 'static,
{
    supervisor
        .ensure_engine()
        .await
        .map_err(CoreError::EngineUnavailable)?;

    let mut handle = supervisor
        .create(spec)
        .await
        .map_err(CoreError::InitialStart)?;
    let forwarders = match supervisor.attach_with(&mut handle, false, sink).await {
        Ok(f) => Some(f),
        Err(e) => {
            warn!(target: "hlive.core", error = %e, "output will not be shown");
            None
        }
    };
    supervisor
        .start_created(&handle, spec)
        .await
        .map_err(CoreError::InitialStart)?;

    tokio::pin!(signal);
    let waited = tokio::select! {
        res = supervisor.wait(&handle) => res,
        sig = &mut signal => match sig {
            Ok(()) => {
                info!(target: "hlive.core", container = %handle.id(), "interrupted, stopping");
                supervisor.stop(&handle).await;
                return Ok(INTERRUPTED_STATUS);
            }
            Err(e) => {
                warn!(target: "hlive.core", error = %e, "failed to listen for termination signals");
                supervisor.wait(&handle).await
            }
        },
    };

    let status = match waited {
        Ok(status) => status,
        Err(e) => {
            supervisor.stop(&handle).await;
            return Err(CoreError::Run(e));
        }
    };

    if let Some(f) = forwarders {
        match timeout(OUTPUT_DRAIN, f.output).await {
            Ok(Ok(bytes)) => debug!(target: "hlive.core", bytes, "output drained"),
            Ok(Err(e)) => warn!(target: "hlive.core", error = %e, "output forwarder failed"),
            Err(_) => debug!(target: "hlive.core", "output still open after exit"),
        }
    }

    supervisor.stop(&handle).await;
    info!(target: "hlive.core", status, "run finished");
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlive_engine::{
        EngineError, InputPump, LifecycleError,
        testing::{Call, FakeEngine},
    };
    use hlive_model::{BindMount, PortMapping};

    fn server_spec(root: &std::path::Path) -> RunSpec {
        RunSpec::new("fortinet-hugo:latest", ["server"])
            .with_mount(BindMount::new(root, "/home/UserRepo"))
            .with_port(PortMapping::new(1313, 1313))
    }

    fn supervisor(engine: &Arc<FakeEngine>) -> ContainerSupervisor {
        ContainerSupervisor::new(engine.clone()).with_input(InputPump::new(tokio::io::empty()))
    }

    #[tokio::test]
    async fn unreachable_engine_is_fatal_before_any_container() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new());
        engine.set_unavailable(true);

        let err = Orchestrator::new(supervisor(&engine), server_spec(tmp.path()), tmp.path())
            .serve(std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::EngineUnavailable(_)));
        assert_eq!(engine.calls(), vec![Call::Ping]);
    }

    #[tokio::test]
    async fn first_start_failure_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new());
        engine.fail_next_start(EngineError::PortInUse("1313".into()));

        let err = Orchestrator::new(supervisor(&engine), server_spec(tmp.path()), tmp.path())
            .serve(std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InitialStart(LifecycleError::PortConflict { port: 1313, .. })
        ));
        assert!(engine.existing().is_empty());
    }

    #[tokio::test]
    async fn bad_watch_root_tears_down() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new());
        let missing = tmp.path().join("missing");

        let err = Orchestrator::new(supervisor(&engine), server_spec(tmp.path()), &missing)
            .serve(std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Watch(_)));
        assert!(engine.existing().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn signal_during_first_start_removes_the_container() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new());
        engine.set_start_delay(Duration::from_secs(5));
        let signal = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        };

        let began = tokio::time::Instant::now();
        Orchestrator::new(supervisor(&engine), server_spec(tmp.path()), tmp.path())
            .serve(signal)
            .await
            .unwrap();

        assert_eq!(began.elapsed(), Duration::from_secs(1));
        assert!(engine.running().is_empty());
        assert!(engine.existing().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn signal_leaves_nothing_running() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let signal = async move {
            let _ = rx.await;
            Ok(())
        };

        let orch = Orchestrator::new(supervisor(&engine), server_spec(tmp.path()), tmp.path())
            .with_window(Duration::from_millis(50));
        let serve = tokio::spawn(orch.serve(signal));

        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(tmp.path().join("index.md"), "# hi").unwrap();
        // Terminate right around the pending deadline.
        tokio::time::sleep(Duration::from_millis(40)).await;
        tx.send(()).unwrap();

        serve.await.unwrap().unwrap();
        assert!(engine.running().is_empty());
        assert!(engine.existing().is_empty());
    }

    #[tokio::test]
    async fn one_shot_propagates_exit_status() {
        let engine = Arc::new(FakeEngine::new());
        engine.set_exit_code(2);
        let spec = RunSpec::new("fortinet-hugo:latest", ["--minify"]);

        let status = run_once(&supervisor(&engine), &spec, std::future::pending())
            .await
            .unwrap();
        assert_eq!(status, 2);

        let creates = engine
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Create(_)))
            .count();
        assert_eq!(creates, 1);
        assert!(engine.existing().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_interrupt_stops_container() {
        let engine = Arc::new(FakeEngine::new());
        engine.set_exit_delay(Duration::from_secs(60));
        let spec = RunSpec::new("fortinet-hugo:latest", Vec::<String>::new());

        let signal = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        };
        let status = run_once(&supervisor(&engine), &spec, signal).await.unwrap();
        assert_eq!(status, INTERRUPTED_STATUS);
        assert!(engine.existing().is_empty());
    }

    #[tokio::test]
    async fn one_shot_keeps_output_of_a_command_that_exits_at_once() {
        use tokio::io::AsyncReadExt;

        let engine = Arc::new(FakeEngine::new());
        engine.set_exit_on_start(true);
        engine.set_exit_code(3);
        engine.set_output(vec![b"Total in 12 ms\n".to_vec()]);
        let spec = RunSpec::new("fortinet-hugo:latest", ["--minify"]);

        let (sink, mut screen) = tokio::io::duplex(1024);
        let status = run_once_with(&supervisor(&engine), &spec, std::future::pending(), sink)
            .await
            .unwrap();
        assert_eq!(status, 3);

        let mut shown = String::new();
        screen.read_to_string(&mut shown).await.unwrap();
        assert_eq!(shown, "Total in 12 ms\n");

        let calls = engine.calls();
        let attach = calls.iter().position(|c| matches!(c, Call::Attach(_, false))).unwrap();
        let start = calls.iter().position(|c| matches!(c, Call::Start(_))).unwrap();
        assert!(attach < start);
        assert!(engine.existing().is_empty());
    }
}
