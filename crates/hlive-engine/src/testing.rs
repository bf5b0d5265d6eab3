//! In-memory [`Engine`] that records every call.
//!
//! Faults are queued per operation and consumed by the next matching call.

use std::{
    collections::{BTreeSet, VecDeque},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::time::Instant;

use hlive_model::{ContainerId, RunSpec};

use crate::{Attachment, Engine, EngineError, EngineResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Ping,
    Create(RunSpec),
    Start(ContainerId),
    Attach(ContainerId, bool),
    Stop(ContainerId),
    Remove(ContainerId),
    Wait(ContainerId),
}

#[derive(Default)]
struct FakeState {
    calls: Vec<(Instant, Call)>,
    next_id: u64,
    existing: BTreeSet<ContainerId>,
    running: BTreeSet<ContainerId>,
    exited: BTreeSet<ContainerId>,
    exit_on_start: bool,
    unavailable: bool,
    create_faults: VecDeque<EngineError>,
    start_faults: VecDeque<EngineError>,
    attach_faults: VecDeque<EngineError>,
    stop_faults: VecDeque<EngineError>,
    output: Vec<Vec<u8>>,
    exit_code: i64,
    start_delay: Duration,
    exit_delay: Duration,
    last_grace: Option<Duration>,
}

#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    fn record(&self, call: Call) {
        self.with(|s| s.calls.push((Instant::now(), call)));
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.with(|s| s.unavailable = unavailable);
    }

    pub fn fail_next_create(&self, err: EngineError) {
        self.with(|s| s.create_faults.push_back(err));
    }

    pub fn fail_next_start(&self, err: EngineError) {
        self.with(|s| s.start_faults.push_back(err));
    }

    pub fn fail_next_attach(&self, err: EngineError) {
        self.with(|s| s.attach_faults.push_back(err));
    }

    pub fn fail_next_stop(&self, err: EngineError) {
        self.with(|s| s.stop_faults.push_back(err));
    }

    /// Chunks replayed on every attach.
    pub fn set_output(&self, chunks: Vec<Vec<u8>>) {
        self.with(|s| s.output = chunks);
    }

    pub fn set_exit_code(&self, code: i64) {
        self.with(|s| s.exit_code = code);
    }

    /// Delay applied inside `start` before the container counts as running.
    pub fn set_start_delay(&self, delay: Duration) {
        self.with(|s| s.start_delay = delay);
    }

    /// Containers exit as soon as they start, like a short one-shot command.
    pub fn set_exit_on_start(&self, exit: bool) {
        self.with(|s| s.exit_on_start = exit);
    }

    /// Make `wait` block this long before reporting the exit code.
    pub fn set_exit_delay(&self, delay: Duration) {
        self.with(|s| s.exit_delay = delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with(|s| s.calls.iter().map(|(_, c)| c.clone()).collect())
    }

    pub fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.with(|s| s.calls.clone())
    }

    /// Specs passed to `create`, in call order.
    pub fn created_specs(&self) -> Vec<RunSpec> {
        self.with(|s| {
            s.calls
                .iter()
                .filter_map(|(_, c)| match c {
                    Call::Create(spec) => Some(spec.clone()),
                    _ => None,
                })
                .collect()
        })
    }

    pub fn running(&self) -> Vec<ContainerId> {
        self.with(|s| s.running.iter().cloned().collect())
    }

    pub fn existing(&self) -> Vec<ContainerId> {
        self.with(|s| s.existing.iter().cloned().collect())
    }

    pub fn last_grace(&self) -> Option<Duration> {
        self.with(|s| s.last_grace)
    }
}

#[async_trait]
impl Engine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn ping(&self) -> EngineResult<()> {
        self.record(Call::Ping);
        if self.with(|s| s.unavailable) {
            return Err(EngineError::Unavailable("fake engine is down".into()));
        }
        Ok(())
    }

    async fn create(&self, spec: &RunSpec) -> EngineResult<ContainerId> {
        self.record(Call::Create(spec.clone()));
        self.with(|s| {
            if let Some(err) = s.create_faults.pop_front() {
                return Err(err);
            }
            s.next_id += 1;
            let id = ContainerId::new(format!("fake{:012}", s.next_id));
            s.existing.insert(id.clone());
            Ok(id)
        })
    }

    async fn start(&self, id: &ContainerId) -> EngineResult<()> {
        self.record(Call::Start(id.clone()));
        let delay = self.with(|s| s.start_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.with(|s| {
            if let Some(err) = s.start_faults.pop_front() {
                return Err(err);
            }
            if !s.existing.contains(id) {
                return Err(EngineError::NotFound(id.to_string()));
            }
            if s.exit_on_start {
                s.exited.insert(id.clone());
            } else {
                s.running.insert(id.clone());
            }
            Ok(())
        })
    }

    async fn attach(&self, id: &ContainerId, stdin: bool) -> EngineResult<Attachment> {
        self.record(Call::Attach(id.clone(), stdin));
        let chunks = self.with(|s| {
            if let Some(err) = s.attach_faults.pop_front() {
                return Err(err);
            }
            if !s.existing.contains(id) {
                return Err(EngineError::NotFound(id.to_string()));
            }
            if s.exited.contains(id) {
                return Err(EngineError::Conflict(
                    "cannot attach to a stopped container".into(),
                ));
            }
            Ok(s.output.clone())
        })?;

        let output = futures::stream::iter(chunks.into_iter().map(Ok)).boxed();
        let input = if stdin {
            Some(Box::pin(tokio::io::sink()) as crate::InputSink)
        } else {
            None
        };
        Ok(Attachment { output, input })
    }

    async fn stop(&self, id: &ContainerId, grace: Duration) -> EngineResult<()> {
        self.record(Call::Stop(id.clone()));
        self.with(|s| {
            s.last_grace = Some(grace);
            if let Some(err) = s.stop_faults.pop_front() {
                return Err(err);
            }
            if !s.existing.contains(id) {
                return Err(EngineError::NotFound(id.to_string()));
            }
            s.running.remove(id);
            Ok(())
        })
    }

    async fn remove(&self, id: &ContainerId) -> EngineResult<()> {
        self.record(Call::Remove(id.clone()));
        self.with(|s| {
            if !s.existing.remove(id) {
                return Err(EngineError::NotFound(id.to_string()));
            }
            s.running.remove(id);
            Ok(())
        })
    }

    async fn wait(&self, id: &ContainerId) -> EngineResult<i64> {
        self.record(Call::Wait(id.clone()));
        let delay = self.with(|s| s.exit_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.with(|s| {
            if !s.existing.contains(id) {
                return Err(EngineError::NotFound(id.to_string()));
            }
            s.running.remove(id);
            Ok(s.exit_code)
        })
    }
}
