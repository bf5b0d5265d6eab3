//! Process-wide stdin routing.
//!
//! Stdin is read by a single task for the life of the process. Each interactive
//! attach re-points it at the newest container; input that arrives while no
//! container is attached is dropped.

use std::sync::{Arc, Mutex as StdMutex};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use hlive_model::ContainerId;

use crate::InputSink;

const INPUT_CHUNK: usize = 8 * 1024;

type InputSource = Box<dyn AsyncRead + Send + Unpin>;

struct Target {
    id: ContainerId,
    sink: InputSink,
}

struct Inner {
    /// Taken by the pump task when it first starts.
    source: StdMutex<Option<InputSource>>,
    target: Mutex<Option<Target>>,
}

#[derive(Clone)]
pub struct InputPump {
    inner: Arc<Inner>,
}

impl InputPump {
    /// Pump backed by the process stdin.
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }

    pub fn new<R>(source: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                source: StdMutex::new(Some(Box::new(source))),
                target: Mutex::new(None),
            }),
        }
    }

    /// Send all further input to `id`, replacing the previous target.
    ///
    /// Starts the reader task on first use.
    pub async fn route(&self, id: ContainerId, sink: InputSink) {
        let previous = self
            .inner
            .target
            .lock()
            .await
            .replace(Target { id: id.clone(), sink });
        if let Some(prev) = previous {
            trace!(target: "hlive.engine.io", from = %prev.id, to = %id, "stdin re-routed");
        }
        self.ensure_started();
    }

    /// Detach `id` if it is the current target.
    pub async fn release(&self, id: &ContainerId) {
        let mut target = self.inner.target.lock().await;
        if target.as_ref().is_some_and(|t| t.id == *id) {
            *target = None;
        }
    }

    pub async fn current(&self) -> Option<ContainerId> {
        self.inner.target.lock().await.as_ref().map(|t| t.id.clone())
    }

    fn ensure_started(&self) {
        let source = self
            .inner
            .source
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(source) = source {
            tokio::spawn(pump(source, self.inner.clone()));
        }
    }
}

async fn pump(mut source: InputSource, inner: Arc<Inner>) {
    let mut buf = vec![0u8; INPUT_CHUNK];
    loop {
        let n = match source.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(target: "hlive.engine.io", error = %e, "stdin read failed");
                break;
            }
        };

        let mut target = inner.target.lock().await;
        let Some(t) = target.as_mut() else {
            trace!(target: "hlive.engine.io", bytes = n, "no container attached; input dropped");
            continue;
        };
        let written = match t.sink.write_all(&buf[..n]).await {
            Ok(()) => t.sink.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            debug!(target: "hlive.engine.io", container = %t.id, error = %e, "container stdin closed");
            *target = None;
        }
    }
    trace!(target: "hlive.engine.io", "stdin closed");
}
