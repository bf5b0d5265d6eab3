use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use hlive_model::{ContainerHandle, ContainerId};

/// Owner of the current container handle.
///
/// A lifecycle transition holds the lock for its whole duration; whoever
/// `take`s the handle is the only one allowed to stop it.
#[derive(Clone, Default)]
pub struct HandleSlot {
    inner: Arc<Mutex<Option<ContainerHandle>>>,
}

impl HandleSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> MutexGuard<'_, Option<ContainerHandle>> {
        self.inner.lock().await
    }

    /// Install `handle` as current, returning the one it replaced.
    pub async fn publish(&self, handle: ContainerHandle) -> Option<ContainerHandle> {
        self.inner.lock().await.replace(handle)
    }

    pub async fn take(&self) -> Option<ContainerHandle> {
        self.inner.lock().await.take()
    }

    pub async fn current_id(&self) -> Option<ContainerId> {
        self.inner.lock().await.as_ref().map(|h| h.id().clone())
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}
