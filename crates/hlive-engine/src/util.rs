use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use hlive_model::ContainerId;

use crate::OutputStream;

/// Copy container output into `sink` until either side closes.
///
/// Resolves to the number of bytes forwarded.
pub(crate) fn spawn_output_forwarder<W>(
    mut output: OutputStream,
    mut sink: W,
    id: ContainerId,
) -> JoinHandle<u64>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut total = 0u64;
        while let Some(chunk) = output.next().await {
            match chunk {
                Ok(bytes) => {
                    if sink.write_all(&bytes).await.is_err() || sink.flush().await.is_err() {
                        break;
                    }
                    total += bytes.len() as u64;
                }
                Err(e) => {
                    debug!(target: "hlive.engine.io", container = %id, error = %e, "output stream error");
                    break;
                }
            }
        }
        trace!(target: "hlive.engine.io", container = %id, bytes = total, "output stream closed");
        total
    })
}
