//! The single-writer save queue.
//!
//! All saves funnel through one background task holding the codec: at most
//! one save runs at a time, requests resolve in FIFO order, and each request
//! gets its own success or failure over a oneshot reply.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use super::{DbImage, FileCodec};
use crate::error::{Result, VaultError};

struct SaveJob {
    image: DbImage,
    reply: oneshot::Sender<Result<()>>,
}

/// Handle to the single-writer save task.
///
/// Cloning the handle shares the same queue; dropping every handle stops the
/// task once the queue drains.
#[derive(Clone)]
pub struct SaveQueue {
    tx: mpsc::Sender<SaveJob>,
}

impl std::fmt::Debug for SaveQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveQueue").finish_non_exhaustive()
    }
}

impl SaveQueue {
    /// Spawns the save task around a codec.
    pub fn start(codec: Arc<FileCodec>) -> Self {
        let (tx, mut rx) = mpsc::channel::<SaveJob>(32);
        tokio::spawn(async move {
            debug!("Save queue started for {:?}", codec.path());
            while let Some(job) = rx.recv().await {
                trace!("Processing queued save");
                let result = codec.save(&job.image).await;
                if job.reply.send(result).is_err() {
                    warn!("Save requester went away before the result arrived");
                }
            }
            debug!("Save queue stopped for {:?}", codec.path());
        });
        Self {
            tx,
        }
    }

    /// Enqueues a full-image save and waits for its outcome.
    ///
    /// Each save writes the complete image, so back-to-back requests are
    /// valid but redundant; ordering is strictly FIFO.
    pub async fn save(&self, image: DbImage) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = SaveJob {
            image,
            reply: reply_tx,
        };
        self.tx
            .send(job)
            .await
            .map_err(|_| queue_closed_error())?;
        reply_rx.await.map_err(|_| queue_closed_error())?
    }
}

fn queue_closed_error() -> VaultError {
    VaultError::storage(
        std::path::PathBuf::new(),
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "save queue is closed"),
    )
}
