use std::sync::{Arc, Mutex, MutexGuard};

use crate::{LavaError, Result};

#[derive(Debug, Default)]
struct QueueState {
    chunks: Vec<Vec<u8>>,
    stopped: bool,
    frozen: bool,
}

/// Creates the producer/consumer pair for one capture session.
pub fn chunk_channel() -> (ChunkSink, ChunkQueue) {
    let shared = Arc::new(Mutex::new(QueueState::default()));
    (
        ChunkSink {
            shared: shared.clone(),
        },
        ChunkQueue { shared },
    )
}

/// Producer half handed to a [`MediaEncoder`](super::MediaEncoder). There is
/// exactly one per session, so it is deliberately not `Clone`.
pub struct ChunkSink {
    shared: Arc<Mutex<QueueState>>,
}

impl ChunkSink {
    /// Appends an encoded chunk. Empty chunks and writes after finalization
    /// are dropped; the return value tells whether the chunk was kept.
    pub fn data_available(&self, chunk: Vec<u8>) -> Result<bool> {
        if chunk.is_empty() {
            return Ok(false);
        }

        let mut state = lock(&self.shared)?;
        if state.frozen {
            tracing::warn!(bytes = chunk.len(), "dropping chunk delivered after finalization");
            return Ok(false);
        }
        state.chunks.push(chunk);
        Ok(true)
    }

    /// Signals that the encoder has flushed its last chunk.
    pub fn stopped(&self) -> Result<()> {
        lock(&self.shared)?.stopped = true;
        Ok(())
    }
}

impl std::fmt::Debug for ChunkSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkSink").finish()
    }
}

/// Consumer half, owned by the capture session.
#[derive(Debug)]
pub struct ChunkQueue {
    shared: Arc<Mutex<QueueState>>,
}

impl ChunkQueue {
    pub fn len(&self) -> Result<usize> {
        Ok(lock(&self.shared)?.chunks.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn byte_len(&self) -> Result<usize> {
        Ok(lock(&self.shared)?.chunks.iter().map(Vec::len).sum())
    }

    pub fn is_stopped(&self) -> Result<bool> {
        Ok(lock(&self.shared)?.stopped)
    }

    /// Concatenates every chunk in arrival order and closes the queue to
    /// further writes. A second call yields an empty buffer.
    pub fn drain_and_freeze(&self) -> Result<Vec<u8>> {
        let mut state = lock(&self.shared)?;
        state.frozen = true;
        Ok(state.chunks.drain(..).flatten().collect())
    }
}

fn lock(shared: &Arc<Mutex<QueueState>>) -> Result<MutexGuard<'_, QueueState>> {
    shared
        .lock()
        .map_err(|_| LavaError::msg("capture chunk queue has been poisoned"))
}
