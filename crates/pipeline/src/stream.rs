//! Output handle of a running pipeline.

use std::sync::{Arc, Mutex, PoisonError};

use contracts::{GestureBatch, SlotBindings};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::error::{PipelineError, Result};
use crate::orchestrator::SourceSet;
use crate::stats::PipelineStats;

/// Stream of per-cycle gesture batches.
///
/// Ends (`next()` returns `None`) when an input completes. A fault is yielded once as
/// `Some(Err(_))` before the stream ends. Dropping the stream cancels the pipeline.
pub struct GestureStream {
    rx: mpsc::Receiver<Result<GestureBatch>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    sources: Arc<SourceSet>,
    stats: Arc<Mutex<PipelineStats>>,
    bindings: SlotBindings,
}

impl GestureStream {
    pub(crate) fn new(
        rx: mpsc::Receiver<Result<GestureBatch>>,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<()>,
        sources: Arc<SourceSet>,
        stats: Arc<Mutex<PipelineStats>>,
        bindings: SlotBindings,
    ) -> Self {
        Self {
            rx,
            shutdown: Some(shutdown),
            task: Some(task),
            sources,
            stats,
            bindings,
        }
    }

    /// Next batch, or `None` once the pipeline has terminated
    pub async fn next(&mut self) -> Option<Result<GestureBatch>> {
        self.rx.recv().await
    }

    /// Cancel the pipeline.
    ///
    /// Resolves after every source is stopped and every held frame is released.
    /// Batches not yet consumed are discarded. Calling it again is a no-op.
    #[instrument(name = "gesture_stream_cancel", skip_all)]
    pub async fn cancel(&mut self) -> Result<PipelineStats> {
        if let Some(shutdown) = self.shutdown.take() {
            if shutdown.send(()).is_err() {
                debug!("cycle task already finished");
            }
        }

        self.rx.close();
        let mut discarded = 0usize;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }

        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| PipelineError::task(e.to_string()))?;
        }
        self.sources.stop_all();

        debug!(discarded_batches = discarded, "gesture stream cancelled");
        Ok(self.stats())
    }

    /// Snapshot of the running statistics
    pub fn stats(&self) -> PipelineStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Shared slot-binding store
    pub fn bindings(&self) -> SlotBindings {
        self.bindings.clone()
    }

    /// `true` once the cycle task has exited
    pub fn is_terminated(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for GestureStream {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // The task may already be gone; nothing to signal then.
            let _ = shutdown.send(());
        }
        self.sources.stop_all();
    }
}
