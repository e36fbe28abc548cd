//! Strict N-way zip over push streams.
//!
//! Each input stream has its own FIFO. A batch is emitted as soon as every FIFO holds at
//! least one item; it takes the oldest item of each, in stream-index order. Nothing is
//! dropped or reordered while running, so a fast stream simply builds backlog.

use std::collections::VecDeque;

use contracts::SourceEvent;
use tracing::{debug, instrument, trace, warn};

use crate::error::SyncError;

/// Synchronizer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Accepting items
    Running,
    /// An input completed and no further batch can be formed
    Completed,
    /// An input faulted
    Faulted,
}

impl SyncState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SyncState::Running)
    }
}

#[derive(Debug)]
struct StreamQueue<T> {
    items: VecDeque<T>,
    completed: bool,
}

/// Generic N-way synchronizer
#[derive(Debug)]
pub struct StreamSynchronizer<T> {
    label: String,
    queues: Vec<StreamQueue<T>>,
    state: SyncState,
    cycles: u64,
    max_backlog: usize,
    discarded: u64,
}

impl<T> StreamSynchronizer<T> {
    /// Create a synchronizer over `streams` inputs.
    ///
    /// `label` tags logs and metrics so the detector-level and cycle-level instances can
    /// be told apart.
    pub fn new(label: impl Into<String>, streams: usize) -> Result<Self, SyncError> {
        let label = label.into();
        if streams == 0 {
            return Err(SyncError::NoStreams { label });
        }

        Ok(Self {
            label,
            queues: (0..streams)
                .map(|_| StreamQueue {
                    items: VecDeque::new(),
                    completed: false,
                })
                .collect(),
            state: SyncState::Running,
            cycles: 0,
            max_backlog: 0,
            discarded: 0,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stream_count(&self) -> usize {
        self.queues.len()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }

    /// Batches emitted so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Queued items of one stream
    pub fn backlog(&self, stream: usize) -> Option<usize> {
        self.queues.get(stream).map(|q| q.items.len())
    }

    /// Queued items of every stream, in stream order
    pub fn backlogs(&self) -> Vec<usize> {
        self.queues.iter().map(|q| q.items.len()).collect()
    }

    /// Deepest single-stream backlog observed since construction
    pub fn max_backlog(&self) -> usize {
        self.max_backlog
    }

    /// Items dropped because they could never complete a batch
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Enqueue one item; returns the batch it completed, if any.
    ///
    /// Items arriving after termination are dropped.
    pub fn push(&mut self, stream: usize, item: T) -> Result<Option<Vec<T>>, SyncError> {
        self.check_index(stream)?;

        if self.state.is_terminal() {
            self.discarded += 1;
            trace!(label = %self.label, stream, "item after termination discarded");
            return Ok(None);
        }

        let queue = &mut self.queues[stream];
        queue.items.push_back(item);
        let depth = queue.items.len();
        if depth > self.max_backlog {
            self.max_backlog = depth;
            metrics::gauge!("gesture_sync_max_backlog", "synchronizer" => self.label.clone())
                .set(depth as f64);
        }

        Ok(self.try_emit())
    }

    /// Mark one stream completed.
    ///
    /// The synchronizer completes once a completed stream has nothing left to pair.
    #[instrument(level = "debug", name = "synchronizer_complete", skip(self), fields(label = %self.label))]
    pub fn complete(&mut self, stream: usize) -> Result<(), SyncError> {
        self.check_index(stream)?;
        if self.state.is_terminal() {
            return Ok(());
        }

        self.queues[stream].completed = true;
        self.check_drained();
        Ok(())
    }

    /// Fault the synchronizer from one stream.
    ///
    /// Pending items are dropped and the returned error is the fault to forward downstream.
    /// A fault reaching an already terminated synchronizer is discarded, like a late item.
    pub fn fail(&mut self, stream: usize, reason: impl Into<String>) -> Result<(), SyncError> {
        self.check_index(stream)?;
        let reason = reason.into();

        if self.state.is_terminal() {
            self.discarded += 1;
            debug!(label = %self.label, stream, reason = %reason, "fault after termination discarded");
            return Ok(());
        }

        warn!(label = %self.label, stream, reason = %reason, "upstream fault");
        metrics::counter!("gesture_sync_faults_total", "synchronizer" => self.label.clone())
            .increment(1);
        self.state = SyncState::Faulted;
        self.drain();

        Err(SyncError::upstream(self.label.clone(), stream, reason))
    }

    /// Apply one source event to `stream`.
    pub fn on_event(
        &mut self,
        stream: usize,
        event: SourceEvent<T>,
    ) -> Result<Option<Vec<T>>, SyncError> {
        match event {
            SourceEvent::Next(item) => self.push(stream, item),
            SourceEvent::Completed => self.complete(stream).map(|_| None),
            SourceEvent::Failed(reason) => self.fail(stream, reason).map(|_| None),
        }
    }

    fn try_emit(&mut self) -> Option<Vec<T>> {
        if self.queues.iter().any(|q| q.items.is_empty()) {
            return None;
        }

        let batch: Vec<T> = self
            .queues
            .iter_mut()
            .filter_map(|q| q.items.pop_front())
            .collect();
        self.cycles += 1;
        metrics::counter!("gesture_sync_batches_total", "synchronizer" => self.label.clone())
            .increment(1);
        trace!(label = %self.label, cycle = self.cycles, "batch emitted");

        self.check_drained();
        Some(batch)
    }

    fn check_drained(&mut self) {
        if self
            .queues
            .iter()
            .any(|q| q.completed && q.items.is_empty())
        {
            debug!(label = %self.label, cycles = self.cycles, "input completed, synchronizer done");
            self.state = SyncState::Completed;
            self.drain();
        }
    }

    fn drain(&mut self) {
        let pending: usize = self.queues.iter().map(|q| q.items.len()).sum();
        if pending > 0 {
            debug!(label = %self.label, pending, "partial cycle discarded");
            metrics::counter!(
                "gesture_sync_partial_items_discarded_total",
                "synchronizer" => self.label.clone()
            )
            .increment(pending as u64);
            self.discarded += pending as u64;
        }
        for queue in &mut self.queues {
            queue.items.clear();
        }
    }

    fn check_index(&self, stream: usize) -> Result<(), SyncError> {
        if stream < self.queues.len() {
            Ok(())
        } else {
            Err(SyncError::StreamOutOfRange {
                label: self.label.clone(),
                index: stream,
                streams: self.queues.len(),
            })
        }
    }
}
