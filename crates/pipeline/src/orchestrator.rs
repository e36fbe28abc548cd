//! Pipeline orchestrator - coordinates all components.
//!
//! Producer callbacks only forward events into an unbounded routing channel. One cycle
//! task owns both synchronizers and runs allocation and projection, so the hot path has a
//! single writer and producers never block.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use async_channel::{unbounded, Receiver, Sender};
use contracts::{
    CycleMeta, DetectorFactory, EngineConfig, FrameEvent, Gesture, GestureBatch,
    GestureCatalogue, SlotBindings, SourceEvent, TrackedSet, TrackedSetSource,
};
use ingestion::EventStreamAdapter;
use observability::{
    record_cycle_latency_ms, record_cycle_metrics, record_event_routed,
    record_pipeline_terminated,
};
use sync_engine::{
    GestureResultProjector, StreamSynchronizer, SyncState, TrackingSlotAllocator,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{PipelineError, Result};
use crate::stats::PipelineStats;
use crate::stream::GestureStream;

/// Stream index of the aligned detector frames in the cycle synchronizer
const FRAMES: usize = 0;
/// Stream index of the tracked set in the cycle synchronizer
const TRACKED: usize = 1;

/// Every adapter the orchestrator opened
pub(crate) struct SourceSet {
    detectors: Vec<EventStreamAdapter<FrameEvent>>,
    tracker: EventStreamAdapter<TrackedSet>,
}

impl SourceSet {
    /// Cancel every subscription and stop the native sources
    pub(crate) fn stop_all(&self) {
        self.stop_detectors();
        self.tracker.cancel_current();
    }

    /// Cancel the detector subscriptions only
    pub(crate) fn stop_detectors(&self) {
        for detector in &self.detectors {
            detector.cancel_current();
        }
    }
}

/// Event forwarded from a producer callback to the cycle task
enum Routed {
    Frame(usize, SourceEvent<FrameEvent>),
    Tracked(SourceEvent<TrackedSet>),
}

/// Item of the cycle synchronizer
enum CyclePart {
    Frames(Vec<FrameEvent>),
    Tracked(TrackedSet),
}

/// Main pipeline orchestrator
pub struct Orchestrator {
    config: EngineConfig,
    gestures: Vec<Gesture>,
    bindings: SlotBindings,
    sources: Arc<SourceSet>,
}

impl Orchestrator {
    /// Open one detector per slot and adapters for every source.
    ///
    /// Fails before anything streams if the slot count is zero or the factory fails.
    #[instrument(
        name = "orchestrator_new",
        skip_all,
        fields(slot_count = config.slot_count, gestures = gestures.len())
    )]
    pub fn new(
        config: EngineConfig,
        factory: &dyn DetectorFactory,
        tracked_source: TrackedSetSource,
        gestures: &[Gesture],
    ) -> Result<Self> {
        if config.slot_count == 0 {
            return Err(PipelineError::construction("slot_count must be positive"));
        }
        if config.output_capacity == 0 {
            return Err(PipelineError::construction(
                "output_capacity must be positive",
            ));
        }

        let bindings = SlotBindings::new(config.slot_count);
        let mut detectors = Vec::with_capacity(config.slot_count);
        for slot in 0..config.slot_count {
            let source = factory.create_detector(slot, gestures, bindings.clone())?;
            debug!(slot, source_id = %source.source_id(), "detector opened");
            detectors.push(EventStreamAdapter::new(source));
        }
        let tracker = EventStreamAdapter::new(tracked_source);

        info!(
            slots = config.slot_count,
            gestures = gestures.len(),
            kind = ?config.gesture_kind,
            tracker = %tracker.source_id(),
            "Orchestrator configured"
        );

        Ok(Self {
            config,
            gestures: gestures.to_vec(),
            bindings,
            sources: Arc::new(SourceSet { detectors, tracker }),
        })
    }

    /// Build from a loaded catalogue, keeping the gestures of the configured kind
    pub fn with_catalogue(
        config: EngineConfig,
        factory: &dyn DetectorFactory,
        tracked_source: TrackedSetSource,
        catalogue: &GestureCatalogue,
    ) -> Result<Self> {
        let gestures = catalogue.of_kind(config.gesture_kind);
        Self::new(config, factory, tracked_source, &gestures)
    }

    pub fn slot_count(&self) -> usize {
        self.config.slot_count
    }

    pub fn gestures(&self) -> &[Gesture] {
        &self.gestures
    }

    /// Shared slot-binding store
    pub fn bindings(&self) -> SlotBindings {
        self.bindings.clone()
    }

    /// Subscribe every source and spawn the cycle task.
    ///
    /// Must be called from within a Tokio runtime.
    #[instrument(name = "orchestrator_start", skip_all, fields(slot_count = self.config.slot_count))]
    pub fn start(self) -> Result<GestureStream> {
        let slot_count = self.config.slot_count;
        let detectors = StreamSynchronizer::new("detectors", slot_count)?;
        let cycle = StreamSynchronizer::new("cycle", 2)?;

        let (route_tx, route_rx) = unbounded();
        if let Err(e) = self.subscribe_all(&route_tx) {
            self.sources.stop_all();
            return Err(e);
        }
        drop(route_tx);

        let (out_tx, out_rx) = mpsc::channel(self.config.output_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let stats = Arc::new(Mutex::new(PipelineStats::with_slots(slot_count)));

        let task = CycleTask {
            detectors,
            cycle,
            allocator: TrackingSlotAllocator::new(),
            projector: GestureResultProjector::for_kind(self.config.gesture_kind),
            bindings: self.bindings.clone(),
            sources: self.sources.clone(),
            stats: stats.clone(),
            next_cycle_id: 1,
        };
        let handle = tokio::spawn(task.run(route_rx, out_tx, shutdown_rx));

        info!(slots = slot_count, "Pipeline running");
        Ok(GestureStream::new(
            out_rx,
            shutdown_tx,
            handle,
            self.sources,
            stats,
            self.bindings,
        ))
    }

    fn subscribe_all(&self, route_tx: &Sender<Routed>) -> Result<()> {
        for (slot, detector) in self.sources.detectors.iter().enumerate() {
            let tx = route_tx.clone();
            detector.subscribe(Arc::new(move |event| {
                if tx.try_send(Routed::Frame(slot, event)).is_err() {
                    trace!(slot, "cycle task gone, detector event dropped");
                }
            }))?;
        }

        let tx = route_tx.clone();
        self.sources.tracker.subscribe(Arc::new(move |event| {
            if tx.try_send(Routed::Tracked(event)).is_err() {
                trace!("cycle task gone, tracked set dropped");
            }
        }))?;
        Ok(())
    }
}

/// Why the cycle task stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Termination {
    Completed,
    Faulted,
    Cancelled,
    ReceiverDropped,
}

impl Termination {
    fn as_str(self) -> &'static str {
        match self {
            Termination::Completed => "completed",
            Termination::Faulted => "faulted",
            Termination::Cancelled => "cancelled",
            Termination::ReceiverDropped => "receiver_dropped",
        }
    }
}

/// Single writer over both synchronizers
struct CycleTask {
    detectors: StreamSynchronizer<FrameEvent>,
    cycle: StreamSynchronizer<CyclePart>,
    allocator: TrackingSlotAllocator,
    projector: GestureResultProjector,
    bindings: SlotBindings,
    sources: Arc<SourceSet>,
    stats: Arc<Mutex<PipelineStats>>,
    next_cycle_id: u64,
}

impl CycleTask {
    async fn run(
        mut self,
        routed: Receiver<Routed>,
        out: mpsc::Sender<Result<GestureBatch>>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let started = Instant::now();

        let reason = loop {
            let message = tokio::select! {
                biased;
                _ = &mut shutdown => break Termination::Cancelled,
                message = routed.recv() => message,
            };
            let Ok(message) = message else {
                debug!("all producers detached");
                break Termination::Completed;
            };

            let (item, terminal) = match self.handle(message) {
                Ok(Some(batch)) => (Some(Ok(batch)), false),
                Ok(None) => (None, false),
                Err(e) => {
                    warn!(error = %e, "Pipeline faulted");
                    self.stats_lock().faults += 1;
                    (Some(Err(e)), true)
                }
            };

            if let Some(item) = item {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => break Termination::Cancelled,
                    sent = out.send(item) => {
                        if sent.is_err() {
                            break Termination::ReceiverDropped;
                        }
                    }
                }
            }

            if terminal {
                break Termination::Faulted;
            }
            if self.cycle.state() == SyncState::Completed {
                break Termination::Completed;
            }
        };

        self.finish(routed, reason, started);
    }

    /// Apply one routed event; returns the batch it completed, if any.
    fn handle(&mut self, message: Routed) -> Result<Option<GestureBatch>> {
        self.stats_lock().events_routed += 1;

        let aligned = match message {
            Routed::Frame(slot, event) => {
                record_event_routed("detector");
                let was_running = !self.detectors.is_terminated();
                let frames = self.detectors.on_event(slot, event)?;
                let aligned = match frames {
                    Some(frames) => self.cycle.push(FRAMES, CyclePart::Frames(frames))?,
                    None => None,
                };
                if was_running && self.detectors.state() == SyncState::Completed {
                    debug!(slot, "detector zip completed, stopping detectors");
                    self.sources.stop_detectors();
                    self.cycle.complete(FRAMES)?;
                }
                aligned
            }
            Routed::Tracked(event) => {
                record_event_routed("tracker");
                self.cycle.on_event(TRACKED, event.map(CyclePart::Tracked))?
            }
        };

        Ok(aligned.and_then(|parts| self.emit(parts)))
    }

    /// Allocate, project and package one aligned cycle
    fn emit(&mut self, parts: Vec<CyclePart>) -> Option<GestureBatch> {
        let mut parts = parts.into_iter();
        let (Some(CyclePart::Frames(frames)), Some(CyclePart::Tracked(tracked))) =
            (parts.next(), parts.next())
        else {
            warn!("misaligned cycle dropped");
            return None;
        };

        let started = Instant::now();
        let max_backlog = self
            .detectors
            .backlogs()
            .into_iter()
            .chain(self.cycle.backlogs())
            .max()
            .unwrap_or(0);

        let report = self.allocator.reconcile(&self.bindings, &tracked);
        let (results, projection) = self.projector.project(frames, &tracked);

        let cycle_id = self.next_cycle_id;
        self.next_cycle_id += 1;

        let meta = CycleMeta {
            assignments: report.assignments,
            released_slots: report.released_slots,
            unassigned: report.unassigned,
            absent_frames: projection.absent_frames,
            untracked_frames: projection.untracked_frames,
            frames_released: projection.frames_released,
            max_backlog,
        };

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        record_cycle_metrics(&meta, cycle_id, tracked.len());
        record_cycle_latency_ms(latency_ms);
        self.stats_lock()
            .record_cycle(&meta, tracked.len(), latency_ms);

        debug!(
            cycle_id,
            tracked = tracked.len(),
            assigned = meta.assignments.len(),
            unassigned = meta.unassigned.len(),
            absent = meta.absent_frames,
            backlog = max_backlog,
            "Cycle emitted"
        );

        Some(GestureBatch {
            cycle_id,
            results,
            tracked,
            bindings: self.bindings.snapshot(),
            meta,
        })
    }

    /// Stop every source and release everything still held
    fn finish(self, routed: Receiver<Routed>, reason: Termination, started: Instant) {
        self.sources.stop_all();

        routed.close();
        let mut dropped = 0usize;
        while let Ok(message) = routed.try_recv() {
            drop(message);
            dropped += 1;
        }

        let pending = self.detectors.backlogs().iter().sum::<usize>()
            + self.cycle.backlogs().iter().sum::<usize>();
        let cycles = self.detectors.cycles();

        {
            let mut stats = self.stats_lock();
            stats.duration = started.elapsed();
            stats.log_summary();
        }
        record_pipeline_terminated(reason.as_str());

        let CycleTask {
            detectors, cycle, ..
        } = self;
        drop(detectors);
        drop(cycle);

        info!(
            reason = reason.as_str(),
            detector_cycles = cycles,
            pending_items = pending,
            undelivered_events = dropped,
            "Pipeline shutdown complete"
        );
    }

    fn stats_lock(&self) -> MutexGuard<'_, PipelineStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
