//! Pipeline statistics and metrics.

use std::time::Duration;

use contracts::CycleMeta;
use observability::CycleMetricsAggregator;
use tracing::info;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Batches emitted downstream
    pub cycles_emitted: u64,

    /// Source events routed to the cycle task
    pub events_routed: u64,

    /// Frames released by the projector
    pub frames_released: u64,

    /// Slot bindings made by the allocator
    pub assignments: u64,

    /// Tracked identifiers left without a slot, summed over cycles
    pub unassigned: u64,

    /// Upstream faults seen
    pub faults: u64,

    /// Number of detector slots
    pub slot_count: usize,

    /// Time between start and termination
    pub duration: Duration,

    /// Cycle metrics aggregator
    pub cycle_metrics: CycleMetricsAggregator,
}

impl PipelineStats {
    pub(crate) fn with_slots(slot_count: usize) -> Self {
        Self {
            slot_count,
            ..Default::default()
        }
    }

    pub(crate) fn record_cycle(&mut self, meta: &CycleMeta, tracked: usize, latency_ms: f64) {
        self.cycles_emitted += 1;
        self.frames_released += u64::from(meta.frames_released);
        self.assignments += meta.assignments.len() as u64;
        self.unassigned += meta.unassigned.len() as u64;
        self.cycle_metrics.update(meta, tracked);
        self.cycle_metrics.record_latency_ms(latency_ms);
    }

    /// Calculate cycles per second throughput
    pub fn cycles_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.cycles_emitted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Log the run summary at shutdown
    pub(crate) fn log_summary(&self) {
        let summary = self.cycle_metrics.summary();
        info!(
            duration_s = self.duration.as_secs_f64(),
            slots = self.slot_count,
            cycles = self.cycles_emitted,
            events_routed = self.events_routed,
            cycles_per_second = self.cycles_per_second(),
            faults = self.faults,
            "Pipeline statistics"
        );
        info!("{summary}");
    }
}
