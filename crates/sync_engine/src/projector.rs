//! Gesture result projector.
//!
//! Turns one cycle's frames into per-slot result mappings. Every frame is released
//! right after extraction, whether or not its results are used.

use contracts::{FrameEvent, GestureKind, GestureResults, TrackedSet};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Per-cycle projection counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionStats {
    /// Frames handed back to the native source
    pub frames_released: u32,

    /// Slots with no frame
    pub absent_frames: u32,

    /// Frames whose identifier was invalid or no longer tracked
    pub untracked_frames: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GestureResultProjector {
    kind: Option<GestureKind>,
}

impl GestureResultProjector {
    /// Projector passing every result through
    pub fn new() -> Self {
        Self::default()
    }

    /// Projector keeping only results of `kind`
    pub fn for_kind(kind: GestureKind) -> Self {
        Self { kind: Some(kind) }
    }

    pub fn kind(&self) -> Option<GestureKind> {
        self.kind
    }

    /// Project frames in slot order into result mappings in slot order.
    pub fn project(
        &self,
        frames: Vec<FrameEvent>,
        tracked: &TrackedSet,
    ) -> (Vec<GestureResults>, ProjectionStats) {
        let mut stats = ProjectionStats::default();
        let mut output = Vec::with_capacity(frames.len());

        for (slot, event) in frames.into_iter().enumerate() {
            let Some(mut frame) = event else {
                stats.absent_frames += 1;
                output.push(GestureResults::new());
                continue;
            };

            let id = frame.tracking_id();
            let results = if frame.is_tracking_id_valid() && id.is_assigned() && tracked.contains(id)
            {
                let mut results = frame.take_results().unwrap_or_default();
                if let Some(kind) = self.kind {
                    results.retain(|gesture, result| gesture.kind == kind && result.kind() == kind);
                }
                results
            } else {
                stats.untracked_frames += 1;
                trace!(slot, tracking_id = %id, "frame dropped, identifier not tracked");
                GestureResults::new()
            };

            frame.release();
            stats.frames_released += 1;
            output.push(results);
        }

        metrics::counter!("gesture_sync_frames_released_total")
            .increment(u64::from(stats.frames_released));
        metrics::counter!("gesture_sync_frames_absent_total")
            .increment(u64::from(stats.absent_frames));
        metrics::counter!("gesture_sync_frames_untracked_total")
            .increment(u64::from(stats.untracked_frames));

        (output, stats)
    }
}
