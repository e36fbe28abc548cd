//! GestureBatch - Orchestrator output
//!
//! One item per synchronization cycle.

use serde::{Deserialize, Serialize};

use crate::{Assignment, GestureResults, SlotBinding, SlotIndex, TrackedSet, TrackingId};

/// Results of one synchronization cycle
#[derive(Debug, Clone)]
pub struct GestureBatch {
    /// Cycle sequence number (monotonically increasing, starts at 1)
    pub cycle_id: u64,

    /// Gesture → result mapping per slot, slot order
    pub results: Vec<GestureResults>,

    /// Tracked set captured in this cycle
    pub tracked: TrackedSet,

    /// Slot bindings after allocation
    pub bindings: Vec<SlotBinding>,

    /// Cycle metadata
    pub meta: CycleMeta,
}

impl GestureBatch {
    pub fn slot_count(&self) -> usize {
        self.results.len()
    }
}

/// Cycle metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleMeta {
    /// Bindings made by the allocator this cycle
    pub assignments: Vec<Assignment>,

    /// Slots whose stale identifier was cleared without a replacement
    pub released_slots: Vec<SlotIndex>,

    /// Tracked identifiers left without a slot (overcapacity)
    pub unassigned: Vec<TrackingId>,

    /// Slots with no frame this cycle
    pub absent_frames: u32,

    /// Frames discarded because their identifier was invalid or untracked
    pub untracked_frames: u32,

    /// Frames released by the projector
    pub frames_released: u32,

    /// Deepest per-stream backlog at emission
    pub max_backlog: usize,
}
