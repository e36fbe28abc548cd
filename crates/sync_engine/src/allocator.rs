//! Tracking slot allocator.
//!
//! Binds tracked identifiers to free detector slots once per cycle. Ties are broken by
//! ascending identifier and ascending slot index, so identical input always yields
//! identical bindings.

use std::collections::BTreeSet;

use contracts::{Assignment, SlotBinding, SlotBindings, SlotIndex, TrackedSet, TrackingId};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Outcome of one allocation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationReport {
    /// New bindings, ascending slot order
    pub assignments: Vec<Assignment>,

    /// Slots reset to the sentinel without a replacement
    pub released_slots: Vec<SlotIndex>,

    /// Tracked identifiers left without a slot
    pub unassigned: Vec<TrackingId>,
}

impl AllocationReport {
    /// `true` if the pass changed no binding
    pub fn is_noop(&self) -> bool {
        self.assignments.is_empty() && self.released_slots.is_empty()
    }
}

/// Stateless allocator over the shared binding store
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackingSlotAllocator;

impl TrackingSlotAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Allocate in place.
    ///
    /// Live slots (valid, assigned, still tracked) are left untouched; when two slots hold
    /// the same live identifier the lower slot keeps it. Every other slot is free and is
    /// paired with the smallest unclaimed identifier.
    pub fn allocate(&self, bindings: &mut [SlotBinding], tracked: &TrackedSet) -> AllocationReport {
        let mut bound = BTreeSet::new();
        let mut free = Vec::new();
        for (slot, binding) in bindings.iter().enumerate() {
            if binding.is_live(tracked) && bound.insert(binding.tracking_id) {
                continue;
            }
            free.push(slot);
        }

        let unclaimed: Vec<TrackingId> = tracked.iter().filter(|id| !bound.contains(id)).collect();

        let mut report = AllocationReport::default();
        for (i, &slot) in free.iter().enumerate() {
            match unclaimed.get(i) {
                Some(&id) => {
                    bindings[slot] = SlotBinding::bound(id);
                    report.assignments.push(Assignment {
                        slot,
                        tracking_id: id,
                    });
                }
                None => {
                    let held = bindings[slot];
                    let untracked = !tracked.contains(held.tracking_id);
                    let duplicate = held.valid && bound.contains(&held.tracking_id);
                    if held.tracking_id.is_assigned() && (untracked || duplicate) {
                        bindings[slot] = SlotBinding::UNBOUND;
                        report.released_slots.push(slot);
                    }
                }
            }
        }
        report.unassigned = unclaimed.into_iter().skip(free.len()).collect();
        report
    }

    /// Allocate against the shared store inside one critical section.
    #[instrument(
        level = "debug",
        name = "slot_allocation",
        skip_all,
        fields(tracked = tracked.len())
    )]
    pub fn reconcile(&self, store: &SlotBindings, tracked: &TrackedSet) -> AllocationReport {
        let report = store.with_bindings(|bindings| self.allocate(bindings, tracked));

        for assignment in &report.assignments {
            debug!(
                slot = assignment.slot,
                tracking_id = %assignment.tracking_id,
                "slot bound"
            );
        }
        if !report.released_slots.is_empty() {
            debug!(slots = ?report.released_slots, "stale slots released");
        }
        if !report.unassigned.is_empty() {
            debug!(ids = ?report.unassigned, "tracked ids left unassigned");
        }

        metrics::counter!("gesture_sync_slots_assigned_total")
            .increment(report.assignments.len() as u64);
        metrics::counter!("gesture_sync_slots_released_total")
            .increment(report.released_slots.len() as u64);
        metrics::counter!("gesture_sync_ids_unassigned_total")
            .increment(report.unassigned.len() as u64);

        report
    }
}
