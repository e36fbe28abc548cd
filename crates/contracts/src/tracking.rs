//! Tracking identifiers, slot bindings and the per-cycle tracked set.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Detector slot index, `0..N`.
pub type SlotIndex = usize;

/// Opaque 64-bit handle naming one tracked entity.
///
/// `0` is the sentinel for "unassigned".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TrackingId(u64);

impl TrackingId {
    /// Sentinel value held by slots without a binding
    pub const UNASSIGNED: Self = Self(0);

    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// `false` for the sentinel
    #[inline]
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for TrackingId {
    #[inline]
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_assigned() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "unassigned")
        }
    }
}

/// Identifiers the upstream tracker reports as live in one cycle.
///
/// Ordered ascending; the sentinel is never a member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedSet(BTreeSet<TrackingId>);

impl TrackedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw identifiers, ignoring the sentinel.
    pub fn from_ids(ids: impl IntoIterator<Item = u64>) -> Self {
        ids.into_iter().map(TrackingId::new).collect()
    }

    /// Insert an identifier. Returns `false` for the sentinel or a duplicate.
    pub fn insert(&mut self, id: TrackingId) -> bool {
        id.is_assigned() && self.0.insert(id)
    }

    #[inline]
    pub fn contains(&self, id: TrackingId) -> bool {
        self.0.contains(&id)
    }

    /// Ascending identifier order
    pub fn iter(&self) -> impl Iterator<Item = TrackingId> + '_ {
        self.0.iter().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<TrackingId> for TrackedSet {
    fn from_iter<I: IntoIterator<Item = TrackingId>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Identifier currently held by one detector slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotBinding {
    /// Bound identifier, or the sentinel
    pub tracking_id: TrackingId,

    /// Cleared by the detector source when the native tracker loses the entity
    pub valid: bool,
}

impl SlotBinding {
    pub const UNBOUND: Self = Self {
        tracking_id: TrackingId::UNASSIGNED,
        valid: false,
    };

    /// A valid binding to `id`
    pub const fn bound(id: TrackingId) -> Self {
        Self {
            tracking_id: id,
            valid: true,
        }
    }

    /// Valid, not the sentinel, and still present in `tracked`.
    #[inline]
    pub fn is_live(&self, tracked: &TrackedSet) -> bool {
        self.valid && self.tracking_id.is_assigned() && tracked.contains(self.tracking_id)
    }
}

/// One slot-to-identifier binding made by the allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub slot: SlotIndex,
    pub tracking_id: TrackingId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_never_tracked() {
        let set = TrackedSet::from_ids([0, 7, 3]);
        assert_eq!(set.len(), 2);
        assert!(!set.contains(TrackingId::UNASSIGNED));
    }

    #[test]
    fn test_tracked_set_iterates_ascending() {
        let set = TrackedSet::from_ids([9, 5, 72, 6]);
        let ids: Vec<u64> = set.iter().map(TrackingId::get).collect();
        assert_eq!(ids, vec![5, 6, 9, 72]);
    }

    #[test]
    fn test_binding_liveness() {
        let tracked = TrackedSet::from_ids([5]);
        assert!(SlotBinding::bound(5.into()).is_live(&tracked));
        assert!(!SlotBinding::bound(9.into()).is_live(&tracked));
        assert!(!SlotBinding::UNBOUND.is_live(&tracked));

        let invalid = SlotBinding {
            tracking_id: 5.into(),
            valid: false,
        };
        assert!(!invalid.is_live(&tracked));
    }

    #[test]
    fn test_display() {
        assert_eq!(TrackingId::new(42).to_string(), "42");
        assert_eq!(TrackingId::UNASSIGNED.to_string(), "unassigned");
    }
}
