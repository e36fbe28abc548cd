//! GestureFrame - per-slot detector output for one cycle
//!
//! A frame wraps a scarce native resource. The release hook runs exactly once:
//! on an explicit `release()` or, failing that, when the frame is dropped.

use std::fmt;

use crate::{GestureResults, SlotBinding, SlotIndex, TrackingId};

/// Native release hook
pub type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Detector output for one slot in one cycle
pub struct GestureFrame {
    slot: SlotIndex,
    tracking_id: TrackingId,
    tracking_id_valid: bool,
    results: Option<GestureResults>,
    release: Option<ReleaseFn>,
}

/// One detector event: `None` when the native event fired but no frame could be acquired.
pub type FrameEvent = Option<GestureFrame>;

impl GestureFrame {
    /// Create a frame stamped with the binding the source held when producing it
    pub fn new(slot: SlotIndex, binding: SlotBinding, results: Option<GestureResults>) -> Self {
        Self {
            slot,
            tracking_id: binding.tracking_id,
            tracking_id_valid: binding.valid,
            results,
            release: None,
        }
    }

    /// Attach the native release hook
    pub fn with_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    pub fn slot(&self) -> SlotIndex {
        self.slot
    }

    /// Identifier the source was bound to when the frame was produced
    pub fn tracking_id(&self) -> TrackingId {
        self.tracking_id
    }

    pub fn is_tracking_id_valid(&self) -> bool {
        self.tracking_id_valid
    }

    pub fn results(&self) -> Option<&GestureResults> {
        self.results.as_ref()
    }

    /// Move the result mapping out, leaving `None`
    pub fn take_results(&mut self) -> Option<GestureResults> {
        self.results.take()
    }

    /// `true` once the native resource has been handed back
    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    /// Release the native resource now
    pub fn release(mut self) {
        self.release_native();
    }

    fn release_native(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for GestureFrame {
    fn drop(&mut self) {
        self.release_native();
    }
}

impl fmt::Debug for GestureFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GestureFrame")
            .field("slot", &self.slot)
            .field("tracking_id", &self.tracking_id)
            .field("tracking_id_valid", &self.tracking_id_valid)
            .field("results", &self.results.as_ref().map(|r| r.len()))
            .field("released", &self.is_released())
            .finish()
    }
}
