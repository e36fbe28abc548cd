//! EventSource trait - push-based native event source abstraction
//!
//! Detector slots and the body tracker deliver through callbacks on their own
//! threads. This trait decouples adapters from the concrete native source, so
//! mock and hardware sources are handled the same way.

use std::sync::Arc;

use crate::{ContractError, FrameEvent, Gesture, SlotBindings, SlotIndex, TrackedSet};

/// Event delivered by a push source
#[derive(Debug)]
pub enum SourceEvent<T> {
    /// Next item
    Next(T),
    /// Source ended normally
    Completed,
    /// Source failed; terminal
    Failed(String),
}

impl<T> SourceEvent<T> {
    /// `true` for `Completed` and `Failed`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SourceEvent::Next(_))
    }

    /// Transform the carried item, keeping terminal events as they are
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SourceEvent<U> {
        match self {
            SourceEvent::Next(item) => SourceEvent::Next(f(item)),
            SourceEvent::Completed => SourceEvent::Completed,
            SourceEvent::Failed(reason) => SourceEvent::Failed(reason),
        }
    }
}

/// Event callback type
///
/// Shared with the native source, which may invoke it from any thread.
pub type EventCallback<T> = Arc<dyn Fn(SourceEvent<T>) + Send + Sync>;

/// Push-based event source
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn EventSource<TrackedSet>> = tracker.tracked_set_source();
/// source.listen(Arc::new(|event| {
///     println!("tracked: {:?}", event);
/// }));
/// // ...
/// source.stop();
/// ```
pub trait EventSource<T>: Send + Sync {
    /// Source identifier, used for logging
    fn source_id(&self) -> &str;

    /// Register the callback and start delivering.
    ///
    /// Repeated calls while listening are ignored.
    fn listen(&self, callback: EventCallback<T>);

    /// Stop delivering and release the native reader. Idempotent.
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}

/// Per-slot detector source
pub type DetectorSource = Box<dyn EventSource<FrameEvent>>;

/// Tracked-entity-set source
pub type TrackedSetSource = Box<dyn EventSource<TrackedSet>>;

/// Creates one detector source per slot.
///
/// The source reads its slot's binding from `bindings` when it stamps frames.
pub trait DetectorFactory: Send + Sync {
    fn create_detector(
        &self,
        slot: SlotIndex,
        gestures: &[Gesture],
        bindings: SlotBindings,
    ) -> Result<DetectorSource, ContractError>;
}
