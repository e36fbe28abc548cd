//! SlotBindings - shared slot-binding store
//!
//! Owned by the orchestrator, read by detector sources when they stamp frames,
//! written by the allocator once per cycle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{SlotBinding, SlotIndex};

/// Fixed-size table of slot bindings behind one mutex.
///
/// Cloning shares the table. The slot count never changes after construction.
#[derive(Debug, Clone)]
pub struct SlotBindings {
    inner: Arc<Mutex<Vec<SlotBinding>>>,
}

impl SlotBindings {
    /// Create `slot_count` unbound slots
    pub fn new(slot_count: usize) -> Self {
        Self::from_bindings(vec![SlotBinding::UNBOUND; slot_count])
    }

    /// Create a store with pre-existing bindings
    pub fn from_bindings(bindings: Vec<SlotBinding>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(bindings)),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.lock().len()
    }

    /// Current binding of `slot`
    pub fn get(&self, slot: SlotIndex) -> Option<SlotBinding> {
        self.lock().get(slot).copied()
    }

    /// Copy of all bindings in slot order
    pub fn snapshot(&self) -> Vec<SlotBinding> {
        self.lock().clone()
    }

    /// Mark a slot's binding invalid (native tracker lost the entity).
    ///
    /// Returns `false` if the slot does not exist.
    pub fn invalidate(&self, slot: SlotIndex) -> bool {
        match self.lock().get_mut(slot) {
            Some(binding) => {
                binding.valid = false;
                true
            }
            None => false,
        }
    }

    /// Run `f` over all bindings inside one critical section.
    ///
    /// The slice cannot be resized, so the slot count stays fixed.
    pub fn with_bindings<R>(&self, f: impl FnOnce(&mut [SlotBinding]) -> R) -> R {
        let mut guard = self.lock();
        f(guard.as_mut_slice())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SlotBinding>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
