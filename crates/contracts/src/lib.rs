//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Cycle Model
//! - One cycle = one frame from every detector slot + one tracked-set snapshot
//! - `TrackingId(0)` is the "unassigned" sentinel

mod batch;
mod bindings;
mod catalogue;
mod engine_config;
mod error;
mod event_source;
mod frame;
mod gesture;
mod tracking;

pub use batch::*;
pub use bindings::SlotBindings;
pub use catalogue::*;
pub use engine_config::*;
pub use error::*;
pub use event_source::*;
pub use frame::*;
pub use gesture::*;
pub use tracking::*;
