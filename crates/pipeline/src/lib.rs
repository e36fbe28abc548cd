//! # Pipeline
//!
//! Gesture slot synchronization pipeline.
//!
//! Wires N detector sources and one tracked-set source through:
//! - `EventStreamAdapter` per source
//! - a strict N-way `StreamSynchronizer` over the detectors
//! - a second `StreamSynchronizer` aligning each detector cycle with a tracked set
//! - `TrackingSlotAllocator`, then `GestureResultProjector`
//!
//! ## Usage Example
//!
//! ```ignore
//! use pipeline::Orchestrator;
//!
//! let orchestrator = Orchestrator::new(config, &factory, tracked_source, &gestures)?;
//! let mut stream = orchestrator.start()?;
//!
//! while let Some(batch) = stream.next().await {
//!     let batch = batch?;
//!     for (slot, results) in batch.results.iter().enumerate() {
//!         // ...
//!     }
//! }
//! ```

mod error;
mod orchestrator;
mod stats;
mod stream;

pub use error::{PipelineError, Result};
pub use orchestrator::Orchestrator;
pub use stats::PipelineStats;
pub use stream::GestureStream;
