//! # Ingestion
//!
//! Event ingestion module.
//!
//! Responsibilities:
//! - Wrap native push sources (`EventSource`) in cancellable subscriptions
//! - Count received / forwarded / discarded events
//! - Provide mock sources for sensor-free testing
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::EventStreamAdapter;
//!
//! let adapter = EventStreamAdapter::new(tracked_set_source);
//! let subscription = adapter.subscribe(Arc::new(|event| {
//!     // runs on the source's callback thread
//! }))?;
//! // ...
//! adapter.cancel(&subscription)?;
//! ```
//!
//! ## Lazy Sequence
//!
//! ```ignore
//! let (subscription, rx) = adapter.subscribe_channel()?;
//! while let Ok(event) = rx.recv().await {
//!     // ...
//! }
//! ```

mod adapter;
mod config;
mod error;
pub mod mock;

// Re-exports
pub use adapter::{EventStreamAdapter, Subscription};
pub use config::{AdapterMetrics, MetricsSnapshot};
pub use error::{IngestionError, Result};
pub use mock::{
    FrameLedger, ManualSource, ManualSourceHandle, MockDetectorConfig, MockDetectorFactory,
    MockDetectorSource, MockTrackedSource,
};
