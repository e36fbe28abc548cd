//! # Sync Engine
//!
//! 手势槽位同步引擎。
//!
//! 负责：
//! - 严格 N 路对齐（`StreamSynchronizer`）
//! - 跟踪 ID → 检测器槽位分配（`TrackingSlotAllocator`）
//! - 帧 → 手势结果投影，并释放帧资源（`GestureResultProjector`）
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::{GestureResultProjector, StreamSynchronizer, TrackingSlotAllocator};
//!
//! let mut detectors = StreamSynchronizer::new("detectors", slot_count)?;
//! let allocator = TrackingSlotAllocator::new();
//! let projector = GestureResultProjector::new();
//!
//! if let Some(frames) = detectors.push(slot, frame)? {
//!     let report = allocator.reconcile(&bindings, &tracked);
//!     let (results, stats) = projector.project(frames, &tracked);
//! }
//! ```

mod allocator;
mod error;
mod projector;
mod synchronizer;

// Re-exports
pub use allocator::{AllocationReport, TrackingSlotAllocator};
pub use error::SyncError;
pub use projector::{GestureResultProjector, ProjectionStats};
pub use synchronizer::{StreamSynchronizer, SyncState};
