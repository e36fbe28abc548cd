//! Error types for pipeline operations.

use contracts::ContractError;
use ingestion::IngestionError;
use sync_engine::SyncError;
use thiserror::Error;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid construction input
    #[error("Failed to construct pipeline: {message}")]
    Construction { message: String },

    /// Contract-level failure (config, detector factory, io)
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Subscription failure
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    /// Synchronizer failure, including faults forwarded from a source
    #[error("Synchronization failed: {0}")]
    Sync(#[from] SyncError),

    /// Cycle task ended abnormally
    #[error("Cycle task failed: {message}")]
    Task { message: String },
}

impl PipelineError {
    pub fn construction(message: impl Into<String>) -> Self {
        Self::Construction {
            message: message.into(),
        }
    }

    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }

    /// `true` when the error is a fault forwarded from a detector or the tracker
    pub fn is_upstream_fault(&self) -> bool {
        matches!(self, Self::Sync(SyncError::UpstreamFault { .. }))
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
