//! Sync engine errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A synchronizer needs at least one input stream
    #[error("synchronizer '{label}' requires at least one input stream")]
    NoStreams { label: String },

    #[error("stream index {index} out of range for synchronizer '{label}' ({streams} streams)")]
    StreamOutOfRange {
        label: String,
        index: usize,
        streams: usize,
    },

    /// Fault forwarded from an input stream
    #[error("upstream fault on stream {stream} of '{label}': {reason}")]
    UpstreamFault {
        label: String,
        stream: usize,
        reason: String,
    },
}

impl SyncError {
    pub fn upstream(label: impl Into<String>, stream: usize, reason: impl Into<String>) -> Self {
        Self::UpstreamFault {
            label: label.into(),
            stream,
            reason: reason.into(),
        }
    }
}
