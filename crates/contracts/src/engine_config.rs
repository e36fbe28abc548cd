//! Engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::GestureKind;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of detector slots (sensor-reported maximum tracked bodies)
    #[serde(default = "default_slot_count")]
    pub slot_count: usize,

    /// Which gesture kind the pipeline detects
    #[serde(default)]
    pub gesture_kind: GestureKind,

    /// Output channel capacity (batches)
    #[serde(default = "default_output_capacity")]
    pub output_capacity: usize,

    /// Gesture catalogue file (TOML or JSON)
    #[serde(default)]
    pub catalogue_path: Option<PathBuf>,
}

fn default_slot_count() -> usize {
    6
}

fn default_output_capacity() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slot_count: default_slot_count(),
            gesture_kind: GestureKind::default(),
            output_capacity: default_output_capacity(),
            catalogue_path: None,
        }
    }
}
