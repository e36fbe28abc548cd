//! Gesture definitions and per-frame detection results.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Gesture kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    /// Yes/no detection with a confidence
    #[default]
    Discrete,
    /// Progress along a motion, `0.0..=1.0`
    Continuous,
}

/// Gesture definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gesture {
    /// Unique name within a catalogue.
    ///
    /// Shared so result maps can key on the gesture without copying the name every frame.
    pub name: Arc<str>,

    /// Gesture kind
    #[serde(default)]
    pub kind: GestureKind,
}

impl Gesture {
    pub fn new(name: impl Into<Arc<str>>, kind: GestureKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn discrete(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, GestureKind::Discrete)
    }

    pub fn continuous(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, GestureKind::Continuous)
    }
}

/// Discrete gesture result
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscreteGestureResult {
    /// Gesture detected this frame
    pub detected: bool,

    /// Detector confidence (0-1)
    pub confidence: f32,

    /// First frame of a new detection
    pub first_frame_detected: bool,
}

/// Continuous gesture result
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuousGestureResult {
    /// Progress (0-1)
    pub progress: f32,
}

/// Result for one gesture in one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GestureResult {
    Discrete(DiscreteGestureResult),
    Continuous(ContinuousGestureResult),
}

impl GestureResult {
    pub fn kind(&self) -> GestureKind {
        match self {
            GestureResult::Discrete(_) => GestureKind::Discrete,
            GestureResult::Continuous(_) => GestureKind::Continuous,
        }
    }

    pub fn as_discrete(&self) -> Option<&DiscreteGestureResult> {
        match self {
            GestureResult::Discrete(result) => Some(result),
            GestureResult::Continuous(_) => None,
        }
    }

    pub fn as_continuous(&self) -> Option<&ContinuousGestureResult> {
        match self {
            GestureResult::Continuous(result) => Some(result),
            GestureResult::Discrete(_) => None,
        }
    }
}

/// Gesture → result mapping for one slot in one cycle
pub type GestureResults = HashMap<Gesture, GestureResult>;
