//! Capture requests sent to the remote renderer.

use serde::{Deserialize, Serialize};

/// A single position on the scene timeline.
///
/// A run uses exactly one addressing mode; the schedule decides which from
/// what the renderer reported at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CaptureRequest {
    /// Milliseconds since the start of the scene.
    Time {
        millis: f64,
        /// Position normalized to the scene duration, in `[0.0, 1.0]`.
        progress: f64,
    },
    /// An explicit frame number.
    Frame { index: i64 },
}

impl CaptureRequest {
    pub fn time(millis: f64, duration_ms: f64) -> Self {
        let progress = if duration_ms > 0.0 {
            (millis / duration_ms).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self::Time { millis, progress }
    }

    pub fn frame(index: i64) -> Self {
        Self::Frame { index }
    }

    /// Time value in milliseconds, if this is a time request.
    pub fn millis(&self) -> Option<f64> {
        match self {
            Self::Time { millis, .. } => Some(*millis),
            Self::Frame { .. } => None,
        }
    }

    /// Frame index, if this is a frame request.
    pub fn frame_index(&self) -> Option<i64> {
        match self {
            Self::Time { .. } => None,
            Self::Frame { index } => Some(*index),
        }
    }
}

impl std::fmt::Display for CaptureRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Time { millis, .. } => write!(f, "t={millis:.3}ms"),
            Self::Frame { index } => write!(f, "frame={index}"),
        }
    }
}
