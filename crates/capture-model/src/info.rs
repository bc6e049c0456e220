//! Session information reported by the remote renderer.

use serde::{Deserialize, Serialize};

/// Returned once by the renderer's initialization call.
///
/// Either `seconds` or both frame bounds describe the scene's extent; the
/// schedule picks the addressing mode from whichever is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCaptureInfo {
    /// Identifies which scene/program the page is running.
    pub source: String,

    /// The page's effective `devicePixelRatio`.
    pub device_pixel_ratio: f64,

    /// Scene duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<f64>,

    /// First frame index (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_frame: Option<i64>,

    /// Last frame index (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_frame: Option<i64>,
}

impl RemoteCaptureInfo {
    /// Session info for a scene addressed by time.
    pub fn timed(source: impl Into<String>, device_pixel_ratio: f64, seconds: f64) -> Self {
        Self {
            source: source.into(),
            device_pixel_ratio,
            seconds: Some(seconds),
            first_frame: None,
            last_frame: None,
        }
    }

    /// Session info for a scene addressed by frame number.
    pub fn framed(
        source: impl Into<String>,
        device_pixel_ratio: f64,
        first_frame: i64,
        last_frame: i64,
    ) -> Self {
        Self {
            source: source.into(),
            device_pixel_ratio,
            seconds: None,
            first_frame: Some(first_frame),
            last_frame: Some(last_frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_camel_case_payload() {
        let json = r#"{"source":"intro","devicePixelRatio":2,"firstFrame":10,"lastFrame":12}"#;
        let info: RemoteCaptureInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info, RemoteCaptureInfo::framed("intro", 2.0, 10, 12));
    }

    #[test]
    fn test_parses_duration_payload() {
        let json = r#"{"source":"intro","devicePixelRatio":1.5,"seconds":8.5}"#;
        let info: RemoteCaptureInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.seconds, Some(8.5));
        assert_eq!(info.first_frame, None);
    }
}
