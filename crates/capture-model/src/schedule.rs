//! Frame schedule generation.
//!
//! Turns a frame rate and the scene extent reported by the renderer into the
//! ordered list of [`CaptureRequest`]s for a run. Pure computation: no I/O,
//! so schedules are fully deterministic and testable without a renderer.

use scenecast_common::error::{ScenecastError, ScenecastResult};

use crate::info::RemoteCaptureInfo;
use crate::request::CaptureRequest;

/// Slack used when rounding `duration * fps` to a whole frame count, so that
/// a centre landing exactly on the end of the scene is not lost to float noise.
const FRAME_COUNT_EPSILON: f64 = 1e-9;

/// The deterministic sequence of requests for one capture run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameSchedule {
    /// Center-of-frame sampling along a timeline measured in milliseconds.
    Timed {
        /// Milliseconds per frame (`1000 / fps`).
        step_ms: f64,
        /// Scene length in milliseconds.
        duration_ms: f64,
        /// Number of frames.
        count: u64,
    },
    /// Inclusive range of explicit frame indices.
    Frames { first: i64, last: i64 },
}

impl FrameSchedule {
    /// Time-based schedule: one request per frame, sampled at the frame
    /// center. The sequence stops before the first center past the end of
    /// the scene, so every request lies within `[0, duration]`.
    pub fn timed(fps: f64, duration_secs: f64) -> ScenecastResult<Self> {
        validate_fps(fps)?;
        if !(duration_secs.is_finite() && duration_secs > 0.0) {
            return Err(ScenecastError::config(format!(
                "Invalid scene duration: {duration_secs} seconds"
            )));
        }

        // Center n is (n + 0.5) / fps; it fits while n <= duration * fps - 0.5.
        let count = (duration_secs * fps + 0.5 + FRAME_COUNT_EPSILON).floor() as u64;
        if count == 0 {
            return Err(ScenecastError::config(format!(
                "Scene duration of {duration_secs} seconds is shorter than half a frame at {fps} fps"
            )));
        }
        Ok(Self::Timed {
            step_ms: 1000.0 / fps,
            duration_ms: duration_secs * 1000.0,
            count,
        })
    }

    /// Frame-index schedule covering `first..=last`.
    pub fn frames(first: i64, last: i64) -> ScenecastResult<Self> {
        if first > last {
            return Err(ScenecastError::config(format!(
                "Invalid frame range: first frame {first} is after last frame {last}"
            )));
        }
        if last.checked_sub(first).is_none() {
            return Err(ScenecastError::config(format!(
                "Frame range {first}..={last} is too large"
            )));
        }
        Ok(Self::Frames { first, last })
    }

    /// Pick the addressing mode from what the renderer reported.
    ///
    /// A complete frame range takes precedence over a duration. A scene that
    /// reports neither cannot be scheduled.
    pub fn from_info(fps: f64, info: &RemoteCaptureInfo) -> ScenecastResult<Self> {
        validate_fps(fps)?;
        match (info.first_frame, info.last_frame, info.seconds) {
            (Some(first), Some(last), _) => Self::frames(first, last),
            (_, _, Some(seconds)) => Self::timed(fps, seconds),
            _ => Err(ScenecastError::config(format!(
                "Scene \"{}\" reported neither a duration nor a complete frame range",
                info.source
            ))),
        }
    }

    /// Total number of requests.
    pub fn len(&self) -> u64 {
        match *self {
            Self::Timed { count, .. } => count,
            Self::Frames { first, last } => (last - first) as u64 + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `n`th request, if it exists.
    pub fn get(&self, n: u64) -> Option<CaptureRequest> {
        if n >= self.len() {
            return None;
        }
        Some(match *self {
            Self::Timed {
                step_ms,
                duration_ms,
                ..
            } => CaptureRequest::time((n as f64 + 0.5) * step_ms, duration_ms),
            Self::Frames { first, .. } => CaptureRequest::frame(first + n as i64),
        })
    }

    /// Iterate the schedule from the beginning. May be called repeatedly.
    pub fn iter(&self) -> ScheduleIter {
        ScheduleIter {
            schedule: *self,
            next: 0,
        }
    }
}

impl<'a> IntoIterator for &'a FrameSchedule {
    type Item = CaptureRequest;
    type IntoIter = ScheduleIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over a [`FrameSchedule`].
#[derive(Debug, Clone)]
pub struct ScheduleIter {
    schedule: FrameSchedule,
    next: u64,
}

impl Iterator for ScheduleIter {
    type Item = CaptureRequest;

    fn next(&mut self) -> Option<Self::Item> {
        let request = self.schedule.get(self.next)?;
        self.next += 1;
        Some(request)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.schedule.len().saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ScheduleIter {}

fn validate_fps(fps: f64) -> ScenecastResult<()> {
    if fps.is_finite() && fps > 0.0 {
        Ok(())
    } else {
        Err(ScenecastError::config(format!(
            "Invalid # of frames per second: {fps}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sixty_fps_two_seconds() {
        let schedule = FrameSchedule::timed(60.0, 2.0).unwrap();
        let times: Vec<f64> = schedule.iter().filter_map(|r| r.millis()).collect();

        assert_eq!(times.len(), 120);
        assert!((times[0] - 8.333_333).abs() < 1e-3);
        assert!((times[119] - 1991.666_667).abs() < 1e-3);
        assert!(times[119] <= 2000.0);
        assert!(times[119] + 1000.0 / 60.0 > 2000.0);
    }

    #[test]
    fn test_frame_range_is_inclusive() {
        let schedule = FrameSchedule::frames(10, 12).unwrap();
        let frames: Vec<i64> = schedule.iter().filter_map(|r| r.frame_index()).collect();
        assert_eq!(frames, vec![10, 11, 12]);
        assert_eq!(schedule.len(), 3);
    }

    #[test]
    fn test_single_frame_range() {
        let schedule = FrameSchedule::frames(-4, -4).unwrap();
        assert_eq!(schedule.iter().collect::<Vec<_>>(), vec![CaptureRequest::frame(-4)]);
    }

    #[test]
    fn test_inverted_range_is_config_error() {
        let err = FrameSchedule::frames(5, 4).unwrap_err();
        assert!(matches!(err, ScenecastError::Config { .. }));
    }

    #[test]
    fn test_frame_range_wins_over_duration() {
        let mut info = RemoteCaptureInfo::framed("demo", 1.0, 0, 9);
        info.seconds = Some(30.0);
        let schedule = FrameSchedule::from_info(60.0, &info).unwrap();
        assert_eq!(schedule, FrameSchedule::Frames { first: 0, last: 9 });
    }

    #[test]
    fn test_incomplete_range_falls_back_to_duration() {
        let mut info = RemoteCaptureInfo::timed("demo", 1.0, 1.0);
        info.first_frame = Some(3);
        let schedule = FrameSchedule::from_info(30.0, &info).unwrap();
        assert_eq!(schedule.len(), 30);
    }

    #[test]
    fn test_missing_extent_is_config_error() {
        let info = RemoteCaptureInfo {
            source: "demo".to_string(),
            device_pixel_ratio: 1.0,
            seconds: None,
            first_frame: Some(0),
            last_frame: None,
        };
        let err = FrameSchedule::from_info(60.0, &info).unwrap_err();
        assert!(matches!(err, ScenecastError::Config { .. }));
    }

    #[test]
    fn test_bad_fps_and_duration_rejected() {
        assert!(FrameSchedule::timed(0.0, 1.0).is_err());
        assert!(FrameSchedule::timed(f64::NAN, 1.0).is_err());
        assert!(FrameSchedule::timed(30.0, 0.0).is_err());
        assert!(FrameSchedule::timed(30.0, f64::INFINITY).is_err());
        let info = RemoteCaptureInfo::framed("demo", 1.0, 0, 1);
        assert!(FrameSchedule::from_info(-1.0, &info).is_err());
    }

    #[test]
    fn test_last_center_stays_inside_scene() {
        let schedule = FrameSchedule::timed(60.0, 1.001).unwrap();
        let times: Vec<f64> = schedule.iter().filter_map(|r| r.millis()).collect();

        assert_eq!(times.len(), 60);
        let last = times[times.len() - 1];
        assert!(last <= 1001.0);
        assert!(last + 1000.0 / 60.0 > 1001.0);
    }

    #[test]
    fn test_center_on_scene_end_is_kept() {
        // 2.5 frames: the third center sits exactly on the end.
        let schedule = FrameSchedule::timed(10.0, 0.25).unwrap();
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule.get(2).and_then(|r| r.millis()), Some(250.0));
    }

    #[test]
    fn test_last_progress_is_not_clamped() {
        let schedule = FrameSchedule::timed(60.0, 1.001).unwrap();
        let Some(CaptureRequest::Time { millis, progress }) = schedule.get(schedule.len() - 1) else {
            panic!("expected a time request");
        };
        assert!(progress < 1.0);
        assert!((progress - millis / 1001.0).abs() < 1e-12);
    }

    #[test]
    fn test_scene_shorter_than_half_a_frame_is_config_error() {
        let err = FrameSchedule::timed(1.0, 0.001).unwrap_err();
        assert!(matches!(err, ScenecastError::Config { .. }));
    }

    #[test]
    fn test_rounding_does_not_add_a_frame() {
        let schedule = FrameSchedule::timed(30.0, 0.1).unwrap();
        assert_eq!(schedule.len(), 3);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let schedule = FrameSchedule::timed(24.0, 0.5).unwrap();
        let first: Vec<_> = schedule.iter().collect();
        let second: Vec<_> = (&schedule).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(schedule.iter().len(), 12);
    }

    #[test]
    fn test_progress_runs_from_start_to_end() {
        let schedule = FrameSchedule::timed(10.0, 1.0).unwrap();
        let progress: Vec<f64> = schedule
            .iter()
            .map(|r| match r {
                CaptureRequest::Time { progress, .. } => progress,
                CaptureRequest::Frame { .. } => unreachable!(),
            })
            .collect();
        assert!((progress[0] - 0.05).abs() < 1e-9);
        assert!((progress[9] - 0.95).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_timed_schedule_length_and_step(fps in 1u32..=240, duration_ms in 1u64..=600_000) {
            prop_assume!(duration_ms * fps as u64 >= 500);
            let duration_secs = duration_ms as f64 / 1000.0;
            let schedule = FrameSchedule::timed(fps as f64, duration_secs).unwrap();
            let expected = (duration_ms * fps as u64 + 500) / 1000;
            prop_assert_eq!(schedule.len(), expected);

            let step = 1000.0 / fps as f64;
            let times: Vec<f64> = schedule.iter().filter_map(|r| r.millis()).collect();
            prop_assert_eq!(times.len() as u64, expected);
            prop_assert!((times[0] - step / 2.0).abs() < 1e-9);
            for pair in times.windows(2) {
                prop_assert!((pair[1] - pair[0] - step).abs() < 1e-6);
            }
            let last = times[times.len() - 1];
            prop_assert!(last <= duration_ms as f64 + 1e-6);
            prop_assert!(last + step > duration_ms as f64);
        }

        #[test]
        fn prop_frame_schedule_is_inclusive_range(first in -10_000i64..10_000, span in 0i64..5_000) {
            let last = first + span;
            let schedule = FrameSchedule::frames(first, last).unwrap();
            let frames: Vec<i64> = schedule.iter().filter_map(|r| r.frame_index()).collect();
            prop_assert_eq!(frames, (first..=last).collect::<Vec<_>>());
            prop_assert_eq!(schedule.len(), (span + 1) as u64);
        }
    }
}
