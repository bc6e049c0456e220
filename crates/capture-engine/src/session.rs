//! Capture run orchestration.

use scenecast_capture_model::{CaptureRequest, FrameSchedule, RemoteCaptureInfo};
use scenecast_common::clock::RunClock;
use scenecast_common::error::{ScenecastError, ScenecastResult};
use scenecast_encoder::FrameSink;

use crate::cancel::CancellationFlag;
use crate::config::RunConfig;
use crate::renderer::RemoteRenderer;

/// Pixel ratios closer than this are considered equal.
const PIXEL_RATIO_TOLERANCE: f64 = 1e-6;

/// Phase of a capture run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session created but not started.
    Idle,
    /// Renderer session being set up and checked.
    Initializing,
    /// Frames flowing from the renderer into the encoder.
    Streaming,
    /// Encoder and renderer being released.
    Draining,
    /// Every frame delivered and all resources released.
    Closed,
    /// Run cancelled or failed; resources released.
    Aborted,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
    Failed,
}

/// Progress snapshot handed to the progress callback.
#[derive(Debug, Clone)]
pub struct CaptureProgress {
    pub frames_written: u64,
    pub total_frames: u64,
    pub request: CaptureRequest,
    pub frames_per_sec: f64,
    pub eta_secs: f64,
}

impl CaptureProgress {
    /// Fraction of the schedule delivered, in `[0.0, 1.0]`.
    pub fn fraction(&self) -> f64 {
        if self.total_frames == 0 {
            return 1.0;
        }
        (self.frames_written as f64 / self.total_frames as f64).clamp(0.0, 1.0)
    }
}

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(&CaptureProgress) + Send + Sync>;

/// Summary of a streamed run.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub frames_written: u64,
    pub total_frames: u64,
    /// Last request handed to the renderer.
    pub last_request: Option<CaptureRequest>,
    /// The per-frame error that ended a failed run.
    pub error: Option<ScenecastError>,
}

/// Drives one capture run from renderer initialization to encoder shutdown.
pub struct CaptureSession {
    config: RunConfig,
    cancel: CancellationFlag,
    state: SessionState,
    progress: Option<ProgressCallback>,
}

impl CaptureSession {
    pub fn new(config: RunConfig, cancel: CancellationFlag) -> Self {
        Self {
            config,
            cancel,
            state: SessionState::Idle,
            progress: None,
        }
    }

    /// Receive a progress snapshot every `progress_interval` frames.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Current phase.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the capture to completion, cancellation or failure.
    ///
    /// Setup problems (renderer initialization, source or pixel-ratio
    /// mismatch, unusable schedule) are returned as errors; the sink is
    /// never written on those paths and the renderer is still closed.
    /// Once streaming has begun the result is always a [`RunReport`], and
    /// the sink and renderer have both been released when it returns.
    pub async fn run(
        &mut self,
        renderer: &mut dyn RemoteRenderer,
        sink: &mut dyn FrameSink,
    ) -> ScenecastResult<RunReport> {
        if self.state != SessionState::Idle {
            return Err(ScenecastError::config("Capture session already used"));
        }

        self.state = SessionState::Initializing;
        tracing::info!(
            renderer = renderer.name(),
            url = %self.config.url,
            script = %self.config.script,
            fps = self.config.fps,
            profile = %self.config.profile,
            "Initializing capture"
        );

        let schedule = match self.prepare(renderer).await {
            Ok(schedule) => schedule,
            Err(e) => {
                tracing::error!(error = %e, "Capture setup failed");
                self.close_renderer(renderer).await;
                self.state = SessionState::Aborted;
                return Err(e);
            }
        };

        self.state = SessionState::Streaming;
        let report = self.stream(&schedule, renderer, sink).await;

        self.state = SessionState::Draining;
        tracing::debug!("Draining: closing encoder, then renderer");
        sink.close().await;
        self.close_renderer(renderer).await;

        self.state = match report.outcome {
            RunOutcome::Completed => SessionState::Closed,
            RunOutcome::Cancelled | RunOutcome::Failed => SessionState::Aborted,
        };

        tracing::info!(
            outcome = ?report.outcome,
            frames_written = report.frames_written,
            total_frames = report.total_frames,
            "Capture finished"
        );
        Ok(report)
    }

    async fn prepare(&self, renderer: &mut dyn RemoteRenderer) -> ScenecastResult<FrameSchedule> {
        let info = renderer.initialize(&self.config.script).await?;
        tracing::info!(
            source = %info.source,
            device_pixel_ratio = info.device_pixel_ratio,
            seconds = ?info.seconds,
            first_frame = ?info.first_frame,
            last_frame = ?info.last_frame,
            "Renderer initialized"
        );

        check_consistency(&self.config, &info)?;
        let schedule = FrameSchedule::from_info(f64::from(self.config.fps), &info)?;
        tracing::info!(frames = schedule.len(), ?schedule, "Frame schedule ready");
        Ok(schedule)
    }

    async fn stream(
        &self,
        schedule: &FrameSchedule,
        renderer: &mut dyn RemoteRenderer,
        sink: &mut dyn FrameSink,
    ) -> RunReport {
        let clock = RunClock::start();
        let total = schedule.len();
        let mut report = RunReport {
            outcome: RunOutcome::Completed,
            frames_written: 0,
            total_frames: total,
            last_request: None,
            error: None,
        };

        for request in schedule {
            if self.cancel.is_cancelled() {
                tracing::warn!(
                    frames_written = report.frames_written,
                    "Capture cancelled, stopping before {request}"
                );
                report.outcome = RunOutcome::Cancelled;
                break;
            }

            report.last_request = Some(request);
            if let Err(e) = capture_frame(renderer, sink, &request).await {
                tracing::error!(%request, error = %e, "Frame capture failed");
                report.outcome = RunOutcome::Failed;
                report.error = Some(e);
                break;
            }
            report.frames_written += 1;

            let interval = self.config.progress_interval;
            if (interval > 0 && report.frames_written % interval == 0) || report.frames_written == total {
                self.report_progress(&clock, &report, request);
            }
        }

        report
    }

    fn report_progress(&self, clock: &RunClock, report: &RunReport, request: CaptureRequest) {
        let rate = clock.rate(report.frames_written, report.total_frames);
        let progress = CaptureProgress {
            frames_written: report.frames_written,
            total_frames: report.total_frames,
            request,
            frames_per_sec: rate.frames_per_sec,
            eta_secs: rate.eta_secs,
        };
        tracing::info!(
            frames = progress.frames_written,
            total = progress.total_frames,
            percent = %format!("{:.1}", progress.fraction() * 100.0),
            fps = %format!("{:.2}", progress.frames_per_sec),
            eta_secs = %format!("{:.0}", progress.eta_secs),
            "Progress: {request}"
        );
        if let Some(callback) = &self.progress {
            callback(&progress);
        }
    }

    async fn close_renderer(&self, renderer: &mut dyn RemoteRenderer) {
        if let Err(e) = renderer.close().await {
            tracing::warn!(renderer = renderer.name(), error = %e, "Failed to close renderer");
        }
    }
}

async fn capture_frame(
    renderer: &mut dyn RemoteRenderer,
    sink: &mut dyn FrameSink,
    request: &CaptureRequest,
) -> ScenecastResult<()> {
    renderer.render_at(request).await?;
    let image = renderer.capture_raster().await?;
    tracing::trace!(%request, bytes = image.len(), "Frame captured");
    sink.write_frame(&image).await
}

/// Verify the renderer reported what the caller asked for.
pub fn check_consistency(config: &RunConfig, info: &RemoteCaptureInfo) -> ScenecastResult<()> {
    if let Some(expected) = &config.expected_source {
        if &info.source != expected {
            return Err(ScenecastError::consistency(format!(
                "Source mismatch: expected \"{expected}\", renderer reported \"{}\"",
                info.source
            )));
        }
    }
    if let Some(expected) = config.expected_pixel_ratio {
        if (info.device_pixel_ratio - expected).abs() > PIXEL_RATIO_TOLERANCE {
            return Err(ScenecastError::consistency(format!(
                "Device pixel ratio mismatch: expected {expected}, renderer reported {}",
                info.device_pixel_ratio
            )));
        }
    }
    Ok(())
}
