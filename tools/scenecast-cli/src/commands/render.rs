//! Render a scene into a video file.

use std::process::ExitCode;

use clap::Args;
use scenecast_capture_engine::{
    listen_for_signals, BridgeRenderer, CancellationFlag, CaptureSession, RunConfig, RunOutcome,
};
use scenecast_common::config::AppConfig;

use crate::EXIT_CANCELLED;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Page hosting the scene
    pub url: String,

    /// Scene to capture when the page hosts several
    #[arg(long, default_value = "")]
    pub script: String,

    /// Viewport width [default: 3840]
    #[arg(long)]
    pub width: Option<u32>,

    /// Viewport height [default: 2160]
    #[arg(long)]
    pub height: Option<u32>,

    /// Page zoom; the scene must report this device pixel ratio [default: 1]
    #[arg(long)]
    pub zoom: Option<f64>,

    /// Frames per second [default: 60]
    #[arg(long)]
    pub fps: Option<u32>,

    /// Abort unless the scene reports this source
    #[arg(long)]
    pub expect_source: Option<String>,

    /// Prefix for the output file name
    #[arg(long)]
    pub prefix: Option<String>,

    /// Output format: small, prores, prores-hq or alpha [default: small]
    #[arg(long)]
    pub format: Option<String>,

    /// Encoder executable [default: ffmpeg]
    #[arg(long)]
    pub encoder: Option<String>,

    /// Renderer bridge command and its arguments
    #[arg(long, num_args = 1..)]
    pub bridge: Vec<String>,

    /// Report progress every N frames [default: 120]
    #[arg(long)]
    pub progress_every: Option<u64>,
}

impl RenderArgs {
    /// Layer the flags over the configured defaults.
    pub fn into_run_config(self, app: &AppConfig) -> anyhow::Result<RunConfig> {
        let mut app = app.clone();
        if let Some(format) = self.format {
            app.capture.format = format;
        }

        let mut config = RunConfig::from_app_config(self.url, &app)?;
        config.script = self.script;
        config.width = self.width.unwrap_or(config.width);
        config.height = self.height.unwrap_or(config.height);
        config.zoom = self.zoom.unwrap_or(config.zoom);
        config.expected_pixel_ratio = Some(config.zoom);
        config.fps = self.fps.unwrap_or(config.fps);
        config.expected_source = self.expect_source;
        if let Some(prefix) = self.prefix {
            config.filename_prefix = prefix;
        }
        if let Some(encoder) = self.encoder {
            config.encoder_program = encoder;
        }
        if let Some((program, args)) = self.bridge.split_first() {
            config.bridge_program = program.clone();
            config.bridge_args = args.to_vec();
        }
        config.progress_interval = self.progress_every.unwrap_or(config.progress_interval);

        config.validate()?;
        Ok(config)
    }
}

pub async fn run(args: RenderArgs, app: &AppConfig) -> anyhow::Result<ExitCode> {
    let config = args.into_run_config(app)?;

    let cancel = CancellationFlag::new();
    let listener = listen_for_signals(cancel.clone())?;

    let mut encoder = config.encoder_session()?;
    let mut renderer = BridgeRenderer::new(config.bridge_config());
    let output_path = encoder.output_path().to_path_buf();

    println!("Rendering: {}", config.url);
    println!("  Output: {}", output_path.display());
    println!("  Format: {} ({})", config.profile, config.profile.description());
    println!(
        "  Viewport: {}x{} @ {}x, {} fps",
        config.width, config.height, config.zoom, config.fps
    );
    println!("Press Ctrl+C to stop early; the frames so far stay playable.");
    println!();

    let mut session = CaptureSession::new(config, cancel);
    let result = session.run(&mut renderer, &mut encoder).await;
    listener.abort();

    let report = result?;
    match report.outcome {
        RunOutcome::Completed => {
            println!(
                "Render complete: {} ({} frames)",
                output_path.display(),
                report.frames_written
            );
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Cancelled => {
            println!(
                "Render cancelled after {}/{} frames: {}",
                report.frames_written,
                report.total_frames,
                output_path.display()
            );
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        RunOutcome::Failed => {
            let last = report
                .last_request
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            let reason = report
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            println!(
                "Render failed at {last} after {}/{} frames: {reason}",
                report.frames_written, report.total_frames
            );
            Ok(ExitCode::FAILURE)
        }
    }
}
