//! Per-run configuration.

use scenecast_common::config::AppConfig;
use scenecast_common::error::{ScenecastError, ScenecastResult};
use scenecast_encoder::{CodecProfile, EncoderSession};

use crate::renderer::BridgeConfig;

/// Everything a single capture run needs, fixed before the run starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Page hosting the scene.
    pub url: String,

    /// Scene selector passed to the renderer's `initialize`.
    pub script: String,

    /// Viewport width in CSS pixels.
    pub width: u32,

    /// Viewport height in CSS pixels.
    pub height: u32,

    /// Page zoom.
    pub zoom: f64,

    /// Frames per second of the output.
    pub fps: u32,

    /// Source token the renderer must report, if any.
    pub expected_source: Option<String>,

    /// Device pixel ratio the renderer must report, if any.
    pub expected_pixel_ratio: Option<f64>,

    /// Output codec profile.
    pub profile: CodecProfile,

    /// Prefix for the output file name.
    pub filename_prefix: String,

    /// Encoder executable.
    pub encoder_program: String,

    /// Bytes buffered in front of the encoder before writes suspend.
    pub high_water_mark: usize,

    /// Renderer bridge executable.
    pub bridge_program: String,

    /// Renderer bridge arguments.
    pub bridge_args: Vec<String>,

    /// Report progress every N frames.
    pub progress_interval: u64,
}

impl RunConfig {
    /// Run settings taken from the application defaults for a page.
    ///
    /// Fails if the configured format names no known profile.
    pub fn from_app_config(url: impl Into<String>, app: &AppConfig) -> ScenecastResult<Self> {
        let zoom = app.capture.zoom;
        Ok(Self {
            url: url.into(),
            script: String::new(),
            width: app.capture.width,
            height: app.capture.height,
            zoom,
            fps: app.capture.fps,
            expected_source: None,
            expected_pixel_ratio: Some(zoom),
            profile: app.capture.format.parse()?,
            filename_prefix: app.capture.filename_prefix.clone(),
            encoder_program: app.encoder.program.clone(),
            high_water_mark: app.encoder.high_water_mark,
            bridge_program: app.bridge.program.clone(),
            bridge_args: app.bridge.args.clone(),
            progress_interval: app.capture.progress_interval,
        })
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> ScenecastResult<()> {
        if self.url.trim().is_empty() {
            return Err(ScenecastError::config("No page URL given"));
        }
        if self.fps == 0 {
            return Err(ScenecastError::config(format!(
                "Invalid # of frames per second: {}",
                self.fps
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ScenecastError::config(format!(
                "Invalid viewport size {}x{}",
                self.width, self.height
            )));
        }
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(ScenecastError::config(format!("Invalid zoom: {}", self.zoom)));
        }
        if self.high_water_mark == 0 {
            return Err(ScenecastError::config("Encoder high-water mark must be positive"));
        }
        if self.encoder_program.trim().is_empty() {
            return Err(ScenecastError::config("No encoder program configured"));
        }
        if self.bridge_program.trim().is_empty() {
            return Err(ScenecastError::config("No renderer bridge program configured"));
        }
        Ok(())
    }

    /// Encoder session for this run. Nothing is spawned until the first frame.
    pub fn encoder_session(&self) -> ScenecastResult<EncoderSession> {
        Ok(
            EncoderSession::new(self.profile, self.fps, &self.filename_prefix)?
                .program(self.encoder_program.clone())
                .high_water_mark(self.high_water_mark),
        )
    }

    /// How to start the renderer bridge for this run.
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            program: self.bridge_program.clone(),
            args: self.bridge_args.clone(),
            url: self.url.clone(),
            width: self.width,
            height: self.height,
            zoom: self.zoom,
        }
    }
}
