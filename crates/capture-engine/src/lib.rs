//! Scenecast Capture Engine
//!
//! Drives a remote, browser-hosted scene through its frame schedule and
//! streams every captured still into the encoder. A run is strictly
//! sequential: the next frame is only requested once the previous one has
//! been accepted by the encoder input.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 CaptureSession                    │
//! │                                                   │
//! │  FrameSchedule ──► render_at ──► capture_raster   │
//! │        ▲              │               │           │
//! │        │         RemoteRenderer       ▼           │
//! │  CancellationFlag  (bridge)      FrameSink        │
//! │        ▲                       (EncoderSession)   │
//! └────────┼──────────────────────────────┼───────────┘
//!     SIGINT/SIGTERM                      ▼
//!                                  {prefix}{ts}.mp4
//! ```

pub mod cancel;
pub mod config;
pub mod renderer;
pub mod session;

pub use cancel::*;
pub use config::*;
pub use renderer::*;
pub use session::*;
