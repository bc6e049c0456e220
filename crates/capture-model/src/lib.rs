//! Scenecast Capture Model
//!
//! Defines the data contracts shared by the renderer, the encoder and the
//! capture loop:
//! - **Requests:** The time value or frame index the renderer is asked to draw
//! - **Session info:** What the remote scene reports when a capture starts
//! - **Schedule:** The deterministic, ordered list of requests for one run
//!
//! Time values are milliseconds along the scene timeline throughout.

pub mod info;
pub mod request;
pub mod schedule;

pub use info::*;
pub use request::*;
pub use schedule::*;
