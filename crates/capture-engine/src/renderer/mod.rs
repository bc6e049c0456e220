use scenecast_capture_model::{CaptureRequest, RemoteCaptureInfo};
use scenecast_common::error::ScenecastResult;

pub mod bridge;

pub use bridge::{BridgeConfig, BridgeRenderer};

/// Abstract interface to the page that draws the scene.
///
/// Calls are strictly sequential and have no timeout: a renderer that never
/// answers stalls the run.
#[async_trait::async_trait]
pub trait RemoteRenderer: Send {
    /// Start a capture session. Called exactly once per run, before any
    /// frame is requested. `script` selects a scene when the page hosts
    /// several.
    async fn initialize(&mut self, script: &str) -> ScenecastResult<RemoteCaptureInfo>;

    /// Ask the page to display the given time value or frame index.
    async fn render_at(&mut self, request: &CaptureRequest) -> ScenecastResult<()>;

    /// Encoded still image of the page as it is now.
    async fn capture_raster(&mut self) -> ScenecastResult<Vec<u8>>;

    /// Release whatever hosts the page.
    async fn close(&mut self) -> ScenecastResult<()>;

    /// Renderer name for logging.
    fn name(&self) -> &str;
}
