//! Renderer backed by a helper process that hosts the page.
//!
//! The helper (by default a small Node script driving a headless browser)
//! speaks newline-delimited JSON on its stdio. Each request is one line on
//! the helper's stdin; each response is one line on its stdout. A capture
//! response announces `"bytes": N` and is followed by exactly N raw image
//! bytes. The helper's stderr is passed through to the terminal.

use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

use scenecast_capture_model::{CaptureRequest, RemoteCaptureInfo};
use scenecast_common::error::{ScenecastError, ScenecastResult};

use super::RemoteRenderer;

/// Largest single capture accepted from the helper.
const MAX_CAPTURE_BYTES: usize = 512 * 1024 * 1024;

/// How to start the helper and what page it should open.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub program: String,
    pub args: Vec<String>,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub zoom: f64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum BridgeRequest<'a> {
    Init {
        url: &'a str,
        width: u32,
        height: u32,
        zoom: f64,
        script: &'a str,
    },
    Render {
        request: &'a CaptureRequest,
    },
    Capture,
    Close,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    info: Option<RemoteCaptureInfo>,
    #[serde(default)]
    bytes: Option<usize>,
}

type BoxedReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

struct BridgeChannel {
    reader: BoxedReader,
    writer: BoxedWriter,
    child: Option<Child>,
}

/// [`RemoteRenderer`] talking to a helper process over stdio.
pub struct BridgeRenderer {
    config: BridgeConfig,
    channel: Option<BridgeChannel>,
}

impl BridgeRenderer {
    /// Renderer that starts the helper on [`RemoteRenderer::initialize`].
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            channel: None,
        }
    }

    /// Renderer over already-connected streams (no helper process).
    pub fn from_streams<R, W>(config: BridgeConfig, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            config,
            channel: Some(BridgeChannel {
                reader: BufReader::new(Box::new(reader)),
                writer: Box::new(writer),
                child: None,
            }),
        }
    }

    /// Check that the helper executable can be started.
    pub async fn is_available(program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn spawn(&self) -> ScenecastResult<BridgeChannel> {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        // Same reasoning as the encoder: signals are handled by us, and the
        // helper is closed explicitly once the encoder is done.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            ScenecastError::renderer(format!(
                "Failed to start renderer bridge '{}': {e}",
                self.config.program
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ScenecastError::renderer("Failed to open bridge stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScenecastError::renderer("Failed to open bridge stdout"))?;

        tracing::info!(
            pid = child.id(),
            program = %self.config.program,
            "Renderer bridge started"
        );

        Ok(BridgeChannel {
            reader: BufReader::new(Box::new(stdout)),
            writer: Box::new(stdin),
            child: Some(child),
        })
    }

    fn channel(&mut self) -> ScenecastResult<&mut BridgeChannel> {
        self.channel
            .as_mut()
            .ok_or_else(|| ScenecastError::renderer("Renderer bridge is not running"))
    }

    async fn call(&mut self, request: &BridgeRequest<'_>) -> ScenecastResult<BridgeResponse> {
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');

        let channel = self.channel()?;
        channel
            .writer
            .write_all(&line)
            .await
            .map_err(|e| ScenecastError::renderer(format!("Failed to send bridge request: {e}")))?;
        channel
            .writer
            .flush()
            .await
            .map_err(|e| ScenecastError::renderer(format!("Failed to send bridge request: {e}")))?;

        let mut reply = String::new();
        let read = channel
            .reader
            .read_line(&mut reply)
            .await
            .map_err(|e| ScenecastError::renderer(format!("Failed to read bridge response: {e}")))?;
        if read == 0 {
            return Err(ScenecastError::renderer(
                "Renderer bridge closed its output unexpectedly",
            ));
        }

        let response: BridgeResponse = serde_json::from_str(reply.trim()).map_err(|e| {
            ScenecastError::renderer(format!("Malformed bridge response {:?}: {e}", reply.trim()))
        })?;
        if !response.ok {
            return Err(ScenecastError::renderer(
                response
                    .error
                    .unwrap_or_else(|| "bridge reported an unspecified error".to_string()),
            ));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl RemoteRenderer for BridgeRenderer {
    async fn initialize(&mut self, script: &str) -> ScenecastResult<RemoteCaptureInfo> {
        if self.channel.is_none() {
            self.channel = Some(self.spawn()?);
        }

        let config = self.config.clone();
        let response = self
            .call(&BridgeRequest::Init {
                url: &config.url,
                width: config.width,
                height: config.height,
                zoom: config.zoom,
                script,
            })
            .await?;

        response
            .info
            .ok_or_else(|| ScenecastError::renderer("Bridge init response carried no session info"))
    }

    async fn render_at(&mut self, request: &CaptureRequest) -> ScenecastResult<()> {
        self.call(&BridgeRequest::Render { request }).await?;
        Ok(())
    }

    async fn capture_raster(&mut self) -> ScenecastResult<Vec<u8>> {
        let response = self.call(&BridgeRequest::Capture).await?;
        let len = response
            .bytes
            .ok_or_else(|| ScenecastError::renderer("Bridge capture response carried no length"))?;
        if len > MAX_CAPTURE_BYTES {
            return Err(ScenecastError::renderer(format!(
                "Bridge announced a {len} byte capture, over the {MAX_CAPTURE_BYTES} byte limit"
            )));
        }

        let mut image = vec![0u8; len];
        self.channel()?
            .reader
            .read_exact(&mut image)
            .await
            .map_err(|e| ScenecastError::renderer(format!("Failed to read captured image: {e}")))?;
        Ok(image)
    }

    async fn close(&mut self) -> ScenecastResult<()> {
        if self.channel.is_none() {
            return Ok(());
        }

        if let Err(e) = self.call(&BridgeRequest::Close).await {
            tracing::warn!(error = %e, "Renderer bridge did not acknowledge close");
        }

        let Some(mut channel) = self.channel.take() else {
            return Ok(());
        };
        if let Err(e) = channel.writer.shutdown().await {
            tracing::debug!(error = %e, "Renderer bridge input did not close cleanly");
        }
        if let Some(mut child) = channel.child.take() {
            let status = child.wait().await.map_err(|e| {
                ScenecastError::renderer(format!("Failed to wait for renderer bridge: {e}"))
            })?;
            tracing::info!(code = status.code(), "Renderer bridge exited");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "bridge"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    fn test_config() -> BridgeConfig {
        BridgeConfig {
            program: "node".to_string(),
            args: vec![],
            url: "http://localhost:5173/".to_string(),
            width: 640,
            height: 360,
            zoom: 2.0,
        }
    }

    /// Fake helper: answers each request with the next scripted reply and
    /// records what it was asked.
    fn fake_bridge(replies: Vec<Vec<u8>>) -> (BridgeRenderer, tokio::task::JoinHandle<Vec<Value>>) {
        let (ours, theirs) = tokio::io::duplex(1 << 16);
        let (our_read, our_write): (ReadHalf<DuplexStream>, WriteHalf<DuplexStream>) =
            tokio::io::split(ours);
        let (their_read, mut their_write) = tokio::io::split(theirs);

        let helper = tokio::spawn(async move {
            let mut lines = BufReader::new(their_read).lines();
            let mut seen = Vec::new();
            for reply in replies {
                let Ok(Some(line)) = lines.next_line().await else {
                    break;
                };
                seen.push(serde_json::from_str::<Value>(&line).unwrap());
                their_write.write_all(&reply).await.unwrap();
            }
            seen
        });

        (
            BridgeRenderer::from_streams(test_config(), our_read, our_write),
            helper,
        )
    }

    #[tokio::test]
    async fn test_full_exchange() {
        let mut capture_reply = b"{\"ok\":true,\"bytes\":4}\n".to_vec();
        capture_reply.extend_from_slice(&[0x89, b'P', b'N', b'G']);
        let replies = vec![
            b"{\"ok\":true,\"info\":{\"source\":\"intro\",\"devicePixelRatio\":2,\"seconds\":1.5}}\n".to_vec(),
            b"{\"ok\":true}\n".to_vec(),
            capture_reply,
            b"{\"ok\":true}\n".to_vec(),
        ];
        let (mut renderer, helper) = fake_bridge(replies);

        let info = renderer.initialize("intro").await.unwrap();
        assert_eq!(info, RemoteCaptureInfo::timed("intro", 2.0, 1.5));

        renderer
            .render_at(&CaptureRequest::time(750.0, 1500.0))
            .await
            .unwrap();
        let image = renderer.capture_raster().await.unwrap();
        assert_eq!(image, vec![0x89, b'P', b'N', b'G']);
        renderer.close().await.unwrap();

        let seen = helper.await.unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0]["cmd"], "init");
        assert_eq!(seen[0]["script"], "intro");
        assert_eq!(seen[0]["zoom"], 2.0);
        assert_eq!(seen[1]["cmd"], "render");
        assert_eq!(seen[1]["request"]["mode"], "time");
        assert_eq!(seen[1]["request"]["millis"], 750.0);
        assert_eq!(seen[1]["request"]["progress"], 0.5);
        assert_eq!(seen[2]["cmd"], "capture");
        assert_eq!(seen[3]["cmd"], "close");
    }

    #[tokio::test]
    async fn test_bridge_error_becomes_renderer_error() {
        let replies = vec![b"{\"ok\":false,\"error\":\"initScreenCapture is not defined\"}\n".to_vec()];
        let (mut renderer, _helper) = fake_bridge(replies);

        let err = renderer.initialize("").await.unwrap_err();
        assert!(matches!(err, ScenecastError::Renderer { .. }));
        assert!(err.to_string().contains("initScreenCapture is not defined"));
    }

    #[tokio::test]
    async fn test_helper_exit_is_reported() {
        let (mut renderer, helper) = fake_bridge(vec![]);
        helper.await.unwrap();

        let err = renderer
            .render_at(&CaptureRequest::frame(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ScenecastError::Renderer { .. }));
    }

    #[tokio::test]
    async fn test_oversized_capture_rejected() {
        let replies = vec![format!("{{\"ok\":true,\"bytes\":{}}}\n", MAX_CAPTURE_BYTES + 1).into_bytes()];
        let (mut renderer, _helper) = fake_bridge(replies);

        let err = renderer.capture_raster().await.unwrap_err();
        assert!(err.to_string().contains("limit"));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Helper input that accepts writes but fails to shut down.
    struct StuckInput(WriteHalf<DuplexStream>);

    impl AsyncWrite for StuckInput {
        fn poll_write(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Pin::new(&mut self.0).poll_write(cx, buf)
        }

        fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.0).poll_flush(cx)
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::other("stdin stuck")))
        }
    }

    #[tokio::test]
    async fn test_close_logs_failed_input_shutdown() {
        let logs = LogBuffer::default();
        let sink = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (ours, theirs) = tokio::io::duplex(1 << 12);
        let (our_read, our_write) = tokio::io::split(ours);
        let (their_read, mut their_write) = tokio::io::split(theirs);
        let helper = tokio::spawn(async move {
            let mut lines = BufReader::new(their_read).lines();
            if let Ok(Some(_)) = lines.next_line().await {
                their_write.write_all(b"{\"ok\":true}\n").await.unwrap();
            }
        });

        let mut renderer =
            BridgeRenderer::from_streams(test_config(), our_read, StuckInput(our_write));
        renderer.close().await.unwrap();
        helper.await.unwrap();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("did not close cleanly"));
        assert!(output.contains("stdin stuck"));
    }

    #[tokio::test]
    async fn test_close_without_session_is_noop() {
        let mut renderer = BridgeRenderer::new(test_config());
        renderer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_helper_is_renderer_error() {
        let mut config = test_config();
        config.program = "/nonexistent/scenecast-bridge".to_string();
        let mut renderer = BridgeRenderer::new(config);

        let err = renderer.initialize("").await.unwrap_err();
        assert!(matches!(err, ScenecastError::Renderer { .. }));
    }
}
