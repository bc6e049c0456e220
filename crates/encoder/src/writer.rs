//! Backpressure-aware frame writing.
//!
//! The encoder is far slower than the renderer, so captured frames must not
//! pile up in memory. [`EncoderInput`] buffers at most `high_water_mark`
//! bytes in front of the encoder's stdin; [`write_frame`] suspends the caller
//! while that buffer is full and the pipe has not drained.

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use scenecast_common::error::{ScenecastError, ScenecastResult};

/// Default bytes buffered before writers are suspended.
pub const DEFAULT_HIGH_WATER_MARK: usize = 1024 * 1024;

type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

/// Writable input channel of an encoder process.
pub struct EncoderInput {
    writer: Option<BufWriter<BoxedWrite>>,
    high_water_mark: usize,
    frames_accepted: u64,
    bytes_accepted: u64,
}

impl EncoderInput {
    /// Wrap a transport (normally the encoder's stdin).
    pub fn new<W>(inner: W, high_water_mark: usize) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let high_water_mark = high_water_mark.max(1);
        Self {
            writer: Some(BufWriter::with_capacity(high_water_mark, Box::new(inner))),
            high_water_mark,
            frames_accepted: 0,
            bytes_accepted: 0,
        }
    }

    /// Whether frames can still be written.
    pub fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Bytes accepted but not yet handed to the transport.
    pub fn buffered(&self) -> usize {
        self.writer.as_ref().map(|w| w.buffer().len()).unwrap_or(0)
    }

    pub fn frames_accepted(&self) -> u64 {
        self.frames_accepted
    }

    pub fn bytes_accepted(&self) -> u64 {
        self.bytes_accepted
    }

    /// Flush anything buffered and close the transport, signalling end of
    /// stream. Closing an already closed input does nothing.
    pub async fn close(&mut self) -> ScenecastResult<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer
            .flush()
            .await
            .map_err(|e| ScenecastError::encoder(format!("Failed to flush encoder input: {e}")))?;
        writer
            .shutdown()
            .await
            .map_err(|e| ScenecastError::encoder(format!("Failed to close encoder input: {e}")))?;
        Ok(())
    }
}

impl std::fmt::Debug for EncoderInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderInput")
            .field("writable", &self.is_writable())
            .field("high_water_mark", &self.high_water_mark)
            .field("buffered", &self.buffered())
            .field("frames_accepted", &self.frames_accepted)
            .finish()
    }
}

/// Write one captured image into the encoder input.
///
/// Resolves once every byte has been accepted by the input, waiting for the
/// transport to drain whenever the buffer would exceed its high-water mark.
/// A closed input fails immediately with [`ScenecastError::EncoderClosed`].
/// A transport error closes the input; later writes fail fast.
pub async fn write_frame(input: &mut EncoderInput, bytes: &[u8]) -> ScenecastResult<()> {
    let Some(writer) = input.writer.as_mut() else {
        return Err(ScenecastError::EncoderClosed);
    };

    if let Err(e) = writer.write_all(bytes).await {
        input.writer = None;
        return Err(ScenecastError::encoder(format!(
            "Failed to write frame to encoder input: {e}"
        )));
    }

    input.frames_accepted += 1;
    input.bytes_accepted += bytes.len() as u64;
    Ok(())
}
