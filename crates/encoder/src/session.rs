//! Encoder process lifecycle.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

use scenecast_common::error::{ScenecastError, ScenecastResult};

use crate::profile::{CodecProfile, EncoderArgs};
use crate::writer::{write_frame, EncoderInput, DEFAULT_HIGH_WATER_MARK};

/// Default encoder executable.
pub const DEFAULT_ENCODER_PROGRAM: &str = "ffmpeg";

/// Destination for captured frames.
///
/// The capture loop only ever talks to this trait, so it can be driven
/// against an in-memory sink in tests.
#[async_trait::async_trait]
pub trait FrameSink: Send {
    /// Accept one encoded still image.
    async fn write_frame(&mut self, bytes: &[u8]) -> ScenecastResult<()>;

    /// Signal end of stream and release the sink. Best effort: failures are
    /// logged by the implementation and never reported to the caller.
    async fn close(&mut self);

    /// Sink name for logging.
    fn name(&self) -> &str;
}

/// Lifecycle state of an [`EncoderSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderStatus {
    /// No process has been spawned yet.
    Unstarted,
    /// The encoder process is running and accepting frames.
    Running,
    /// Input closed and the process has been waited on.
    Closed,
}

enum EncoderState {
    Unstarted,
    Running { child: Child, input: EncoderInput },
    Closed,
}

/// Owns at most one external encoder process.
///
/// The process is spawned lazily the first time the input channel is
/// requested and is never respawned.
pub struct EncoderSession {
    program: String,
    encoder_args: EncoderArgs,
    high_water_mark: usize,
    state: EncoderState,
}

impl EncoderSession {
    /// Session running the default encoder for a codec profile.
    pub fn new(profile: CodecProfile, fps: u32, filename_prefix: &str) -> ScenecastResult<Self> {
        if fps == 0 {
            return Err(ScenecastError::config(
                "Invalid # of frames per second: 0",
            ));
        }
        let encoder_args = profile.build_arguments(fps, filename_prefix);
        tracing::info!(
            profile = %profile,
            output = %encoder_args.output_path.display(),
            args = ?encoder_args.args,
            "Encoder configured"
        );
        Ok(Self::with_program(DEFAULT_ENCODER_PROGRAM, encoder_args))
    }

    /// Session running an arbitrary program with pre-built arguments.
    pub fn with_program(program: impl Into<String>, encoder_args: EncoderArgs) -> Self {
        Self {
            program: program.into(),
            encoder_args,
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            state: EncoderState::Unstarted,
        }
    }

    /// Replace the encoder executable. Only meaningful before first use.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set how many bytes may queue in front of the encoder.
    pub fn high_water_mark(mut self, bytes: usize) -> Self {
        self.high_water_mark = bytes;
        self
    }

    pub fn args(&self) -> &[String] {
        &self.encoder_args.args
    }

    /// File the encoder writes.
    pub fn output_path(&self) -> &Path {
        &self.encoder_args.output_path
    }

    pub fn status(&self) -> EncoderStatus {
        match self.state {
            EncoderState::Unstarted => EncoderStatus::Unstarted,
            EncoderState::Running { .. } => EncoderStatus::Running,
            EncoderState::Closed => EncoderStatus::Closed,
        }
    }

    /// OS process id of the running encoder.
    pub fn pid(&self) -> Option<u32> {
        match &self.state {
            EncoderState::Running { child, .. } => child.id(),
            _ => None,
        }
    }

    /// The encoder's input channel, spawning the process on first call.
    ///
    /// Later calls return the same channel. Once the session is closed no
    /// new process is started and this fails with `EncoderClosed`.
    pub fn input(&mut self) -> ScenecastResult<&mut EncoderInput> {
        if matches!(self.state, EncoderState::Unstarted) {
            self.state = self.spawn()?;
        }
        match &mut self.state {
            EncoderState::Running { input, .. } => Ok(input),
            _ => Err(ScenecastError::EncoderClosed),
        }
    }

    fn spawn(&self) -> ScenecastResult<EncoderState> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.encoder_args.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Keep the encoder out of the terminal's process group: Ctrl+C must
        // only reach us, so we can close its input and let it finalize.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            ScenecastError::encoder(format!(
                "Failed to start encoder '{}' (is it installed and on PATH?): {e}",
                self.program
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ScenecastError::encoder("Failed to open encoder stdin"))?;

        tracing::info!(
            pid = child.id(),
            program = %self.program,
            output = %self.encoder_args.output_path.display(),
            "Encoder process started"
        );

        Ok(EncoderState::Running {
            child,
            input: EncoderInput::new(stdin, self.high_water_mark),
        })
    }

    /// Close the input and wait for the encoder to exit.
    ///
    /// Does nothing if the encoder never started. Errors are logged and
    /// swallowed so callers can always go on to release other resources.
    pub async fn shutdown(&mut self) -> Option<ExitStatus> {
        let state = std::mem::replace(&mut self.state, EncoderState::Closed);
        let EncoderState::Running {
            mut child,
            mut input,
        } = state
        else {
            return None;
        };

        tracing::debug!(
            frames = input.frames_accepted(),
            bytes = input.bytes_accepted(),
            "Closing encoder input"
        );
        if let Err(e) = input.close().await {
            tracing::error!(error = %e, "Failed to close encoder input");
        }

        match child.wait().await {
            Ok(status) => {
                if status.success() {
                    tracing::info!(
                        code = status.code(),
                        output = %self.encoder_args.output_path.display(),
                        "Encoder closed"
                    );
                } else {
                    tracing::warn!(
                        code = status.code(),
                        signal = exit_signal(&status),
                        output = %self.encoder_args.output_path.display(),
                        "Encoder exited abnormally"
                    );
                }
                Some(status)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to wait for encoder exit");
                None
            }
        }
    }

    /// Check that an encoder executable can be run.
    pub async fn is_available(program: &str) -> bool {
        Command::new(program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

#[async_trait::async_trait]
impl FrameSink for EncoderSession {
    async fn write_frame(&mut self, bytes: &[u8]) -> ScenecastResult<()> {
        if let EncoderState::Running { child, .. } = &mut self.state {
            if let Some(status) = child.try_wait()? {
                return Err(ScenecastError::encoder(format!(
                    "Encoder exited early with {status}"
                )));
            }
        }
        let input = self.input()?;
        write_frame(input, bytes).await
    }

    async fn close(&mut self) {
        self.shutdown().await;
    }

    fn name(&self) -> &str {
        &self.program
    }
}

impl Drop for EncoderSession {
    fn drop(&mut self) {
        if let EncoderState::Running { child, .. } = &self.state {
            tracing::warn!(
                pid = child.id(),
                "Encoder session dropped without shutdown; encoder will see end of input"
            );
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
