//! Cooperative cancellation driven by process signals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use scenecast_common::error::ScenecastResult;

/// Flag polled by the capture loop between frames.
///
/// Once set it stays set. Setting it never interrupts work in flight; the
/// current frame finishes and no new frame is started.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Register interrupt/terminate handlers that set `flag`.
///
/// Call once at startup. Registering replaces the default "exit now"
/// behaviour, so a signal lets the run drain and close the encoder instead
/// of leaving a truncated file.
pub fn listen_for_signals(flag: CancellationFlag) -> ScenecastResult<tokio::task::JoinHandle<()>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        Ok(tokio::spawn(async move {
            loop {
                let name = tokio::select! {
                    Some(()) = sigint.recv() => "SIGINT",
                    Some(()) = sigterm.recv() => "SIGTERM",
                    else => break,
                };
                request_cancel(&flag, name);
            }
        }))
    }

    #[cfg(not(unix))]
    {
        Ok(tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                request_cancel(&flag, "Ctrl+C");
            }
        }))
    }
}

fn request_cancel(flag: &CancellationFlag, signal: &str) {
    if flag.is_cancelled() {
        tracing::warn!(signal, "Already stopping; waiting for the current frame to finish");
    } else {
        tracing::info!(signal, "Received signal; finishing current frame and closing encoder");
        flag.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_shared_between_clones() {
        let flag = CancellationFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_cancelled());

        flag.cancel();
        assert!(observer.is_cancelled());

        request_cancel(&flag, "SIGINT");
        assert!(observer.is_cancelled());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sigterm_sets_flag() {
        let flag = CancellationFlag::new();
        let listener = listen_for_signals(flag.clone()).unwrap();

        let pid = std::process::id().to_string();
        let status = tokio::process::Command::new("kill")
            .args(["-TERM", &pid])
            .status()
            .await
            .unwrap();
        assert!(status.success());

        for _ in 0..100 {
            if flag.is_cancelled() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(flag.is_cancelled());
        listener.abort();
    }
}
