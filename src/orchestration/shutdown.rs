//! Termination signal handling for the manager process.
//!
//! Handlers are registered by [`ShutdownSignals::install`], which the
//! manager binary calls before loading the checklist and binding the
//! socket. A signal that arrives during startup is therefore held until
//! the request loop starts waiting on it.

use std::io;
use tokio::signal;
use tracing::info;

/// Registered SIGINT and SIGTERM streams
#[derive(Debug)]
pub struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: signal::unix::Signal,
    #[cfg(unix)]
    terminate: signal::unix::Signal,
}

impl ShutdownSignals {
    /// Register the signal handlers now, without waiting
    ///
    /// Must be called from within a tokio runtime.
    pub fn install() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use signal::unix::SignalKind;

            Ok(Self {
                interrupt: signal::unix::signal(SignalKind::interrupt())?,
                terminate: signal::unix::signal(SignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Complete when the first termination signal arrives
    #[cfg(unix)]
    pub async fn wait(mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {
                info!("Received SIGINT");
            },
            _ = self.terminate.recv() => {
                info!("Received SIGTERM");
            },
        }
    }

    /// Complete when the first termination signal arrives
    #[cfg(not(unix))]
    pub async fn wait(self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C"),
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_before_wait_is_not_lost() {
        let idle = ShutdownSignals::install().unwrap();
        let waited = tokio::time::timeout(Duration::from_millis(50), idle.wait()).await;
        assert!(waited.is_err());

        let signals = ShutdownSignals::install().unwrap();

        // Delivered while nothing is waiting yet, as during startup
        let status = std::process::Command::new("kill")
            .arg("-TERM")
            .arg(std::process::id().to_string())
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), signals.wait())
            .await
            .expect("pending SIGTERM should end the wait");
    }
}
