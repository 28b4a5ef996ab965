//! Interrupt handling for long-running commands

use anyhow::{Context, Result};
use std::thread;
use tracing::warn;

use meros_core::CancellationToken;

/// Cancel `token` on the first SIGINT/SIGTERM; a second one exits immediately.
///
/// Handlers are installed before this returns.
pub fn cancel_on_interrupt(token: CancellationToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start signal runtime")?;
    let mut interrupts = {
        let _guard = runtime.enter();
        Interrupts::register()?
    };

    thread::Builder::new()
        .name("meros-signal".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                interrupts.recv().await;
                warn!("Interrupted, cancelling run (interrupt again to abort)");
                token.cancel();
                interrupts.recv().await;
                std::process::exit(130);
            })
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}

#[cfg(unix)]
struct Interrupts {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Interrupts {
    fn register() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?,
            terminate: signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?,
        })
    }

    async fn recv(&mut self) {
        std::future::poll_fn(|cx| {
            if self.interrupt.poll_recv(cx).is_ready() || self.terminate.poll_recv(cx).is_ready() {
                std::task::Poll::Ready(())
            } else {
                std::task::Poll::Pending
            }
        })
        .await
    }
}

#[cfg(not(unix))]
struct Interrupts;

#[cfg(not(unix))]
impl Interrupts {
    fn register() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        let _ = tokio::signal::ctrl_c().await;
    }
}
