//! Signal handling for the HTTP server.
//!
//! The first SIGINT, SIGTERM or SIGHUP cancels the returned token, which
//! stops the listener and lets in-flight requests finish. A build still
//! running is abandoned; its `.part` file never replaces the served
//! snapshot. A second signal exits immediately.

use tokio_util::sync::CancellationToken;

#[cfg(unix)]
struct Signals {
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    async fn next(&mut self) {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = self.terminate.recv() => {}
            _ = self.hangup.recv() => {}
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn register() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn next(&mut self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

/// Register the handlers and return the server's shutdown token.
pub(crate) fn install_signal_handler() -> std::io::Result<CancellationToken> {
    let mut signals = Signals::register()?;
    let token = CancellationToken::new();

    let handler_token = token.clone();
    tokio::spawn(async move {
        signals.next().await;
        tracing::info!("Shutdown requested, draining connections (signal again to force)");
        handler_token.cancel();

        signals.next().await;
        tracing::warn!("Force exit requested");
        std::process::exit(130);
    });

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_starts_live() {
        let token = install_signal_handler().unwrap();
        assert!(!token.is_cancelled());
    }
}
