//! OS signal handling for graceful shutdown
//!
//! Every SIGINT/SIGTERM (Ctrl+C on Windows) becomes a `Message::Quit`. The
//! first one starts the shutdown; later ones are logged so the user knows
//! the engine is still releasing its subscription.

use tokio::sync::mpsc;
use whereabouts_core::prelude::*;

use crate::message::Message;

/// Spawn a task that turns termination signals into quit messages
pub fn spawn_signal_handler(tx: mpsc::Sender<Message>) {
    tokio::spawn(async move {
        let mut signals = match Signals::new() {
            Ok(signals) => signals,
            Err(e) => {
                error!("Failed to install signal handlers: {}", e);
                return;
            }
        };

        let mut received = 0u32;
        loop {
            let name = signals.next().await;
            received += 1;
            if received == 1 {
                info!("Received {}, shutting down", name);
            } else {
                warn!("Received {} again, shutdown already in progress", name);
            }
            if tx.send(Message::Quit).await.is_err() {
                break;
            }
        }
    });
}

#[cfg(unix)]
struct Signals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn new() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    async fn next(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigint.recv() => "SIGINT",
            _ = self.sigterm.recv() => "SIGTERM",
        }
    }
}

#[cfg(windows)]
struct Signals;

#[cfg(windows)]
impl Signals {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn next(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        "Ctrl+C"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_handler_spawn() {
        let (tx, mut rx) = mpsc::channel::<Message>(1);

        spawn_signal_handler(tx);

        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        // No signal sent yet
        assert!(rx.try_recv().is_err());
    }
}
