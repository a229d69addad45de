//! Aggregates stdout/stderr from every worker process into one channel the
//! control loop drains into `tracing`, rather than letting N child
//! processes race each other writing straight to the terminal.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone)]
pub struct PrintMessage {
    pub worker: String,
    pub stream: Stream,
    pub line: String,
}

pub type PrintSender = UnboundedSender<PrintMessage>;

/// Creates a fan-in channel; clone the returned sender once per worker
/// process (one clone for stdout, one for stderr) and drain the receiver
/// with [`run_consumer`].
#[must_use]
pub fn channel() -> (PrintSender, UnboundedReceiver<PrintMessage>) {
    mpsc::unbounded_channel()
}

/// Forwards every message to `tracing`: stdout at `info`, stderr at `warn`.
/// Runs until every sender clone is dropped.
pub async fn run_consumer(mut rx: UnboundedReceiver<PrintMessage>) {
    while let Some(message) = rx.recv().await {
        match message.stream {
            Stream::Stdout => tracing::info!(worker = %message.worker, "{}", message.line),
            Stream::Stderr => tracing::warn!(worker = %message.worker, "{}", message.line),
        }
    }
}
