//! The top-level control loop: ticks stats out to observers, applies
//! operator commands to buffers and worker groups, and drives an orderly
//! shutdown when asked.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::interval;

use crate::telemetry::DynBuffer;
use crate::worker_group::WorkerGroup;

#[derive(Debug)]
pub enum ControlCommand {
    Pause(String),
    Resume(String),
    FlushBuffer(String),
    Shutdown { grace: Option<Duration> },
}

pub type StatsSnapshot = HashMap<String, mimo_ring::BufferStats>;

pub struct ControlLoop {
    buffers: Vec<Box<dyn DynBuffer>>,
    groups: Vec<WorkerGroup>,
    stats_tx: watch::Sender<StatsSnapshot>,
    tick_period: Duration,
}

impl ControlLoop {
    #[must_use]
    pub fn new(buffers: Vec<Box<dyn DynBuffer>>, groups: Vec<WorkerGroup>, tick_period: Duration) -> (Self, watch::Receiver<StatsSnapshot>) {
        let (stats_tx, stats_rx) = watch::channel(StatsSnapshot::new());
        (
            Self {
                buffers,
                groups,
                stats_tx,
                tick_period,
            },
            stats_rx,
        )
    }

    /// Runs until `shutdown` fires or every worker group has exited on its
    /// own, applying commands from `commands` as they arrive and publishing
    /// a stats snapshot on every tick.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<ControlCommand>, mut shutdown: oneshot::Receiver<()>) {
        let mut ticker = interval(self.tick_period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.publish_stats();
                    if self.all_groups_exited() {
                        tracing::info!("all worker groups exited, stopping control loop");
                        break;
                    }
                }
                command = commands.recv() => {
                    match command {
                        Some(command) => {
                            let should_stop = self.handle_command(command).await;
                            if should_stop {
                                break;
                            }
                        }
                        None => {
                            tracing::info!("command channel closed, stopping control loop");
                            break;
                        }
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    self.shutdown_all(None).await;
                    break;
                }
            }
        }
    }

    fn publish_stats(&self) {
        let snapshot: StatsSnapshot = self.buffers.iter().map(|b| (b.name().to_owned(), b.stats())).collect();
        let _ = self.stats_tx.send(snapshot);
    }

    fn all_groups_exited(&mut self) -> bool {
        !self.groups.is_empty() && self.groups.iter_mut().all(|g| g.alive_processes() == 0)
    }

    async fn handle_command(&mut self, command: ControlCommand) -> bool {
        match command {
            ControlCommand::Pause(name) => {
                if let Some(buffer) = self.find_buffer(&name) {
                    buffer.pause();
                } else {
                    tracing::warn!(buffer = %name, "pause requested for unknown buffer");
                }
                false
            }
            ControlCommand::Resume(name) => {
                if let Some(buffer) = self.find_buffer(&name) {
                    buffer.resume();
                } else {
                    tracing::warn!(buffer = %name, "resume requested for unknown buffer");
                }
                false
            }
            ControlCommand::FlushBuffer(name) => {
                if let Some(buffer) = self.find_buffer(&name) {
                    buffer.send_flush_event();
                } else {
                    tracing::warn!(buffer = %name, "flush requested for unknown buffer");
                }
                false
            }
            ControlCommand::Shutdown { grace } => {
                self.shutdown_all(grace).await;
                true
            }
        }
    }

    fn find_buffer(&self, name: &str) -> Option<&dyn DynBuffer> {
        self.buffers.iter().find(|b| b.name() == name).map(std::convert::AsRef::as_ref)
    }

    async fn shutdown_all(&mut self, grace: Option<Duration>) {
        for buffer in &self.buffers {
            buffer.send_flush_event();
        }
        let groups = std::mem::take(&mut self.groups);
        tokio::task::spawn_blocking(move || {
            let mut groups = groups;
            for group in &mut groups {
                group.shutdown(grace);
            }
        })
        .await
        .ok();
    }
}
