// src/hardware/mod.rs - Device-IO worker between the channels and the stage controller
pub mod serial;
pub mod simulated;

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::communication::channel::{is_ack, DeviceLink};

/// Line the controller needs before it accepts moves after reset or alarm.
pub const UNLOCK_COMMAND: &str = "$X";

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("Serial port error: {0}")]
    Serial(#[from] std::io::Error),
    #[error("Timeout waiting for response")]
    Timeout,
    #[error("Device connection closed")]
    Closed,
}

/// Outgoing half of a device connection.
#[async_trait]
pub trait CommandSink: Send {
    /// Transmit `line` verbatim followed by a newline.
    async fn write_line(&mut self, line: &str) -> Result<(), HardwareError>;
}

/// Incoming half of a device connection.
#[async_trait]
pub trait ReplySource: Send {
    /// Next reply with trailing line terminators removed; `None` once the device is gone.
    async fn read_line(&mut self) -> Result<Option<String>, HardwareError>;
}

/// Device traffic counters, shared with whoever wants to watch them.
#[derive(Debug, Default)]
pub struct DeviceStats {
    pub commands_sent: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub replies_received: AtomicU64,
    pub bytes_received: AtomicU64,
}

impl DeviceStats {
    fn record_sent(&self, line: &str) {
        self.commands_sent.fetch_add(1, Ordering::Relaxed);
        // +1 for the newline
        self.bytes_sent.fetch_add(line.len() as u64 + 1, Ordering::Relaxed);
    }

    fn record_received(&self, line: &str) {
        self.replies_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(line.len() as u64, Ordering::Relaxed);
    }

    pub fn commands_sent(&self) -> u64 {
        self.commands_sent.load(Ordering::Relaxed)
    }

    pub fn replies_received(&self) -> u64 {
        self.replies_received.load(Ordering::Relaxed)
    }
}

/// Forwards CommandChannel lines to the device and device replies to the AckChannel.
pub struct DeviceWorker<W, R> {
    sink: W,
    source: R,
    stats: Arc<DeviceStats>,
}

impl<W: CommandSink, R: ReplySource> DeviceWorker<W, R> {
    pub fn new(sink: W, source: R) -> Self {
        Self {
            sink,
            source,
            stats: Arc::new(DeviceStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<DeviceStats> {
        self.stats.clone()
    }

    /// Send the unlock line and consume replies up to its `ok`, so it never
    /// reaches the planner's AckChannel.
    pub async fn unlock(&mut self, limit: Duration) -> Result<(), HardwareError> {
        tracing::info!("Unlocking controller");
        self.sink.write_line(UNLOCK_COMMAND).await?;
        self.stats.record_sent(UNLOCK_COMMAND);
        let source = &mut self.source;
        let stats = &self.stats;
        let wait = async {
            loop {
                match source.read_line().await? {
                    Some(reply) => {
                        stats.record_received(&reply);
                        tracing::info!("serial> {}", reply);
                        if is_ack(&reply) {
                            return Ok(());
                        }
                    }
                    None => return Err(HardwareError::Closed),
                }
            }
        };
        tokio::time::timeout(limit, wait)
            .await
            .map_err(|_| HardwareError::Timeout)?
    }

    /// Pump both directions until the planner drops the CommandChannel, the
    /// planner drops the AckChannel, or the device goes away.
    pub async fn run(self, link: DeviceLink) -> Result<(), HardwareError> {
        let DeviceWorker { mut sink, mut source, stats } = self;
        let DeviceLink { mut commands, acks } = link;

        let writer = async {
            while let Some(command) = commands.recv().await {
                tracing::info!("get: {}", command);
                sink.write_line(&command).await?;
                stats.record_sent(&command);
            }
            tracing::info!("Command channel closed, device worker stopping");
            Ok::<(), HardwareError>(())
        };

        let reader = async {
            loop {
                match source.read_line().await? {
                    Some(reply) if reply.is_empty() => continue,
                    Some(reply) => {
                        tracing::info!("serial> {}", reply);
                        stats.record_received(&reply);
                        if acks.send(reply).is_err() {
                            tracing::info!("Acknowledgment channel closed, device worker stopping");
                            return Ok(());
                        }
                    }
                    None => {
                        tracing::warn!("Device connection closed");
                        return Ok::<(), HardwareError>(());
                    }
                }
            }
        };

        let result = tokio::select! {
            result = writer => result,
            result = reader => result,
        };
        tracing::info!(
            "Device worker finished: {} commands sent, {} replies received",
            stats.commands_sent(),
            stats.replies_received()
        );
        result
    }
}
