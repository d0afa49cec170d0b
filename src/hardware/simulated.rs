// src/hardware/simulated.rs - Dry-run controller that acknowledges every line
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::communication::channel::ACK_TOKEN;
use crate::hardware::{CommandSink, HardwareError, ReplySource};

/// A fake controller: each written line is logged and answered with `ok`.
pub fn simulated_device() -> (SimulatedSink, SimulatedSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SimulatedSink { replies: tx }, SimulatedSource { replies: rx })
}

pub struct SimulatedSink {
    replies: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl CommandSink for SimulatedSink {
    async fn write_line(&mut self, line: &str) -> Result<(), HardwareError> {
        tracing::info!("write -> {}", line);
        self.replies
            .send(ACK_TOKEN.to_string())
            .map_err(|_| HardwareError::Closed)
    }
}

pub struct SimulatedSource {
    replies: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl ReplySource for SimulatedSource {
    async fn read_line(&mut self) -> Result<Option<String>, HardwareError> {
        Ok(self.replies.recv().await)
    }
}
