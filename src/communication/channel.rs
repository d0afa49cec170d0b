// src/communication/channel.rs - Command/acknowledgment pipes between the planner and device IO
use tokio::sync::mpsc;

/// The only device reply that lets the planner proceed.
pub const ACK_TOKEN: &str = "ok";

/// Planner side: pushes command lines, receives device replies.
#[derive(Debug)]
pub struct PlannerLink {
    pub commands: mpsc::UnboundedSender<String>,
    pub acks: mpsc::UnboundedReceiver<String>,
}

/// Device-IO side: receives command lines, pushes device replies.
#[derive(Debug)]
pub struct DeviceLink {
    pub commands: mpsc::UnboundedReceiver<String>,
    pub acks: mpsc::UnboundedSender<String>,
}

/// Create the ordered, unbounded CommandChannel/AckChannel pair.
pub fn link() -> (PlannerLink, DeviceLink) {
    let (command_tx, command_rx) = mpsc::unbounded_channel::<String>();
    let (ack_tx, ack_rx) = mpsc::unbounded_channel::<String>();
    (
        PlannerLink { commands: command_tx, acks: ack_rx },
        DeviceLink { commands: command_rx, acks: ack_tx },
    )
}

/// Whether a trimmed device reply is the proceed signal.
pub fn is_ack(reply: &str) -> bool {
    reply == ACK_TOKEN
}
