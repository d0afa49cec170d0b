// src/hardware/serial.rs - Stage controller over a serial port
use async_trait::async_trait;
use serial2_tokio::SerialPort;
use std::sync::Arc;

use crate::hardware::{CommandSink, HardwareError, ReplySource};

const READ_CHUNK: usize = 256;

/// Open `path` at `baud` and split it into the two halves the worker needs.
pub fn open(path: &str, baud: u32) -> Result<(SerialWriter, SerialReader), HardwareError> {
    tracing::info!("Opening serial port: {} @ {} baud", path, baud);
    let port = SerialPort::open(path, baud)?;
    tracing::info!("Serial port is open");
    Ok(split(Arc::new(port)))
}

pub fn split(port: Arc<SerialPort>) -> (SerialWriter, SerialReader) {
    (
        SerialWriter { port: port.clone() },
        SerialReader { port, pending: Vec::new() },
    )
}

pub struct SerialWriter {
    port: Arc<SerialPort>,
}

#[async_trait]
impl CommandSink for SerialWriter {
    async fn write_line(&mut self, line: &str) -> Result<(), HardwareError> {
        let framed = format!("{}\n", line);
        let bytes = framed.as_bytes();
        let mut written = 0;
        while written < bytes.len() {
            let n = self.port.write(&bytes[written..]).await?;
            if n == 0 {
                return Err(HardwareError::Closed);
            }
            written += n;
        }
        tracing::debug!("Serial TX: {}", line);
        Ok(())
    }
}

pub struct SerialReader {
    port: Arc<SerialPort>,
    /// Bytes received after the last complete line
    pending: Vec<u8>,
}

impl SerialReader {
    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|b| *b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=end).collect();
        let line = match String::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                // Forwarded with U+FFFD substitutions; it can never match the ack token.
                tracing::warn!("Serial RX: invalid UTF-8 in reply: {}", e);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Some(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[async_trait]
impl ReplySource for SerialReader {
    async fn read_line(&mut self) -> Result<Option<String>, HardwareError> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            if let Some(line) = self.take_line() {
                tracing::trace!("Serial RX: {}", line);
                return Ok(Some(line));
            }
            let n = self.port.read(&mut buf).await?;
            if n == 0 {
                return Ok(None);
            }
            self.pending.extend_from_slice(&buf[..n]);
        }
    }
}
