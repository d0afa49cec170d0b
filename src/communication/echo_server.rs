// src/communication/echo_server.rs - TCP echo front-end
//
// Stateless: every received chunk is stripped, upper-cased and sent straight
// back. Nothing reaches the planner from here.

use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

const READ_CHUNK: usize = 1024;

pub struct EchoServer {
    listener: TcpListener,
}

impl EchoServer {
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, one task per client.
    pub async fn serve(self) -> io::Result<()> {
        tracing::info!("Echo server listening on {}", self.listener.local_addr()?);
        loop {
            let (stream, peer) = self.listener.accept().await?;
            tracing::info!("{} connected", peer);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream).await {
                    tracing::warn!("Echo connection {} failed: {}", peer, e);
                }
                tracing::info!("{} disconnected", peer);
            });
        }
    }
}

/// Reply for one received chunk.
pub fn echo_reply(chunk: &[u8]) -> Vec<u8> {
    chunk.trim_ascii().to_ascii_uppercase()
}

async fn handle_connection(mut stream: TcpStream) -> io::Result<()> {
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        stream.write_all(&echo_reply(&buf[..n])).await?;
    }
}
