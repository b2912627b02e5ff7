//! Unix Domain Socket server receiving bus messages

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::AsyncReadExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

use super::protocol::BusMessage;

/// Largest accepted message body
const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Bind the bus socket, replacing a stale one left by an earlier run
pub fn bind(socket_path: &Path) -> Result<UnixListener> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path).context("Failed to remove existing socket")?;
    }
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create socket directory")?;
    }

    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("Failed to bind to socket: {}", socket_path.display()))?;
    tracing::info!("Bus listener started at: {}", socket_path.display());
    Ok(listener)
}

/// Accept connections forever, forwarding every decoded message to `tx`.
///
/// Each connection carries one length-prefixed JSON message.
pub async fn serve(listener: UnixListener, tx: mpsc::Sender<BusMessage>) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, tx).await {
                        tracing::warn!("Error handling connection: {}", e);
                    }
                });
            }
            Err(e) => {
                tracing::warn!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn handle_connection(mut stream: UnixStream, tx: mpsc::Sender<BusMessage>) -> Result<()> {
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .await
        .context("Failed to read message length")?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_LEN {
        anyhow::bail!("Message too large: {} bytes", len);
    }

    let mut buf = vec![0u8; len];
    stream
        .read_exact(&mut buf)
        .await
        .context("Failed to read message body")?;

    let message: BusMessage = serde_json::from_slice(&buf).context("Failed to parse message")?;
    tx.send(message)
        .await
        .context("Failed to send message to main loop")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt;

    async fn write_frame(socket_path: &Path, body: &[u8]) {
        let mut stream = UnixStream::connect(socket_path).await.unwrap();
        stream.write_all(&(body.len() as u32).to_be_bytes()).await.unwrap();
        stream.write_all(body).await.unwrap();
        stream.flush().await.unwrap();
    }

    #[tokio::test]
    async fn test_listener_forwards_messages() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("run/bus.sock");
        let (tx, mut rx) = mpsc::channel(8);

        let listener = bind(&socket_path).unwrap();
        let server = tokio::spawn(serve(listener, tx));

        // Malformed messages are dropped without stopping the listener
        write_frame(&socket_path, b"{\"type\":\"bogus\"}").await;
        write_frame(&socket_path, b"{\"type\":\"display_entered\"}").await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received, BusMessage::DisplayEntered);
        server.abort();
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("bus.sock");
        std::fs::write(&socket_path, b"").unwrap();

        assert!(bind(&socket_path).is_ok());
    }
}
