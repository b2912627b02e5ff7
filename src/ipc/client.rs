//! Client for sending bus messages to a running daemon

use anyhow::{Context, Result};
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use super::protocol::BusMessage;

/// Send one message to the daemon listening on `socket_path`
pub fn send_message(socket_path: &Path, message: &BusMessage) -> Result<()> {
    let stream = UnixStream::connect(socket_path)
        .with_context(|| format!("Failed to connect to socket: {}", socket_path.display()))?;

    stream
        .set_write_timeout(Some(Duration::from_secs(5)))
        .context("Failed to set write timeout")?;

    write_frame(&stream, message)
}

fn write_frame(mut stream: &UnixStream, message: &BusMessage) -> Result<()> {
    let json = serde_json::to_string(message).context("Failed to serialize message")?;

    let len = json.len() as u32;
    stream
        .write_all(&len.to_be_bytes())
        .context("Failed to write message length")?;
    stream
        .write_all(json.as_bytes())
        .context("Failed to write message")?;
    stream.flush().context("Failed to flush stream")?;

    Ok(())
}
