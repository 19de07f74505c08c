//! The packet source: JSON lines in, [`Packet`]s out through a bounded channel.
//!
//! Each line is one upload:
//!
//! ```json
//! {"layer": 200, "auth_key": "<hex>", "session_id": "<hex>", "packet": "<hex>"}
//! ```

use std::fmt;

use serde::Deserialize;
use tgarchive::Packet;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum SourceError {
    Json(serde_json::Error),
    /// A field is not valid hex.
    Hex { field: &'static str, source: hex::FromHexError },
    /// `session_id` does not decode to 8 bytes.
    SessionIdLength(usize),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "invalid upload: {e}"),
            Self::Hex { field, source } => write!(f, "{field} is not hex-encoded bytes: {source}"),
            Self::SessionIdLength(len) => write!(f, "session_id must be 8 bytes, got {len}"),
        }
    }
}

impl std::error::Error for SourceError {}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Upload {
    layer:      i32,
    auth_key:   String,
    session_id: String,
    packet:     String,
}

fn unhex(field: &'static str, s: &str) -> Result<Vec<u8>, SourceError> {
    hex::decode(s.trim()).map_err(|source| SourceError::Hex { field, source })
}

/// Parse one upload line.
pub fn parse_line(line: &str) -> Result<Packet, SourceError> {
    let upload: Upload = serde_json::from_str(line).map_err(SourceError::Json)?;
    let session_id = unhex("session_id", &upload.session_id)?;
    let session_id: [u8; 8] =
        session_id.as_slice().try_into().map_err(|_| SourceError::SessionIdLength(session_id.len()))?;

    Ok(Packet {
        layer: upload.layer,
        auth_key: unhex("auth_key", &upload.auth_key)?,
        session_id,
        data: unhex("packet", &upload.packet)?,
    })
}

/// Forward every valid line of `reader` into `tx`.
///
/// Bad lines are logged and skipped. Waits when the channel is full and stops
/// early if the receiver is gone. Returns the number of packets sent.
pub async fn feed<R: AsyncBufRead + Unpin>(reader: R, tx: mpsc::Sender<Packet>) -> std::io::Result<usize> {
    let mut lines = reader.lines();
    let mut sent = 0;
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(packet) => {
                if tx.send(packet).await.is_err() {
                    tracing::debug!("[source] receiver closed, stopping at line {line_no}");
                    break;
                }
                sent += 1;
            }
            Err(e) => tracing::warn!("[source] line {line_no}: {e}"),
        }
    }
    Ok(sent)
}

/// Read uploads from stdin on a background task.
pub fn spawn_stdin(capacity: usize) -> mpsc::Receiver<Packet> {
    let (tx, rx) = mpsc::channel(capacity);
    tokio::spawn(async move {
        match feed(BufReader::new(tokio::io::stdin()), tx).await {
            Ok(n) => tracing::info!("[source] stdin closed after {n} packets"),
            Err(e) => tracing::warn!("[source] stdin read failed: {e}"),
        }
    });
    rx
}
