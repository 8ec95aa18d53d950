// Shared transport write helper

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::RtmpResult;

/// Writes `bytes` to a shared, mutex-guarded transport. Only one task per
/// connection is ever meant to write AV data and another to write
/// handshake/command responses; the mutex exists to make that safe to get
/// wrong, not to encourage interleaving.
pub async fn write_bytes<TW: AsyncWrite + Unpin>(write_stream: &Mutex<TW>, bytes: &[u8]) -> RtmpResult<()> {
    let mut guard = write_stream.lock().await;
    guard.write_all(bytes).await?;
    Ok(())
}
