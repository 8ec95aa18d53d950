// Top-level per-connection task: handshake, read/dispatch loop, cleanup

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::{RtmpError, RtmpResult};
use crate::log::Logger;
use crate::registry::{remove_publisher, remove_receiver, StreamRegistry};
use crate::rtmp::constants::{RTMP_SIG_SIZE, RTMP_VERSION};
use crate::rtmp::handshake::generate_s0_s1_s2;
use crate::server::config::RtmpServerConfiguration;
use crate::session::chunk_io::read_message;
use crate::session::dispatch::handle_message;
use crate::session::status::SessionStatus;

/// Drives one accepted connection end to end: handshake, then the
/// read-dispatch loop until the peer disconnects or a fatal error occurs.
/// Always deregisters from any joined stream and stops its delivery task on
/// the way out, regardless of how the loop ended.
pub async fn handle_connection<S>(
    stream: S,
    session_id: u64,
    config: Arc<RtmpServerConfiguration>,
    registry: Arc<StreamRegistry>,
    logger: Arc<Logger>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut read_half, write_half) = tokio::io::split(stream);
    let write_stream = Arc::new(Mutex::new(write_half));
    let mut status = SessionStatus::new(session_id);
    status.recv_chunk_size = config.chunk_size;
    status.send_chunk_size = config.chunk_size;
    status.recv_window_ack_size = config.window_ack_size;

    if let Err(e) = perform_handshake(&mut read_half, &write_stream).await {
        logger.log_debug(&format!("handshake failed: {e}"));
        cleanup(&mut status, &registry).await;
        return;
    }

    loop {
        if status.closing {
            break;
        }

        let message = match read_message(&mut read_half, &write_stream, &mut status).await {
            Ok(message) => message,
            Err(e) => {
                logger.log_debug(&format!("connection loop ended: {e}"));
                break;
            }
        };

        if let Err(e) = handle_message(message, &mut status, &write_stream, &registry, &logger, &config).await {
            logger.log_debug(&format!("message handling failed: {e}"));
            break;
        }
    }

    cleanup(&mut status, &registry).await;

    let mut guard = write_stream.lock().await;
    let _ = guard.shutdown().await;
}

async fn perform_handshake<R, W>(read_half: &mut R, write_stream: &Arc<Mutex<W>>) -> RtmpResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut c0 = [0u8; 1];
    read_half.read_exact(&mut c0).await?;
    if c0[0] != RTMP_VERSION {
        return Err(RtmpError::HandshakeFailed(format!("unsupported C0 version {}", c0[0])));
    }

    let mut c1 = vec![0u8; RTMP_SIG_SIZE];
    read_half.read_exact(&mut c1).await?;

    // `generate_s0_s1_s2` already includes the leading S0 version byte.
    let response = generate_s0_s1_s2(&c1)?;
    {
        let mut guard = write_stream.lock().await;
        guard.write_all(&response).await?;
    }

    let mut c2 = vec![0u8; RTMP_SIG_SIZE];
    read_half.read_exact(&mut c2).await?;

    Ok(())
}

/// Runs regardless of how the connection loop ended: deregisters from any
/// joined stream and stops this connection's own delivery task.
async fn cleanup(status: &mut SessionStatus, registry: &Arc<StreamRegistry>) {
    let _ = registry;

    if let Some(publishing) = status.publishing.take() {
        remove_publisher(&publishing.stream, status.session_id).await;
    }

    if let Some(playing) = status.playing.take() {
        remove_receiver(&playing.stream, status.session_id).await;
    }

    if let Some(shutdown) = status.delivery_shutdown.take() {
        let _ = shutdown.try_send(());
    }
}
