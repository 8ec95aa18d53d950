// Command and protocol-control message dispatch

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, Mutex};

use crate::error::{RtmpError, RtmpResult};
use crate::log::Logger;
use crate::registry::{
    add_publisher, add_receiver, broadcast_av_message, close_all, spawn_receiver_delivery_task,
    ReceiverEntry, StreamRegistry, RECEIVER_QUEUE_CAPACITY,
};
use crate::rtmp::chunk::RtmpMessage;
use crate::rtmp::command::RtmpCommand;
use crate::rtmp::constants::*;
use crate::rtmp::messages::*;
use crate::server::config::RtmpServerConfiguration;
use crate::session::status::{JoinedStream, SessionStatus};
use crate::transport::write_bytes;

/// Handles one fully-assembled incoming message: protocol control, command
/// invocation, or forwarded AV payload.
pub async fn handle_message<W>(
    msg: RtmpMessage,
    status: &mut SessionStatus,
    write_stream: &Arc<Mutex<W>>,
    registry: &StreamRegistry,
    logger: &Logger,
    config: &Arc<RtmpServerConfiguration>,
) -> RtmpResult<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    match msg.type_id {
        RTMP_TYPE_SET_CHUNK_SIZE => {
            if msg.payload.len() >= 4 {
                status.recv_chunk_size = u32::from_be_bytes(msg.payload[0..4].try_into().unwrap());
            }
        }
        RTMP_TYPE_ACKNOWLEDGEMENT => {
            logger.log_trace("received ACK from peer");
        }
        RTMP_TYPE_USER_CONTROL => {
            logger.log_trace("received user control message");
        }
        RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE => {
            if msg.payload.len() >= 4 {
                status.recv_window_ack_size = u32::from_be_bytes(msg.payload[0..4].try_into().unwrap());
            }
        }
        RTMP_TYPE_SET_PEER_BANDWIDTH => {
            if msg.payload.len() >= 5 {
                status.peer_bandwidth = u32::from_be_bytes(msg.payload[0..4].try_into().unwrap());
                status.peer_bandwidth_limit_type = msg.payload[4];
            }
        }
        0x00 => {
            status.closing = true;
        }
        RTMP_TYPE_AUDIO | RTMP_TYPE_VIDEO => {
            if let Some(publishing) = &status.publishing {
                broadcast_av_message(&publishing.stream, msg).await;
            }
        }
        RTMP_TYPE_DATA => {
            logger.log_debug("received AMF data message");
        }
        RTMP_TYPE_INVOKE => {
            let command = RtmpCommand::decode(&msg.payload)?;
            dispatch_command(command, msg.stream_id, status, write_stream, registry, logger, config).await?;
        }
        RTMP_TYPE_FLEX_MESSAGE => {
            // AMF3 command: strip the leading marker byte and decode the
            // remainder as AMF0. Full AMF3 encoding is out of scope.
            if msg.payload.is_empty() {
                return Err(RtmpError::MalformedAmf("empty AMF3 command".to_string()));
            }
            let command = RtmpCommand::decode(&msg.payload[1..])?;
            dispatch_command(command, msg.stream_id, status, write_stream, registry, logger, config).await?;
        }
        other => {
            let err = RtmpError::Unknown(format!("unhandled message type {other:#04x}"));
            logger.log_debug(&format!("{err}"));
        }
    }

    Ok(())
}

async fn dispatch_command<W>(
    command: RtmpCommand,
    message_stream_id: u32,
    status: &mut SessionStatus,
    write_stream: &Arc<Mutex<W>>,
    registry: &StreamRegistry,
    logger: &Logger,
    config: &Arc<RtmpServerConfiguration>,
) -> RtmpResult<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    match command.name.as_str() {
        "connect" => {
            let app = command
                .command_object
                .get("app")
                .and_then(|v| v.as_str())
                .ok_or_else(|| RtmpError::ProtocolViolation("connect missing app".to_string()))?;
            status.app_name = Some(app.trim_end_matches('/').to_string());

            let object_encoding = command.command_object.get("objectEncoding").and_then(|v| v.as_f64());

            send(
                write_stream,
                status,
                &make_window_ack_message(DEFAULT_WINDOW_ACK_SIZE),
            )
            .await?;
            send(
                write_stream,
                status,
                &make_peer_bandwidth_message(DEFAULT_PEER_BANDWIDTH, 2),
            )
            .await?;
            write_bytes(write_stream, &make_stream_status_message(STREAM_BEGIN, 0)).await?;

            send(
                write_stream,
                status,
                &make_connect_response(command.transaction_id, object_encoding),
            )
            .await?;

            if config.log_requests && logger.config.debug_enabled {
                logger.log_info(&format!("connect: app={}", status.app_name.as_deref().unwrap_or("")));
            }
        }
        "releaseStream" => {
            if let Some(name) = command.optional_args.as_ref().and_then(|v| v.as_str()) {
                if let Some(app) = &status.app_name {
                    let key = format!("{app}/{name}");
                    let stream = registry.get_or_create(&key).await;
                    close_all(&stream).await;
                }
            }
        }
        "FCPublish" => {
            let name = command
                .optional_args
                .as_ref()
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());

            if let (Some(name), Some(app)) = (name, status.app_name.clone()) {
                let key = format!("{app}/{name}");
                let stream = registry.get_or_create(&key).await;

                if add_publisher(&stream, status.session_id).await {
                    status.stream_name = Some(name);
                    status.publishing = Some(JoinedStream { name: key, stream });
                } else if config.log_requests && logger.config.debug_enabled {
                    logger.log_warning(&format!("stream {key} already has a publisher"));
                }
            }
        }
        "createStream" => {
            let stream_id_value = status.next_create_stream_id();
            send(
                write_stream,
                status,
                &make_create_stream_response(command.transaction_id, stream_id_value as f64),
            )
            .await?;
        }
        "publish" => {
            send(write_stream, status, &make_publish_start_status(message_stream_id)).await?;
        }
        "FCUnpublish" => {
            status.closing = true;
        }
        "play" => {
            let name = command
                .optional_args
                .as_ref()
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());

            status.send_chunk_size = PLAY_CHUNK_SIZE;
            send(write_stream, status, &make_chunk_size_message(PLAY_CHUNK_SIZE)).await?;
            write_bytes(
                write_stream,
                &make_stream_status_message(STREAM_IS_RECORD, status.stream_csid),
            )
            .await?;
            write_bytes(
                write_stream,
                &make_stream_status_message(STREAM_BEGIN, status.stream_csid),
            )
            .await?;
            send(
                write_stream,
                status,
                &make_play_status(status.stream_csid, "NetStream.Play.Reset", "Playing and resetting."),
            )
            .await?;
            send(
                write_stream,
                status,
                &make_play_status(status.stream_csid, "NetStream.Play.Start", "Started playing."),
            )
            .await?;

            if let (Some(name), Some(app)) = (name, status.app_name.clone()) {
                let key = format!("{app}/{name}");
                let stream = registry.get_or_create(&key).await;

                let (av_tx, av_rx) = mpsc::channel(RECEIVER_QUEUE_CAPACITY);
                let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

                add_receiver(
                    &stream,
                    ReceiverEntry {
                        id: status.session_id,
                        sender: av_tx,
                        shutdown: shutdown_tx.clone(),
                    },
                )
                .await;

                spawn_receiver_delivery_task(
                    write_stream.clone(),
                    stream.clone(),
                    status.video_csid,
                    status.audio_csid,
                    status.send_chunk_size,
                    av_rx,
                    shutdown_rx,
                    Arc::new(logger.make_child_logger("[RECEIVER] ")),
                );

                status.delivery_shutdown = Some(shutdown_tx);
                status.playing = Some(JoinedStream { name: key, stream });
            }
        }
        "FCSubscribe" | "getStreamLength" | "deleteStream" => {
            if config.log_requests && logger.config.debug_enabled {
                logger.log_debug(&format!("ignored no-op command: {}", command.name));
            }
        }
        other => {
            let err = RtmpError::Unknown(format!("unrecognized command: {other}"));
            if config.log_requests && logger.config.debug_enabled {
                logger.log_debug(&format!("{err}"));
            }
        }
    }

    Ok(())
}

async fn send<W>(write_stream: &Arc<Mutex<W>>, status: &SessionStatus, msg: &RtmpMessage) -> RtmpResult<()>
where
    W: AsyncWrite + Unpin,
{
    write_bytes(write_stream, &msg.to_chunks(status.send_chunk_size)).await
}
