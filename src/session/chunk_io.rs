// Async chunk reading: turns transport bytes into complete RtmpMessages

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::Mutex;

use crate::error::RtmpResult;
use crate::rtmp::chunk::{
    basic_header_extra_len, message_header_size, parse_basic_header, parse_message_header,
    resolve_header, PartialMessage, RtmpMessage, EXTENDED_TIMESTAMP_SENTINEL,
};
use crate::rtmp::messages::make_ack_message;
use crate::session::status::SessionStatus;
use crate::transport::write_bytes;

/// Reads exactly one chunk (basic header + message header + payload slice)
/// and returns the message it completes, if any, along with the number of
/// bytes consumed from the transport for this chunk (used for window-ack
/// accounting).
pub async fn read_one_chunk<R>(reader: &mut R, status: &mut SessionStatus) -> RtmpResult<(Option<RtmpMessage>, u32)>
where
    R: AsyncRead + Unpin,
{
    let mut first_byte = [0u8; 1];
    reader.read_exact(&mut first_byte).await?;
    let mut consumed = 1u32;

    let csid6 = first_byte[0] & 0x3f;
    let extra_len = basic_header_extra_len(csid6);
    let mut extra = [0u8; 2];
    if extra_len > 0 {
        reader.read_exact(&mut extra[..extra_len]).await?;
        consumed += extra_len as u32;
    }
    let basic = parse_basic_header(first_byte[0], &extra[..extra_len]);

    let header_len = message_header_size(basic.fmt);
    let mut header_bytes = [0u8; 11];
    if header_len > 0 {
        reader.read_exact(&mut header_bytes[..header_len]).await?;
        consumed += header_len as u32;
    }
    let mut parsed = parse_message_header(basic.fmt, &header_bytes[..header_len]);

    if parsed.timestamp == Some(EXTENDED_TIMESTAMP_SENTINEL) {
        let mut ext = [0u8; 4];
        reader.read_exact(&mut ext).await?;
        consumed += 4;
        parsed.timestamp = Some(u32::from_be_bytes(ext));
    }

    let last = status.last_chunk.entry(basic.csid).or_default();
    let (timestamp, length, type_id, stream_id) = resolve_header(basic.fmt, parsed, last)?;
    let length = length as usize;

    let existing_remaining = status.partial.get(&stream_id).map(|m| m.remaining());
    let to_read = match existing_remaining {
        Some(remaining) => remaining.min(status.recv_chunk_size as usize),
        None => length.min(status.recv_chunk_size as usize),
    };

    // A zero-length read (including the fmt-3/zero-length-message case) is a
    // no-op: it never touches the transport.
    let mut payload = vec![0u8; to_read];
    if to_read > 0 {
        reader.read_exact(&mut payload).await?;
        consumed += to_read as u32;
    }

    let message = if let Some(mut partial) = status.partial.remove(&stream_id) {
        partial.payload.extend_from_slice(&payload);
        if partial.is_complete() {
            Some(RtmpMessage::new(
                partial.timestamp,
                partial.type_id,
                partial.stream_id,
                partial.csid,
                partial.payload,
            ))
        } else {
            status.partial.insert(stream_id, partial);
            None
        }
    } else if payload.len() >= length {
        Some(RtmpMessage::new(timestamp, type_id, stream_id, basic.csid, payload))
    } else {
        status.partial.insert(
            stream_id,
            PartialMessage {
                timestamp,
                length,
                type_id,
                stream_id,
                csid: basic.csid,
                payload,
            },
        );
        None
    };

    Ok((message, consumed))
}

/// Reads chunks until a complete message is assembled, emitting a type-3 ACK
/// whenever the accumulated byte count crosses `recv_window_ack_size`.
pub async fn read_message<R, W>(
    reader: &mut R,
    write_stream: &Mutex<W>,
    status: &mut SessionStatus,
) -> RtmpResult<RtmpMessage>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let (message, consumed) = read_one_chunk(reader, status).await?;

        if let Some(total_received) = status.account_bytes(consumed) {
            let ack = make_ack_message(total_received);
            write_bytes(write_stream, &ack.to_chunks(status.send_chunk_size)).await?;
        }

        if let Some(message) = message {
            return Ok(message);
        }
    }
}
