// Chunk framing: basic header, message header, message (dis)assembly

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{RtmpError, RtmpResult};
use crate::rtmp::constants::{message_header_size, CHUNK_TYPE_0, CHUNK_TYPE_3};

pub const EXTENDED_TIMESTAMP_SENTINEL: u32 = 0xFFFFFF;

/// A chunk's basic header: which fmt was used and which chunk stream it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicHeader {
    pub fmt: u8,
    pub csid: u32,
}

/// How many bytes follow the first basic-header byte, based on its low 6 bits.
pub fn basic_header_extra_len(csid6: u8) -> usize {
    match csid6 {
        0 => 1,
        1 => 2,
        _ => 0,
    }
}

/// Parses a basic header given its first byte and any extra bytes already
/// read per [`basic_header_extra_len`].
pub fn parse_basic_header(first_byte: u8, extra: &[u8]) -> BasicHeader {
    let fmt = first_byte >> 6;
    let csid6 = first_byte & 0x3f;

    let csid = match csid6 {
        0 => extra[0] as u32 + 64,
        1 => LittleEndian::read_u16(&[extra[0], extra[1]]) as u32 + 64,
        other => other as u32,
    };

    BasicHeader { fmt, csid }
}

/// Encodes a basic header in 1, 2 or 3 bytes depending on `csid`.
pub fn encode_basic_header(fmt: u8, csid: u32) -> Vec<u8> {
    if csid >= 64 + 255 {
        let rel = (csid - 64) as u16;
        let mut bytes = vec![(fmt << 6) | 1];
        bytes.extend_from_slice(&rel.to_le_bytes());
        bytes
    } else if csid >= 64 {
        vec![(fmt << 6), (csid - 64) as u8]
    } else {
        vec![(fmt << 6) | (csid as u8)]
    }
}

/// The subset of message-header fields present for a given fmt; absent
/// fields are inherited from the last chunk seen on this csid.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialMessageHeader {
    pub timestamp: Option<u32>,
    pub length: Option<u32>,
    pub type_id: Option<u8>,
    pub stream_id: Option<u32>,
}

/// Parses the fmt-dependent message header. `bytes` must be exactly
/// `message_header_size(fmt)` long.
pub fn parse_message_header(fmt: u8, bytes: &[u8]) -> PartialMessageHeader {
    match fmt & 0x03 {
        0 => PartialMessageHeader {
            timestamp: Some(read_u24(&bytes[0..3])),
            length: Some(read_u24(&bytes[3..6])),
            type_id: Some(bytes[6]),
            stream_id: Some(LittleEndian::read_u32(&bytes[7..11])),
        },
        1 => PartialMessageHeader {
            timestamp: Some(read_u24(&bytes[0..3])),
            length: Some(read_u24(&bytes[3..6])),
            type_id: Some(bytes[6]),
            stream_id: None,
        },
        2 => PartialMessageHeader {
            timestamp: Some(read_u24(&bytes[0..3])),
            length: None,
            type_id: None,
            stream_id: None,
        },
        _ => PartialMessageHeader::default(),
    }
}

/// Encodes the fmt-dependent message header (not including any extended
/// timestamp, which the caller appends separately).
pub fn encode_message_header(fmt: u8, timestamp: u32, length: u32, type_id: u8, stream_id: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(message_header_size(fmt));

    if fmt <= 2 {
        let ts_field = if timestamp >= EXTENDED_TIMESTAMP_SENTINEL {
            EXTENDED_TIMESTAMP_SENTINEL
        } else {
            timestamp
        };
        write_u24(&mut out, ts_field);
    }

    if fmt <= 1 {
        write_u24(&mut out, length);
        out.push(type_id);
    }

    if fmt == 0 {
        let mut stream_id_bytes = [0u8; 4];
        LittleEndian::write_u32(&mut stream_id_bytes, stream_id);
        out.extend_from_slice(&stream_id_bytes);
    }

    out
}

fn read_u24(bytes: &[u8]) -> u32 {
    BigEndian::read_u24(bytes)
}

fn write_u24(out: &mut Vec<u8>, value: u32) {
    let mut buf = [0u8; 3];
    BigEndian::write_u24(&mut buf, value);
    out.extend_from_slice(&buf);
}

/// A fully assembled RTMP message: payload bytes for one (stream-id, type,
/// timestamp) unit.
#[derive(Debug, Clone)]
pub struct RtmpMessage {
    pub timestamp: u32,
    pub type_id: u8,
    pub stream_id: u32,
    pub csid: u32,
    pub payload: Vec<u8>,
}

impl RtmpMessage {
    pub fn new(timestamp: u32, type_id: u8, stream_id: u32, csid: u32, payload: Vec<u8>) -> RtmpMessage {
        RtmpMessage {
            timestamp,
            type_id,
            stream_id,
            csid,
            payload,
        }
    }

    /// Splits this message into chunk bytes: an fmt-0 chunk carrying the
    /// full header, followed by fmt-3 continuations sharing the csid.
    pub fn to_chunks(&self, send_chunk_size: u32) -> Vec<u8> {
        let chunk_size = send_chunk_size.max(1) as usize;
        let mut out = Vec::with_capacity(self.payload.len() + self.payload.len() / chunk_size.max(1) * 16 + 32);

        let mut offset = 0usize;
        let mut first = true;

        if self.payload.is_empty() {
            out.extend_from_slice(&encode_basic_header(CHUNK_TYPE_0, self.csid));
            out.extend_from_slice(&encode_message_header(
                CHUNK_TYPE_0,
                self.timestamp,
                0,
                self.type_id,
                self.stream_id,
            ));
            if self.timestamp >= EXTENDED_TIMESTAMP_SENTINEL {
                out.extend_from_slice(&self.timestamp.to_be_bytes());
            }
            return out;
        }

        while offset < self.payload.len() {
            let end = (offset + chunk_size).min(self.payload.len());
            let fmt = if first { CHUNK_TYPE_0 } else { CHUNK_TYPE_3 };

            out.extend_from_slice(&encode_basic_header(fmt, self.csid));

            if first {
                out.extend_from_slice(&encode_message_header(
                    fmt,
                    self.timestamp,
                    self.payload.len() as u32,
                    self.type_id,
                    self.stream_id,
                ));
            }

            if self.timestamp >= EXTENDED_TIMESTAMP_SENTINEL {
                out.extend_from_slice(&self.timestamp.to_be_bytes());
            }

            out.extend_from_slice(&self.payload[offset..end]);

            offset = end;
            first = false;
        }

        out
    }
}

/// State needed to reassemble chunks into messages and to remember header
/// fields across fmt1/fmt2/fmt3 continuations, keyed by csid.
#[derive(Debug, Clone, Default)]
pub struct LastChunkState {
    pub timestamp: u32,
    pub length: u32,
    pub type_id: u8,
    pub stream_id: u32,
}

/// A message still accumulating payload bytes across multiple chunks.
#[derive(Debug)]
pub struct PartialMessage {
    pub timestamp: u32,
    pub length: usize,
    pub type_id: u8,
    pub stream_id: u32,
    pub csid: u32,
    pub payload: Vec<u8>,
}

impl PartialMessage {
    pub fn remaining(&self) -> usize {
        self.length - self.payload.len()
    }

    pub fn is_complete(&self) -> bool {
        self.payload.len() >= self.length
    }
}

/// Resolves a just-read chunk header into the (timestamp, length, type,
/// stream-id) tuple, inheriting absent fields from `last`. Updates `last`
/// in place to reflect the chunk just parsed.
pub fn resolve_header(
    fmt: u8,
    parsed: PartialMessageHeader,
    last: &mut LastChunkState,
) -> RtmpResult<(u32, u32, u8, u32)> {
    let (timestamp, length, type_id, stream_id) = match fmt & 0x03 {
        0 => {
            let timestamp = parsed.timestamp.ok_or_else(|| missing_field("timestamp"))?;
            let length = parsed.length.ok_or_else(|| missing_field("length"))?;
            let type_id = parsed.type_id.ok_or_else(|| missing_field("type"))?;
            let stream_id = parsed.stream_id.ok_or_else(|| missing_field("stream id"))?;
            (timestamp, length, type_id, stream_id)
        }
        1 => {
            let delta = parsed.timestamp.ok_or_else(|| missing_field("timestamp"))?;
            let length = parsed.length.ok_or_else(|| missing_field("length"))?;
            let type_id = parsed.type_id.ok_or_else(|| missing_field("type"))?;
            (last.timestamp.wrapping_add(delta), length, type_id, last.stream_id)
        }
        2 => {
            let delta = parsed.timestamp.ok_or_else(|| missing_field("timestamp"))?;
            (
                last.timestamp.wrapping_add(delta),
                last.length,
                last.type_id,
                last.stream_id,
            )
        }
        _ => (last.timestamp, last.length, last.type_id, last.stream_id),
    };

    last.timestamp = timestamp;
    last.length = length;
    last.type_id = type_id;
    last.stream_id = stream_id;

    Ok((timestamp, length, type_id, stream_id))
}

fn missing_field(name: &str) -> RtmpError {
    RtmpError::MalformedChunk(format!("fmt0 chunk missing {name} field"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_header_round_trips_for_each_range() {
        for csid in [2u32, 63, 64, 318, 319, 65598] {
            let encoded = encode_basic_header(0, csid);
            let extra_len = basic_header_extra_len(encoded[0] & 0x3f);
            let parsed = parse_basic_header(encoded[0], &encoded[1..1 + extra_len]);
            assert_eq!(parsed.csid, csid, "csid {csid} round-trip");
        }
    }

    #[test]
    fn split_and_reassemble_matches_scenario_s3() {
        let payload = vec![0xABu8; 300];
        let msg = RtmpMessage::new(0, 0x14, 0, 3, payload.clone());
        let bytes = msg.to_chunks(128);

        let expected_chunk_lens = [128usize, 128, 44];
        let mut pos = 0;
        let mut fmts = Vec::new();

        for (i, &chunk_len) in expected_chunk_lens.iter().enumerate() {
            let header = parse_basic_header(bytes[pos], &[]);
            fmts.push(header.fmt);
            pos += 1;
            if i == 0 {
                pos += message_header_size(header.fmt);
            }
            pos += chunk_len;
        }

        assert_eq!(fmts, vec![0, 3, 3]);
        assert_eq!(pos, bytes.len());
    }
}
