// Per-connection protocol state

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::registry::Stream;
use crate::rtmp::chunk::{LastChunkState, PartialMessage};
use crate::rtmp::constants::{
    DEFAULT_AUDIO_CSID, DEFAULT_CHUNK_SIZE, DEFAULT_STREAM_CSID, DEFAULT_VIDEO_CSID,
    DEFAULT_WINDOW_ACK_SIZE,
};
use tokio::sync::Mutex as AsyncMutex;

/// A stream this connection has joined, plus enough to deregister cleanly.
pub struct JoinedStream {
    pub name: String,
    pub stream: Arc<AsyncMutex<Stream>>,
}

/// Everything a connection's receive-loop task needs to track between reads.
pub struct SessionStatus {
    pub session_id: u64,

    pub recv_chunk_size: u32,
    pub send_chunk_size: u32,

    pub recv_window_ack_size: u32,
    pub peer_window_ack_size: u32,
    pub peer_bandwidth: u32,
    pub peer_bandwidth_limit_type: u8,

    /// Bytes seen since the last ACK was sent; reset whenever an ACK fires.
    pub ack_seq: u32,
    pub total_received: u32,

    pub last_chunk: HashMap<u32, LastChunkState>,
    pub partial: HashMap<u32, PartialMessage>,

    pub audio_csid: u32,
    pub video_csid: u32,
    /// Also doubles as the connection's `createStream`/`play` stream id
    /// (see `next_create_stream_id`): the Go ground truth uses one field,
    /// `StreamID`, for both roles, defaulting to 67.
    pub stream_csid: u32,

    pub app_name: Option<String>,
    pub stream_name: Option<String>,

    /// `createStream`'s one-shot return-value flip: the first call answers
    /// with `stream_csid - 1`, every later call answers with `stream_csid`.
    pub create_stream_called: bool,

    pub publishing: Option<JoinedStream>,
    pub playing: Option<JoinedStream>,

    /// Command channel that stops this connection's receiver delivery task,
    /// set only once the connection has transitioned into the play state.
    pub delivery_shutdown: Option<mpsc::Sender<()>>,

    pub closing: bool,
}

impl SessionStatus {
    pub fn new(session_id: u64) -> SessionStatus {
        SessionStatus {
            session_id,
            recv_chunk_size: DEFAULT_CHUNK_SIZE,
            send_chunk_size: DEFAULT_CHUNK_SIZE,
            recv_window_ack_size: DEFAULT_WINDOW_ACK_SIZE,
            peer_window_ack_size: DEFAULT_WINDOW_ACK_SIZE,
            peer_bandwidth: DEFAULT_WINDOW_ACK_SIZE,
            peer_bandwidth_limit_type: 2,
            ack_seq: 0,
            total_received: 0,
            last_chunk: HashMap::new(),
            partial: HashMap::new(),
            audio_csid: DEFAULT_AUDIO_CSID,
            video_csid: DEFAULT_VIDEO_CSID,
            stream_csid: DEFAULT_STREAM_CSID,
            app_name: None,
            stream_name: None,
            create_stream_called: false,
            publishing: None,
            playing: None,
            delivery_shutdown: None,
            closing: false,
        }
    }

    /// Advances the byte-accounting counter by `n`. Returns `Some(total)` if
    /// this crossed the window-ack threshold and a type-3 ACK should be sent,
    /// resetting the counter as a side effect.
    pub fn account_bytes(&mut self, n: u32) -> Option<u32> {
        self.ack_seq = self.ack_seq.wrapping_add(n);
        self.total_received = self.total_received.wrapping_add(n);

        if self.ack_seq >= self.recv_window_ack_size {
            self.ack_seq = 0;
            Some(self.total_received)
        } else {
            None
        }
    }

    /// Returns the stream id to answer a `createStream` call with, advancing
    /// the one-shot flag per call.
    pub fn next_create_stream_id(&mut self) -> u32 {
        if !self.create_stream_called {
            self.create_stream_called = true;
            self.stream_csid.wrapping_sub(1)
        } else {
            self.stream_csid
        }
    }
}
