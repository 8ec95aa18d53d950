// Named stream: one publisher, N receivers, a cached initial video tag

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, Mutex};

use crate::log::Logger;
use crate::rtmp::chunk::RtmpMessage;
use crate::rtmp::constants::RTMP_TYPE_VIDEO;
use crate::transport::write_bytes;

/// Capacity of a receiver's outbound AV queue. A full queue makes the
/// publisher's broadcast stall, which is the intended backpressure story.
pub const RECEIVER_QUEUE_CAPACITY: usize = 8;

pub struct ReceiverEntry {
    pub id: u64,
    pub sender: mpsc::Sender<RtmpMessage>,
    pub shutdown: mpsc::Sender<()>,
}

/// A named stream: `"{app}/{name}"` keyed, holding at most one publisher and
/// an ordered list of receivers.
pub struct Stream {
    pub publisher_id: Option<u64>,
    pub receivers: Vec<ReceiverEntry>,
    pub tag: Option<RtmpMessage>,
    /// Running accumulator added to every incoming timestamp and then used,
    /// unmodified, as the outgoing timestamp. Reproduces the source's
    /// timestamp-accumulation behavior faithfully (see DESIGN.md).
    pub total_time: u32,
}

impl Stream {
    fn new() -> Stream {
        Stream {
            publisher_id: None,
            receivers: Vec::new(),
            tag: None,
            total_time: 0,
        }
    }
}

/// Process-wide `stream-name -> Stream` map, guarded by a single mutex.
pub struct StreamRegistry {
    streams: Mutex<HashMap<String, Arc<Mutex<Stream>>>>,
}

impl StreamRegistry {
    pub fn new() -> StreamRegistry {
        StreamRegistry {
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the stream for `name`, creating an empty one on first reference.
    pub async fn get_or_create(&self, name: &str) -> Arc<Mutex<Stream>> {
        let mut streams = self.streams.lock().await;
        streams
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Stream::new())))
            .clone()
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Attempts to register `publisher_id` as the stream's sole publisher.
/// Returns false if another publisher already holds the stream.
pub async fn add_publisher(stream: &Arc<Mutex<Stream>>, publisher_id: u64) -> bool {
    let mut stream_v = stream.lock().await;
    if stream_v.publisher_id.is_some() {
        return false;
    }
    stream_v.publisher_id = Some(publisher_id);
    true
}

/// Removes the publisher if it matches `publisher_id`, and signals every
/// receiver's delivery task to shut down (publisher disconnect closes all
/// receivers on the stream).
pub async fn remove_publisher(stream: &Arc<Mutex<Stream>>, publisher_id: u64) {
    let mut stream_v = stream.lock().await;
    if stream_v.publisher_id != Some(publisher_id) {
        return;
    }
    stream_v.publisher_id = None;
    stream_v.tag = None;
    stream_v.total_time = 0;

    for receiver in &stream_v.receivers {
        let _ = receiver.shutdown.try_send(());
    }
    stream_v.receivers.clear();
}

/// Forcibly clears the stream's publisher and receiver slots, signalling
/// every receiver's delivery task to shut down. Used by `releaseStream`
/// to free up a stream name for a new publisher.
pub async fn close_all(stream: &Arc<Mutex<Stream>>) {
    let mut stream_v = stream.lock().await;
    stream_v.publisher_id = None;
    stream_v.tag = None;
    stream_v.total_time = 0;

    for receiver in &stream_v.receivers {
        let _ = receiver.shutdown.try_send(());
    }
    stream_v.receivers.clear();
}

pub async fn add_receiver(stream: &Arc<Mutex<Stream>>, entry: ReceiverEntry) {
    let mut stream_v = stream.lock().await;
    stream_v.receivers.push(entry);
}

/// Removes only the matching receiver; other receivers and the publisher
/// are unaffected.
pub async fn remove_receiver(stream: &Arc<Mutex<Stream>>, receiver_id: u64) {
    let mut stream_v = stream.lock().await;
    stream_v.receivers.retain(|r| r.id != receiver_id);
}

/// Publish path: advances the stream's running timestamp accumulator,
/// overwrites the outgoing message's timestamp with the accumulated value
/// (see DESIGN.md — reproduced faithfully, not a redesign), then either
/// caches the message as the stream's initial tag or fans it out to every
/// receiver.
///
/// Holding the stream lock across every receiver send is deliberate: a slow
/// receiver's full queue stalls this call, which stalls the publisher's
/// read loop and every other receiver of the same stream.
pub async fn broadcast_av_message(stream: &Arc<Mutex<Stream>>, mut msg: RtmpMessage) {
    let mut stream_v = stream.lock().await;

    stream_v.total_time = stream_v.total_time.wrapping_add(msg.timestamp);
    msg.timestamp = stream_v.total_time;

    let is_video = msg.type_id == RTMP_TYPE_VIDEO;

    if stream_v.tag.is_none() && is_video {
        stream_v.tag = Some(msg.clone());
        return;
    }

    for receiver in &stream_v.receivers {
        let _ = receiver.sender.send(msg.clone()).await;
    }
}

fn is_video_keyframe(payload: &[u8]) -> bool {
    match payload.first() {
        Some(byte) => matches!(byte >> 4, 1 | 4),
        None => false,
    }
}

/// Spawns the per-receiver delivery task: drains the AV queue, applies the
/// first-keyframe gate, and writes chunked bytes to the receiver's own
/// transport. Stops on an idempotent out-of-band shutdown signal or when the
/// AV channel closes.
#[allow(clippy::too_many_arguments)]
pub fn spawn_receiver_delivery_task<TW>(
    write_stream: Arc<Mutex<TW>>,
    stream: Arc<Mutex<Stream>>,
    video_csid: u32,
    audio_csid: u32,
    send_chunk_size: u32,
    mut av_receiver: mpsc::Receiver<RtmpMessage>,
    mut shutdown_receiver: mpsc::Receiver<()>,
    logger: Arc<Logger>,
) where
    TW: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut is_begin = false;
        let mut begin_time: u32 = 0;

        loop {
            let msg = tokio::select! {
                _ = shutdown_receiver.recv() => break,
                received = av_receiver.recv() => match received {
                    Some(msg) => msg,
                    None => break,
                },
            };

            if let Err(e) = deliver_av_message(
                &write_stream,
                &stream,
                &mut is_begin,
                &mut begin_time,
                video_csid,
                audio_csid,
                send_chunk_size,
                msg,
            )
            .await
            {
                logger.log_debug(&format!("Receiver delivery stopped: {e}"));
                break;
            }
        }
    });
}

#[allow(clippy::too_many_arguments)]
async fn deliver_av_message<TW>(
    write_stream: &Arc<Mutex<TW>>,
    stream: &Arc<Mutex<Stream>>,
    is_begin: &mut bool,
    begin_time: &mut u32,
    video_csid: u32,
    audio_csid: u32,
    send_chunk_size: u32,
    msg: RtmpMessage,
) -> crate::error::RtmpResult<()>
where
    TW: AsyncWrite + Unpin,
{
    let is_video = msg.type_id == RTMP_TYPE_VIDEO;

    if !*is_begin {
        let passes_gate = is_video && is_video_keyframe(&msg.payload);
        if !passes_gate {
            return Ok(());
        }

        let tag = {
            let stream_v = stream.lock().await;
            stream_v.tag.clone()
        };

        if let Some(mut tag) = tag {
            tag.timestamp = 0;
            tag.csid = video_csid;
            write_bytes(write_stream, &tag.to_chunks(send_chunk_size)).await?;
        }

        *is_begin = true;
        *begin_time = msg.timestamp;
    }

    let mut out = msg;
    out.csid = if is_video { video_csid } else { audio_csid };
    out.timestamp = out.timestamp.wrapping_sub(*begin_time);
    write_bytes(write_stream, &out.to_chunks(send_chunk_size)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtmp::constants::RTMP_TYPE_AUDIO;

    fn video_message(timestamp: u32, keyframe: bool) -> RtmpMessage {
        let first_byte = if keyframe { 0x17 } else { 0x27 };
        RtmpMessage::new(timestamp, RTMP_TYPE_VIDEO, 1, 5, vec![first_byte, 0, 0, 0])
    }

    fn audio_message(timestamp: u32) -> RtmpMessage {
        RtmpMessage::new(timestamp, RTMP_TYPE_AUDIO, 1, 4, vec![0xaf, 0x01])
    }

    #[tokio::test]
    async fn broadcast_caches_first_video_frame_as_tag() {
        let stream = Arc::new(Mutex::new(Stream::new()));
        broadcast_av_message(&stream, video_message(10, true)).await;

        let stream_v = stream.lock().await;
        assert!(stream_v.tag.is_some());
        assert!(stream_v.receivers.is_empty() || true);
    }

    #[tokio::test]
    async fn broadcast_accumulates_timestamp_onto_outgoing_messages() {
        let stream = Arc::new(Mutex::new(Stream::new()));
        // First video frame becomes the tag (consumes ts=10 into total_time).
        broadcast_av_message(&stream, video_message(10, true)).await;

        let (tx, mut rx) = mpsc::channel(RECEIVER_QUEUE_CAPACITY);
        add_receiver(
            &stream,
            ReceiverEntry {
                id: 1,
                sender: tx,
                shutdown: mpsc::channel(1).0,
            },
        )
        .await;

        broadcast_av_message(&stream, audio_message(5)).await;
        let forwarded = rx.recv().await.unwrap();
        // total_time was 10, + 5 = 15, and that accumulated value overwrites ts.
        assert_eq!(forwarded.timestamp, 15);
    }

    #[tokio::test]
    async fn keyframe_gate_drops_audio_before_first_keyframe() {
        let stream = Arc::new(Mutex::new(Stream::new()));
        let write_stream = Arc::new(Mutex::new(Vec::<u8>::new()));
        let mut is_begin = false;
        let mut begin_time = 0u32;

        deliver_av_message(
            &write_stream,
            &stream,
            &mut is_begin,
            &mut begin_time,
            60,
            61,
            128,
            audio_message(3),
        )
        .await
        .unwrap();

        assert!(!is_begin);
        assert!(write_stream.lock().await.is_empty());
    }

    #[tokio::test]
    async fn keyframe_gate_opens_on_first_keyframe_and_double_sends() {
        let stream = Arc::new(Mutex::new(Stream::new()));
        stream.lock().await.tag = Some(video_message(999, true));

        let write_stream = Arc::new(Mutex::new(Vec::<u8>::new()));
        let mut is_begin = false;
        let mut begin_time = 0u32;

        deliver_av_message(
            &write_stream,
            &stream,
            &mut is_begin,
            &mut begin_time,
            60,
            61,
            128,
            video_message(42, true),
        )
        .await
        .unwrap();

        assert!(is_begin);
        assert_eq!(begin_time, 42);
        // Both the tag and the triggering live frame were written.
        assert!(!write_stream.lock().await.is_empty());
    }
}
