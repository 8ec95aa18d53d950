// Builders for the protocol-control and command-response messages the server sends

use crate::amf::AmfValue;
use crate::rtmp::chunk::RtmpMessage;
use crate::rtmp::command::RtmpCommand;
use crate::rtmp::constants::{
    CHANNEL_INVOKE, CHANNEL_PROTOCOL, RTMP_TYPE_ACKNOWLEDGEMENT, RTMP_TYPE_INVOKE,
    RTMP_TYPE_SET_CHUNK_SIZE, RTMP_TYPE_SET_PEER_BANDWIDTH, RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE,
};

pub fn make_window_ack_message(size: u32) -> RtmpMessage {
    RtmpMessage::new(
        0,
        RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE,
        0,
        CHANNEL_PROTOCOL,
        size.to_be_bytes().to_vec(),
    )
}

pub fn make_ack_message(total_received: u32) -> RtmpMessage {
    RtmpMessage::new(
        0,
        RTMP_TYPE_ACKNOWLEDGEMENT,
        0,
        CHANNEL_PROTOCOL,
        total_received.to_be_bytes().to_vec(),
    )
}

/// `limit_type`: 0 = hard, 1 = soft, 2 = dynamic.
pub fn make_peer_bandwidth_message(size: u32, limit_type: u8) -> RtmpMessage {
    let mut payload = size.to_be_bytes().to_vec();
    payload.push(limit_type);
    RtmpMessage::new(0, RTMP_TYPE_SET_PEER_BANDWIDTH, 0, CHANNEL_PROTOCOL, payload)
}

pub fn make_chunk_size_message(size: u32) -> RtmpMessage {
    RtmpMessage::new(
        0,
        RTMP_TYPE_SET_CHUNK_SIZE,
        0,
        CHANNEL_PROTOCOL,
        size.to_be_bytes().to_vec(),
    )
}

/// Builds the raw 18-byte Stream-Begin / Stream-Is-Record user control
/// message directly, rather than through the generic chunk encoder: it is a
/// single fixed-shape fmt-0 chunk on the protocol channel (csid 2), type 4
/// (user control), 6-byte payload of `event:u16` followed by `stream_id:u32`,
/// both big-endian.
pub fn make_stream_status_message(event: u16, stream_id: u32) -> Vec<u8> {
    let mut out = vec![0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x06, 0x04, 0x00, 0x00, 0x00, 0x00];
    out.extend_from_slice(&event.to_be_bytes());
    out.extend_from_slice(&stream_id.to_be_bytes());
    out
}

pub fn make_connect_response(transaction_id: f64, object_encoding: Option<f64>) -> RtmpMessage {
    let cmd_obj = AmfValue::object(vec![
        ("fmsVer", AmfValue::string("FMS/3,0,1,123")),
        ("capabilities", AmfValue::Number(31.0)),
    ]);

    let mut info_pairs = vec![
        ("level".to_string(), AmfValue::string("status")),
        ("code".to_string(), AmfValue::string("NetConnection.Connect.Success")),
        ("description".to_string(), AmfValue::string("Connection succeeded.")),
    ];
    if let Some(encoding) = object_encoding {
        info_pairs.push(("objectEncoding".to_string(), AmfValue::Number(encoding)));
    }
    let info = AmfValue::Object(info_pairs);

    let cmd = RtmpCommand::new("_result", transaction_id, cmd_obj).with_args(info);
    RtmpMessage::new(0, RTMP_TYPE_INVOKE, 0, CHANNEL_INVOKE, cmd.encode())
}

pub fn make_create_stream_response(transaction_id: f64, stream_id_value: f64) -> RtmpMessage {
    let cmd = RtmpCommand::new("_result", transaction_id, AmfValue::Null)
        .with_args(AmfValue::Number(stream_id_value));
    RtmpMessage::new(0, RTMP_TYPE_INVOKE, 0, CHANNEL_INVOKE, cmd.encode())
}

pub fn make_publish_start_status(publish_stream_id: u32) -> RtmpMessage {
    let info = AmfValue::object(vec![
        ("level", AmfValue::string("status")),
        ("clientid", AmfValue::Number(1.0)),
        ("code", AmfValue::string("NetStream.Publish.Start")),
    ]);
    let cmd = RtmpCommand::new("onStatus", 0.0, AmfValue::Null).with_args(info);
    RtmpMessage::new(0, RTMP_TYPE_INVOKE, publish_stream_id, CHANNEL_INVOKE, cmd.encode())
}

pub fn make_play_status(stream_id: u32, code: &str, description: &str) -> RtmpMessage {
    let info = AmfValue::object(vec![
        ("level", AmfValue::string("status")),
        ("code", AmfValue::string(code)),
        ("description", AmfValue::string(description)),
    ]);
    let cmd = RtmpCommand::new("onStatus", 0.0, AmfValue::Null).with_args(info);
    RtmpMessage::new(0, RTMP_TYPE_INVOKE, stream_id, CHANNEL_INVOKE, cmd.encode())
}
