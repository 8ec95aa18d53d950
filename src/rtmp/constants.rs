// RTMP protocol constants

/// Version byte expected in C0/sent as S0.
pub const RTMP_VERSION: u8 = 3;

/// Size in bytes of C1/S1/C2/S2.
pub const RTMP_SIG_SIZE: usize = 1536;

/// Length of a digest.
pub const SHA256_DIGEST_LENGTH: usize = 32;

/// "Genuine Adobe Flash Player 001" + 32-byte tail, used to validate/sign
/// client-side digests.
pub const GENUINE_FP_KEY: &[u8] = &[
    b'G', b'e', b'n', b'u', b'i', b'n', b'e', b' ', b'A', b'd', b'o', b'b', b'e', b' ', b'F',
    b'l', b'a', b's', b'h', b' ', b'P', b'l', b'a', b'y', b'e', b'r', b' ', b'0', b'0', b'1',
    0xf0, 0xee, 0xc2, 0x4a, 0x80, 0x68, 0xbe, 0xe8, 0x2e, 0x00, 0xd0, 0xd1, 0x02, 0x9e, 0x7e,
    0x57, 0x6e, 0xec, 0x5d, 0x2d, 0x29, 0x80, 0x6f, 0xab, 0x93, 0xb8, 0xe6, 0x36, 0xcf, 0xeb,
    0x31, 0xae,
];

/// "Genuine Adobe Flash Media Server 001" + the same 32-byte tail, used to
/// validate/sign server-side digests.
pub const GENUINE_FMS_KEY: &[u8] = &[
    b'G', b'e', b'n', b'u', b'i', b'n', b'e', b' ', b'A', b'd', b'o', b'b', b'e', b' ', b'F',
    b'l', b'a', b's', b'h', b' ', b'M', b'e', b'd', b'i', b'a', b' ', b'S', b'e', b'r', b'v',
    b'e', b'r', b' ', b'0', b'0', b'1', 0xf0, 0xee, 0xc2, 0x4a, 0x80, 0x68, 0xbe, 0xe8, 0x2e,
    0x00, 0xd0, 0xd1, 0x02, 0x9e, 0x7e, 0x57, 0x6e, 0xec, 0x5d, 0x2d, 0x29, 0x80, 0x6f, 0xab,
    0x93, 0xb8, 0xe6, 0x36, 0xcf, 0xeb, 0x31, 0xae,
];

/// Number of leading bytes of [`GENUINE_FP_KEY`] used as the HMAC key when
/// validating a client digest.
pub const CLIENT_KEY_LEN: usize = 30;

/// Number of leading bytes of [`GENUINE_FMS_KEY`] used as the HMAC key when
/// signing S1's digest.
pub const SERVER_KEY_LEN: usize = 36;

/// Number of leading bytes of [`GENUINE_FMS_KEY`] used as the HMAC key when
/// signing S2's challenge key.
pub const SERVER_FULL_KEY_LEN: usize = 68;

pub const CHUNK_TYPE_0: u8 = 0;
pub const CHUNK_TYPE_1: u8 = 1;
pub const CHUNK_TYPE_2: u8 = 2;
pub const CHUNK_TYPE_3: u8 = 3;

/// Byte length of the message header for each chunk fmt, indexed by fmt.
pub const MESSAGE_HEADER_SIZE: [usize; 4] = [11, 7, 3, 0];

pub const CHANNEL_PROTOCOL: u32 = 2;
pub const CHANNEL_INVOKE: u32 = 3;
pub const CHANNEL_AUDIO: u32 = 4;
pub const CHANNEL_VIDEO: u32 = 5;
pub const CHANNEL_DATA: u32 = 6;

pub const RTMP_TYPE_SET_CHUNK_SIZE: u8 = 0x01;
pub const RTMP_TYPE_ABORT: u8 = 0x02;
pub const RTMP_TYPE_ACKNOWLEDGEMENT: u8 = 0x03;
pub const RTMP_TYPE_USER_CONTROL: u8 = 0x04;
pub const RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE: u8 = 0x05;
pub const RTMP_TYPE_SET_PEER_BANDWIDTH: u8 = 0x06;
pub const RTMP_TYPE_AUDIO: u8 = 0x08;
pub const RTMP_TYPE_VIDEO: u8 = 0x09;
pub const RTMP_TYPE_FLEX_STREAM: u8 = 0x0f;
pub const RTMP_TYPE_FLEX_OBJECT: u8 = 0x10;
pub const RTMP_TYPE_FLEX_MESSAGE: u8 = 0x11;
pub const RTMP_TYPE_DATA: u8 = 0x12;
pub const RTMP_TYPE_SHARED_OBJECT: u8 = 0x13;
pub const RTMP_TYPE_INVOKE: u8 = 0x14;
pub const RTMP_TYPE_METADATA: u8 = 0x16;

pub const STREAM_BEGIN: u16 = 0x00;
pub const STREAM_EOF: u16 = 0x01;
pub const STREAM_IS_RECORD: u16 = 0x04;

/// Default chunk stream ids assigned to a freshly-accepted connection.
pub const DEFAULT_AUDIO_CSID: u32 = 60;
pub const DEFAULT_VIDEO_CSID: u32 = 61;
pub const DEFAULT_STREAM_CSID: u32 = 67;

pub const DEFAULT_CHUNK_SIZE: u32 = 128;
pub const MIN_CHUNK_SIZE: u32 = 128;
pub const MAX_CHUNK_SIZE: u32 = 0xFFFFFF;
pub const PLAY_CHUNK_SIZE: u32 = 512;

pub const DEFAULT_WINDOW_ACK_SIZE: u32 = 524288;
pub const DEFAULT_PEER_BANDWIDTH: u32 = 524288;

pub const DEFAULT_PORT: u16 = 19356;
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Returns the message header size, in bytes, for a basic-header fmt value.
pub fn message_header_size(fmt: u8) -> usize {
    MESSAGE_HEADER_SIZE[(fmt & 0x03) as usize]
}
