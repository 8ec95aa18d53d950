// RTMP protocol layer: constants, handshake, chunk framing, commands, message builders

pub mod chunk;
pub mod command;
pub mod constants;
pub mod handshake;
pub mod messages;

pub use chunk::*;
pub use command::*;
pub use constants::*;
pub use handshake::*;
pub use messages::*;
