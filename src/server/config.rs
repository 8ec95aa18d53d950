// Server configuration, loaded once from the environment at startup

use crate::log::Logger;
use crate::rtmp::constants::{
    DEFAULT_BIND_ADDRESS, DEFAULT_CHUNK_SIZE, DEFAULT_PORT, DEFAULT_WINDOW_ACK_SIZE, MAX_CHUNK_SIZE,
    MIN_CHUNK_SIZE,
};
use crate::utils::{get_env_bool, get_env_string, get_env_u32};

/// Server-wide configuration, read once from the environment at startup.
/// Invalid values fail startup rather than being silently clamped.
pub struct RtmpServerConfiguration {
    pub port: u16,
    pub bind_address: String,
    pub chunk_size: u32,
    pub window_ack_size: u32,
    pub log_requests: bool,
}

impl RtmpServerConfiguration {
    pub fn load_from_env(logger: &Logger) -> Result<RtmpServerConfiguration, ()> {
        let port = get_env_u32("RTMP_PORT", DEFAULT_PORT as u32);
        if port == 0 || port > u16::MAX as u32 {
            logger.log_error(&format!("RTMP_PORT is out of range: {port}"));
            return Err(());
        }

        let bind_address = get_env_string("RTMP_BIND_ADDRESS", DEFAULT_BIND_ADDRESS);

        let chunk_size = get_env_u32("RTMP_CHUNK_SIZE", DEFAULT_CHUNK_SIZE);
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            logger.log_error(&format!(
                "RTMP_CHUNK_SIZE must be between {MIN_CHUNK_SIZE} and {MAX_CHUNK_SIZE}, got {chunk_size}"
            ));
            return Err(());
        }

        let window_ack_size = get_env_u32("RTMP_WINDOW_ACK_SIZE", DEFAULT_WINDOW_ACK_SIZE);
        if window_ack_size == 0 {
            logger.log_error("RTMP_WINDOW_ACK_SIZE must be greater than zero");
            return Err(());
        }

        let log_requests = get_env_bool("RTMP_LOG_REQUESTS", true);

        Ok(RtmpServerConfiguration {
            port: port as u16,
            bind_address,
            chunk_size,
            window_ack_size,
            log_requests,
        })
    }
}
