// Main

mod amf;
mod error;
mod log;
mod registry;
mod rtmp;
mod server;
mod session;
mod transport;
mod utils;

use std::sync::Arc;

use log::{LogConfig, Logger};
use registry::StreamRegistry;
use server::{run_server, RtmpServerConfiguration};
use utils::get_env_bool;

/// Main function
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load .env
    let _ = dotenvy::dotenv();

    // Initialize logger

    let logger = Logger::new(LogConfig {
        prefix: "".to_string(),
        error_enabled: get_env_bool("RTMP_LOG_ERROR_ENABLED", true),
        warning_enabled: get_env_bool("RTMP_LOG_WARNING_ENABLED", true),
        info_enabled: get_env_bool("RTMP_LOG_INFO_ENABLED", true),
        debug_enabled: get_env_bool("RTMP_LOG_DEBUG_ENABLED", false),
        trace_enabled: get_env_bool("RTMP_LOG_TRACE_ENABLED", false),
    });

    const VERSION: &str = env!("CARGO_PKG_VERSION");
    logger.log_info(&format!("RTMP relay server ({VERSION})"));

    // Load configuration

    let server_config = match RtmpServerConfiguration::load_from_env(&logger) {
        Ok(c) => Arc::new(c),
        Err(_) => {
            std::process::exit(1);
        }
    };

    // Initialize the stream registry

    let registry = Arc::new(StreamRegistry::new());

    // Run the accept loop until the process is terminated

    run_server(logger, server_config, registry).await;

    Ok(())
}
