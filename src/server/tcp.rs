// TCP accept loop

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::log::Logger;
use crate::registry::StreamRegistry;
use crate::server::config::RtmpServerConfiguration;
use crate::server::session_id_generator::SessionIdGenerator;
use crate::session::handle_connection;

/// Binds the configured address and spawns one connection task per accepted
/// socket until the process is terminated.
pub async fn run_server(
    logger: Logger,
    config: Arc<RtmpServerConfiguration>,
    registry: Arc<StreamRegistry>,
) {
    let logger = Arc::new(logger);
    let bind_addr = format!("{}:{}", config.bind_address, config.port);

    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            logger.log_error(&format!("failed to bind {bind_addr}: {e}"));
            return;
        }
    };

    logger.log_info(&format!("listening on {bind_addr}"));

    let mut session_ids = SessionIdGenerator::new();

    loop {
        let (socket, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                logger.log_warning(&format!("accept failed: {e}"));
                continue;
            }
        };

        let session_id = session_ids.generate_id();
        let conn_logger = Arc::new(logger.make_child_logger(&format!("[#{session_id}] ")));

        if config.log_requests {
            conn_logger.log_info(&format!("connection accepted from {peer_addr}"));
        }

        let config = config.clone();
        let registry = registry.clone();

        tokio::spawn(async move {
            handle_connection(socket, session_id, config, registry, conn_logger).await;
        });
    }
}
