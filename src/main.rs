use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use courtside::config::{ServerArgs, ServerConfig};
use courtside::logging;
use courtside::server;
use courtside::state::ServerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from(ServerArgs::parse());
    logging::init();

    let listener = TcpListener::bind(config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    println!("Listening on port {}", local_addr.port());
    info!(%local_addr, poll_interval = ?config.session.poll_interval, "server started");

    let state = Arc::new(ServerState::new(config.session));
    server::serve(listener, state, config.keepalive, shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("could not listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
