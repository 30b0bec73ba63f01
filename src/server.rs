use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::client::handle_client;
use crate::state::ServerState;

/// Accept loop: one task per connection until `shutdown` resolves. Workers
/// already running are left to finish on their own.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<ServerState>,
    keepalive: Duration,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutting down, listener closed");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, peer)) => {
                        configure_keepalive(&socket, keepalive);
                        tokio::spawn(handle_client(socket, peer, state.clone()));
                    }
                    Err(e) => error!("accept failed: {}", e),
                }
            }
        }
    }
}

fn configure_keepalive(socket: &TcpStream, time: Duration) {
    let keepalive = TcpKeepalive::new()
        .with_time(time)
        .with_interval(Duration::from_secs(1));
    if let Err(e) = SockRef::from(socket).set_tcp_keepalive(&keepalive) {
        warn!("could not enable keep-alive: {}", e);
    }
}
