use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::court::broadcaster::spectator_session;
use crate::court::task::court_session;
use crate::error::SessionError;
use crate::messages::{ClientToServer, Code, Role, ServerToClient};
use crate::player::handlers::{host_session, invited_session};
use crate::state::ServerState;

/// Runs one accepted connection to completion.
pub async fn handle_client<S>(stream: S, peer: SocketAddr, state: Arc<ServerState>)
where
    S: AsyncRead + AsyncWrite,
{
    let mut conn = Connection::new(stream);
    let connection = conn.id();
    info!(%connection, %peer, "client connected");

    match dispatch(&mut conn, &state, peer.ip()).await {
        Ok(()) => info!(%connection, "session finished"),
        Err(SessionError::Protocol(reason)) => {
            warn!(%connection, %peer, "dropping connection: {}", reason)
        }
        Err(e) if e.is_fatal() => debug!(%connection, "client disconnected: {}", e),
        Err(e) => warn!(%connection, "session ended: {}", e),
    }
}

/// Reads the role-declaring first message and hands the connection to the
/// matching worker. Anything but `AUTH` first is dropped without a reply;
/// an `AUTH` with missing fields is answered with `NOK` before closing.
pub async fn dispatch<S>(
    conn: &mut Connection<S>,
    state: &ServerState,
    peer_ip: IpAddr,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite,
{
    let first = conn.receive().await?;
    if first.code != Code::Auth {
        return Err(SessionError::Protocol(format!(
            "expected AUTH, got {:?}",
            first.code
        )));
    }

    let role = match ClientToServer::parse(&first) {
        Ok(ClientToServer::Auth(role)) => role,
        Ok(other) => {
            return Err(SessionError::Protocol(format!("expected AUTH, got {other:?}")));
        }
        Err(SessionError::Malformed(reason)) => {
            conn.send(&ServerToClient::Nok.to_message()).await?;
            return Err(SessionError::Malformed(reason));
        }
        Err(e) => return Err(e),
    };
    debug!(connection = %conn.id(), role = %role.digit(), "authenticated");

    match role {
        Role::Host {
            last_name,
            first_name,
        } => host_session(conn, state, last_name, first_name).await,
        Role::Invited {
            last_name,
            first_name,
        } => invited_session(conn, state, last_name, first_name).await,
        Role::Court => court_session(conn, state, peer_ip).await,
        Role::Spectator => spectator_session(conn, state).await,
    }
}
