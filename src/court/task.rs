use std::net::{IpAddr, SocketAddr};

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use super::registry::CourtId;
use super::score::PointOutcome;
use crate::connection::Connection;
use crate::error::SessionError;
use crate::messages::{ClientToServer, ServerToClient};
use crate::state::ServerState;

/// Court onboarding: acknowledge the role, wait for the listen port,
/// register the court, then apply its score reports until it disconnects.
pub async fn court_session<S>(
    conn: &mut Connection<S>,
    state: &ServerState,
    peer_ip: IpAddr,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite,
{
    conn.send(&ServerToClient::Ok.to_message()).await?;

    let port = match ClientToServer::parse(&conn.receive().await?)? {
        ClientToServer::ListenPort { port } => port,
        other => {
            return Err(SessionError::Protocol(format!(
                "expected LISTEN_PORT, got {other:?}"
            )));
        }
    };

    let endpoint = SocketAddr::new(peer_ip, port);
    let court_id = state.courts.register(endpoint, conn.id()).await;
    conn.send(&ServerToClient::CourtRegistered { court_id }.to_message())
        .await?;

    let result = score_reports(conn, state, court_id).await;

    info!(court_id, "court disconnected");
    if let Err(e) = state.courts.set_offline(court_id).await {
        warn!(court_id, "could not retire court: {}", e);
    }
    result
}

async fn score_reports<S>(
    conn: &mut Connection<S>,
    state: &ServerState,
    court_id: CourtId,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite,
{
    loop {
        let message = conn.receive().await?;
        let reply = match ClientToServer::parse(&message) {
            Ok(ClientToServer::IncrementScore { side }) => {
                match state.courts.increment_score(court_id, side).await {
                    Ok((_, PointOutcome::Match)) => ServerToClient::EndMatch,
                    Ok((score, outcome)) => {
                        debug!(court_id, ?side, ?outcome, %score, "point awarded");
                        ServerToClient::Ok
                    }
                    Err(SessionError::MatchFinished(_)) => ServerToClient::EndMatch,
                    Err(e) => {
                        warn!(court_id, "increment rejected: {}", e);
                        ServerToClient::Nok
                    }
                }
            }
            Ok(ClientToServer::Score { snapshot }) => {
                match state.courts.apply_score_update(court_id, &snapshot).await {
                    Ok(score) if score.is_finished() => ServerToClient::EndMatch,
                    Ok(score) => {
                        debug!(court_id, %score, "score reported");
                        ServerToClient::Ok
                    }
                    Err(SessionError::MatchFinished(_)) => ServerToClient::EndMatch,
                    Err(e) => {
                        warn!(court_id, "score update rejected: {}", e);
                        ServerToClient::Nok
                    }
                }
            }
            Ok(ClientToServer::AbandonMatch) => match state.courts.release(court_id).await {
                Ok(()) => {
                    info!(court_id, "match abandoned, court back in the pool");
                    ServerToClient::Ok
                }
                Err(e) => {
                    warn!(court_id, "could not release court: {}", e);
                    ServerToClient::Nok
                }
            },
            Ok(other) => {
                warn!(court_id, "unexpected request from court: {:?}", other);
                ServerToClient::Nok
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(court_id, "{}", e);
                ServerToClient::Nok
            }
        };
        conn.send(&reply.to_message()).await?;
    }
}
