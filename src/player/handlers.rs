use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::registry::{Player, PlayerHandle, PlayerId};
use crate::connection::Connection;
use crate::error::SessionError;
use crate::matchmaking;
use crate::messages::{ClientToServer, InviteAnswer, PlayerCommand, ServerToClient};
use crate::state::ServerState;

/// Hosting player: lists partners and invites them one at a time until an
/// invitation is accepted, then reports the court placement and ends.
pub async fn host_session<S>(
    conn: &mut Connection<S>,
    state: &ServerState,
    last_name: String,
    first_name: String,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite,
{
    let (handle, mut commands) = PlayerHandle::new(conn.id());
    let host = Player {
        id: state.players.next_id(),
        first_name,
        last_name,
        connection: handle,
    };
    info!(host_id = host.id, name = %format!("{} {}", host.first_name, host.last_name), "host joined");
    conn.send(&ServerToClient::Ok.to_message()).await?;

    loop {
        let message = conn.receive().await?;
        let reply = match ClientToServer::parse(&message) {
            Ok(ClientToServer::AskPlayers) => ServerToClient::ListPlayers {
                players: matchmaking::list_available_partners(&state.players, host.id).await,
            },
            Ok(ClientToServer::PlayWith { player_id }) => {
                match matchmaking::invite(&state.players, &host, player_id).await {
                    Ok(partner) => {
                        conn.send(&ServerToClient::Ok.to_message()).await?;
                        // Both players hear about the outcome through their handles.
                        let _ = matchmaking::place(&state.courts, host.clone(), partner).await;
                        let placement = next_placement(&mut commands).await?;
                        conn.send(&placement.to_message()).await?;
                        return Ok(());
                    }
                    Err(e) => {
                        debug!(host_id = host.id, "{}", e);
                        ServerToClient::Nok
                    }
                }
            }
            Ok(other) => {
                warn!(host_id = host.id, "unexpected request from host: {:?}", other);
                ServerToClient::Nok
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                debug!(host_id = host.id, "{}", e);
                ServerToClient::Nok
            }
        };
        conn.send(&reply.to_message()).await?;
    }
}

async fn next_placement(
    commands: &mut mpsc::UnboundedReceiver<PlayerCommand>,
) -> Result<ServerToClient, SessionError> {
    while let Some(command) = commands.recv().await {
        match command {
            PlayerCommand::Placement(placement) => return Ok(placement),
            // Hosts are never listed, so nobody should be inviting one.
            PlayerCommand::Invite { reply_tx, .. } => {
                let _ = reply_tx.send(InviteAnswer::Declined);
            }
        }
    }
    Err(SessionError::Disconnected)
}

/// Invited player: registers, reports its id, then answers invitations
/// relayed by hosts until it is placed or its connection drops.
pub async fn invited_session<S>(
    conn: &mut Connection<S>,
    state: &ServerState,
    last_name: String,
    first_name: String,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite,
{
    let (handle, mut commands) = PlayerHandle::new(conn.id());
    conn.send(&ServerToClient::Ok.to_message()).await?;
    let player_id = state.players.register(first_name, last_name, handle).await;
    let waiting = state.players.len().await;
    info!(player_id, connection = %conn.id(), waiting, "player waiting for invitations");

    let result = wait_for_match(conn, state, player_id, &mut commands).await;

    // No-op once the player accepted an invitation.
    if state.players.unregister(player_id).await.is_some() {
        let waiting = state.players.len().await;
        info!(player_id, waiting, "idle player left");
    }
    result
}

async fn wait_for_match<S>(
    conn: &mut Connection<S>,
    state: &ServerState,
    player_id: PlayerId,
    commands: &mut mpsc::UnboundedReceiver<PlayerCommand>,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite,
{
    conn.send(&ServerToClient::InfoPlayer { player_id }.to_message())
        .await?;
    let mut paired = false;

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    // Only reachable once paired: the host side dropped our record.
                    warn!(player_id, "inviter went away after acceptance");
                    conn.send(&ServerToClient::Nok.to_message()).await?;
                    return Ok(());
                };
                match command {
                    PlayerCommand::Invite { reply_tx, .. } if paired => {
                        let _ = reply_tx.send(InviteAnswer::Declined);
                    }
                    PlayerCommand::Invite { invitation, reply_tx } => {
                        paired = relay_invitation(conn, state, player_id, invitation, reply_tx).await?;
                    }
                    PlayerCommand::Placement(placement) => {
                        conn.send(&placement.to_message()).await?;
                        info!(player_id, "placement delivered, closing");
                        return Ok(());
                    }
                }
            }
            incoming = conn.receive() => {
                let message = incoming?;
                debug!(player_id, "unsolicited {:?} from waiting player", message.code);
                conn.send(&ServerToClient::Nok.to_message()).await?;
            }
        }
    }
}

/// Forwards one invitation and reports the answer to the inviting host.
/// Returns whether the player is now paired.
async fn relay_invitation<S>(
    conn: &mut Connection<S>,
    state: &ServerState,
    player_id: PlayerId,
    invitation: ServerToClient,
    reply_tx: oneshot::Sender<InviteAnswer>,
) -> Result<bool, SessionError>
where
    S: AsyncRead + AsyncWrite,
{
    let answer = conn.request(&invitation.to_message()).await?;
    if !matches!(ClientToServer::parse(&answer), Ok(ClientToServer::Accept)) {
        debug!(player_id, "invitation declined");
        let _ = reply_tx.send(InviteAnswer::Declined);
        return Ok(false);
    }

    let Some(me) = state.players.unregister(player_id).await else {
        let _ = reply_tx.send(InviteAnswer::Declined);
        return Ok(false);
    };
    if reply_tx.send(InviteAnswer::Accepted(me)).is_err() {
        warn!(player_id, "inviter went away after acceptance");
        conn.send(&ServerToClient::Nok.to_message()).await?;
        return Err(SessionError::Disconnected);
    }
    Ok(true)
}
