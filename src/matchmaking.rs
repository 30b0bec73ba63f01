//! Pairing of a hosting player with a registered one, then court placement.
//!
//! The host's worker drives the whole exchange. The invitee is reached only
//! through its connection handle; its own worker owns the socket, asks the
//! question and answers on a oneshot channel.

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::court::registry::{CourtId, CourtRegistry};
use crate::error::SessionError;
use crate::messages::{InviteAnswer, PlayerCommand, PlayerEntry, ServerToClient};
use crate::player::registry::{Player, PlayerHandle, PlayerId, PlayerRegistry};

/// Everyone the host could invite, in ascending id order.
pub async fn list_available_partners(
    players: &PlayerRegistry,
    host_id: PlayerId,
) -> Vec<PlayerEntry> {
    players
        .list_all()
        .await
        .iter()
        .filter(|player| player.id != host_id)
        .map(PlayerEntry::from)
        .collect()
}

/// Invites `target_id` on behalf of `host` and waits for the answer.
///
/// On acceptance the invitee has already left the registry and its record
/// is returned. There is no timeout: a silent invitee stalls the host.
pub async fn invite(
    players: &PlayerRegistry,
    host: &Player,
    target_id: PlayerId,
) -> Result<Player, SessionError> {
    let target = players
        .find(target_id)
        .await
        .ok_or(SessionError::PlayerNotFound(target_id))?;

    let (reply_tx, reply_rx) = oneshot::channel();
    target
        .connection
        .send(PlayerCommand::Invite {
            invitation: ServerToClient::invite_from(host),
            reply_tx,
        })
        .map_err(|_| SessionError::PlayerNotFound(target_id))?;
    debug!(host_id = host.id, target_id, "invitation sent");

    match reply_rx.await {
        Ok(InviteAnswer::Accepted(partner)) => {
            info!(host_id = host.id, partner_id = partner.id, "invitation accepted");
            Ok(partner)
        }
        Ok(InviteAnswer::Declined) => Err(SessionError::InvitationDeclined(target_id)),
        // The invitee's worker ended before answering.
        Err(_) => Err(SessionError::PlayerNotFound(target_id)),
    }
}

/// Reserves a court for the pair and tells both players where to go, or
/// sends both `NOK` when every court is taken. Neither player is put back
/// in the registry.
pub async fn place(
    courts: &CourtRegistry,
    host: Player,
    partner: Player,
) -> Result<CourtId, SessionError> {
    let handles = [host.connection.clone(), partner.connection.clone()];
    let (host_id, partner_id) = (host.id, partner.id);

    match courts.reserve(host, partner).await {
        Ok(court) => {
            info!(court_id = court.id, host_id, partner_id, "match placed");
            notify(
                &handles,
                ServerToClient::CourtFound {
                    endpoint: court.endpoint,
                },
            );
            Ok(court.id)
        }
        Err(e) => {
            warn!(host_id, partner_id, "could not place match: {}", e);
            notify(&handles, ServerToClient::Nok);
            Err(e)
        }
    }
}

fn notify(handles: &[PlayerHandle], placement: ServerToClient) {
    for handle in handles {
        if handle
            .send(PlayerCommand::Placement(placement.clone()))
            .is_err()
        {
            debug!(connection = %handle.connection_id, "player left before placement");
        }
    }
}
