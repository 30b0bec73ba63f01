use tokio::sync::oneshot;

use crate::player::registry::Player;

use super::ServerToClient;

/// Commands delivered to a player's worker through its connection handle.
#[derive(Debug)]
pub enum PlayerCommand {
    /// Forward an invitation and report the answer.
    Invite {
        invitation: ServerToClient,
        reply_tx: oneshot::Sender<InviteAnswer>,
    },
    /// Final matchmaking outcome (`COURT_FOUND` or `NOK`); the worker ends after delivering it.
    Placement(ServerToClient),
}

#[derive(Debug)]
pub enum InviteAnswer {
    /// The invitee accepted and left the registry; its record now belongs to the match.
    Accepted(Player),
    Declined,
}
