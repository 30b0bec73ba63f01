use std::net::SocketAddr;

use crate::court::registry::CourtId;
use crate::player::registry::{Player, PlayerId};

use super::{Code, Message};

/// Replies and notifications the server sends to its peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerToClient {
    Ok,
    /// OK carrying the id of a newly registered court.
    CourtRegistered { court_id: CourtId },
    Nok,
    Score { snapshot: String },
    Invite { last_name: String, first_name: String },
    CourtFound { endpoint: SocketAddr },
    ListPlayers { players: Vec<PlayerEntry> },
    InfoPlayer { player_id: PlayerId },
    ListCourts { court_ids: Vec<CourtId> },
    EndMatch,
}

/// Listing view of a registered player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEntry {
    pub id: PlayerId,
    pub last_name: String,
    pub first_name: String,
}

impl From<&Player> for PlayerEntry {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            last_name: player.last_name.clone(),
            first_name: player.first_name.clone(),
        }
    }
}

impl ServerToClient {
    pub fn invite_from(host: &Player) -> Self {
        Self::Invite {
            last_name: host.last_name.clone(),
            first_name: host.first_name.clone(),
        }
    }

    pub fn score(snapshot: impl Into<String>) -> Self {
        Self::Score {
            snapshot: snapshot.into(),
        }
    }

    pub fn to_message(&self) -> Message {
        match self {
            ServerToClient::Ok => Message::empty(Code::Ok),
            ServerToClient::CourtRegistered { court_id } => {
                Message::new(Code::Ok, court_id.to_string())
            }
            ServerToClient::Nok => Message::empty(Code::Nok),
            ServerToClient::Score { snapshot } => Message::new(Code::Score, snapshot.clone()),
            ServerToClient::Invite {
                last_name,
                first_name,
            } => Message::new(Code::Invite, format!("{last_name}:{first_name}")),
            ServerToClient::CourtFound { endpoint } => Message::new(
                Code::CourtFound,
                format!("{}:{}", endpoint.ip(), endpoint.port()),
            ),
            ServerToClient::ListPlayers { players } => {
                let payload: String = players
                    .iter()
                    .map(|p| format!("{}:{}:{}:", p.id, p.last_name, p.first_name))
                    .collect();
                Message::new(Code::ListPlayers, payload)
            }
            ServerToClient::InfoPlayer { player_id } => {
                Message::new(Code::InfoPlayer, player_id.to_string())
            }
            ServerToClient::ListCourts { court_ids } => {
                let ids: Vec<String> = court_ids.iter().map(|id| id.to_string()).collect();
                Message::new(Code::ListCourts, ids.join("\n"))
            }
            ServerToClient::EndMatch => Message::empty(Code::EndMatch),
        }
    }
}

/// Parses a `LIST_PLAYERS` payload (`id:lastName:firstName:` repeated).
pub fn parse_player_list(payload: &str) -> Vec<PlayerEntry> {
    let fields: Vec<&str> = payload.split(':').collect();
    fields
        .chunks(3)
        .filter_map(|chunk| match chunk {
            [id, last_name, first_name] => Some(PlayerEntry {
                id: id.parse().ok()?,
                last_name: last_name.to_string(),
                first_name: first_name.to_string(),
            }),
            _ => None,
        })
        .collect()
}
