use crate::court::registry::CourtId;
use crate::court::score::Side;
use crate::error::SessionError;
use crate::player::registry::PlayerId;

use super::{Code, Message};

/// Capacity declared by the first message of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Host { last_name: String, first_name: String },
    Invited { last_name: String, first_name: String },
    Court,
    Spectator,
}

impl Role {
    pub fn digit(&self) -> char {
        match self {
            Role::Host { .. } => '1',
            Role::Invited { .. } => '2',
            Role::Court => '3',
            Role::Spectator => '4',
        }
    }
}

/// Requests a peer may send to the server, parsed from raw messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientToServer {
    Auth(Role),
    AskPlayers,
    PlayWith { player_id: PlayerId },
    AskCourts,
    Subscribe { court_id: CourtId },
    IncrementScore { side: Side },
    ListenPort { port: u16 },
    Score { snapshot: String },
    /// Sent by a court whose players left before the match ended.
    AbandonMatch,
    // Answers to an invitation.
    Accept,
    Decline,
}

impl ClientToServer {
    pub fn parse(message: &Message) -> Result<Self, SessionError> {
        let payload = message.payload.trim();
        match message.code {
            Code::Auth => parse_auth(payload).map(ClientToServer::Auth),
            Code::AskPlayers => Ok(ClientToServer::AskPlayers),
            Code::AskCourts => Ok(ClientToServer::AskCourts),
            Code::PlayWith => Ok(ClientToServer::PlayWith {
                player_id: parse_number(payload, "player id")?,
            }),
            Code::Subscribe => Ok(ClientToServer::Subscribe {
                court_id: parse_number(payload, "court id")?,
            }),
            Code::IncrementScore => Side::from_slot(payload)
                .map(|side| ClientToServer::IncrementScore { side })
                .ok_or_else(|| SessionError::Malformed(format!("player slot `{payload}`"))),
            Code::ListenPort => Ok(ClientToServer::ListenPort {
                port: parse_number(payload, "listen port")?,
            }),
            Code::Score => Ok(ClientToServer::Score {
                snapshot: payload.to_string(),
            }),
            Code::EndMatch => Ok(ClientToServer::AbandonMatch),
            Code::Ok => Ok(ClientToServer::Accept),
            Code::Nok => Ok(ClientToServer::Decline),
            other => Err(SessionError::UnexpectedCode(other)),
        }
    }

    pub fn to_message(&self) -> Message {
        match self {
            ClientToServer::Auth(role) => {
                let payload = match role {
                    Role::Host {
                        last_name,
                        first_name,
                    }
                    | Role::Invited {
                        last_name,
                        first_name,
                    } => format!("{}:{}:{}", role.digit(), last_name, first_name),
                    Role::Court | Role::Spectator => role.digit().to_string(),
                };
                Message::new(Code::Auth, payload)
            }
            ClientToServer::AskPlayers => Message::empty(Code::AskPlayers),
            ClientToServer::PlayWith { player_id } => {
                Message::new(Code::PlayWith, player_id.to_string())
            }
            ClientToServer::AskCourts => Message::empty(Code::AskCourts),
            ClientToServer::Subscribe { court_id } => {
                Message::new(Code::Subscribe, court_id.to_string())
            }
            ClientToServer::IncrementScore { side } => {
                Message::new(Code::IncrementScore, side.slot().to_string())
            }
            ClientToServer::ListenPort { port } => Message::new(Code::ListenPort, port.to_string()),
            ClientToServer::Score { snapshot } => Message::new(Code::Score, snapshot.clone()),
            ClientToServer::AbandonMatch => Message::empty(Code::EndMatch),
            ClientToServer::Accept => Message::empty(Code::Ok),
            ClientToServer::Decline => Message::empty(Code::Nok),
        }
    }
}

/// `role[:lastName:firstName]`. An unknown role is a protocol violation,
/// missing names for a player role are malformed.
fn parse_auth(payload: &str) -> Result<Role, SessionError> {
    let mut fields = payload.split(':');
    let role = fields.next().unwrap_or_default().trim();

    let mut names = || -> Result<(String, String), SessionError> {
        let last_name = non_empty(fields.next(), "last name")?;
        let first_name = non_empty(fields.next(), "first name")?;
        Ok((last_name, first_name))
    };

    match role {
        "1" => {
            let (last_name, first_name) = names()?;
            Ok(Role::Host {
                last_name,
                first_name,
            })
        }
        "2" => {
            let (last_name, first_name) = names()?;
            Ok(Role::Invited {
                last_name,
                first_name,
            })
        }
        "3" => Ok(Role::Court),
        "4" => Ok(Role::Spectator),
        other => Err(SessionError::Protocol(format!("unknown role `{other}`"))),
    }
}

fn non_empty(field: Option<&str>, what: &str) -> Result<String, SessionError> {
    field
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SessionError::Malformed(format!("missing {what}")))
}

fn parse_number<T: std::str::FromStr>(payload: &str, what: &str) -> Result<T, SessionError> {
    payload
        .parse::<T>()
        .map_err(|_| SessionError::Malformed(format!("{what} `{payload}`")))
}
