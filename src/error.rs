use thiserror::Error;

use crate::connection::FrameError;
use crate::court::registry::CourtId;
use crate::court::score::{MatchFinished, SnapshotError};
use crate::messages::Code;
use crate::player::registry::PlayerId;

/// Failures of a session worker, grouped by how the peer is answered.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Wrong first message or unknown role: the connection is dropped without reply.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Payload does not have the expected shape: answered with NOK.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A reply or notification code sent where a request was expected: answered with NOK.
    #[error("{0:?} is not a request")]
    UnexpectedCode(Code),

    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    #[error("player {0} declined the invitation")]
    InvitationDeclined(PlayerId),

    #[error("court {0} not found")]
    CourtNotFound(CourtId),

    #[error("court {0} is not available")]
    CourtBusy(CourtId),

    #[error("no court available")]
    NoCourtAvailable,

    #[error("court {0} has no match in progress")]
    NoMatch(CourtId),

    #[error(transparent)]
    MatchFinished(#[from] MatchFinished),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("peer disconnected")]
    Disconnected,

    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl SessionError {
    /// Whether the peer's connection is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Protocol(_) | SessionError::Disconnected | SessionError::Frame(_)
        )
    }
}
