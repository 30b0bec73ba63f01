use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::registry::Court;
use crate::connection::Connection;
use crate::error::SessionError;
use crate::messages::{ClientToServer, ServerToClient};
use crate::state::ServerState;

/// Spectator worker: answers court listings until a subscription succeeds,
/// then streams that court's score.
pub async fn spectator_session<S>(
    conn: &mut Connection<S>,
    state: &ServerState,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite,
{
    conn.send(&ServerToClient::Ok.to_message()).await?;

    loop {
        let message = conn.receive().await?;
        let reply = match ClientToServer::parse(&message) {
            Ok(ClientToServer::AskCourts) => ServerToClient::ListCourts {
                court_ids: state.courts.list().await,
            },
            Ok(ClientToServer::Subscribe { court_id }) => match state.courts.find(court_id).await {
                Some(court) => {
                    info!(court_id, spectator = %conn.id(), "spectator subscribed");
                    return watch_court(conn, court, state.config.poll_interval).await;
                }
                None => {
                    debug!(court_id, "subscription to unknown court");
                    ServerToClient::Nok
                }
            },
            Ok(other) => {
                warn!("unexpected request from spectator: {:?}", other);
                ServerToClient::Nok
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                debug!("{}", e);
                ServerToClient::Nok
            }
        };
        conn.send(&reply.to_message()).await?;
    }
}

/// Pushes the current score, then polls the court every `poll_interval` and
/// pushes again only when the score differs from the last one sent. Once
/// the match is over the final score has been sent and `END_MATCH` follows.
/// A match the court abandons ends the watch the same way.
pub async fn watch_court<S>(
    conn: &mut Connection<S>,
    court: Arc<Court>,
    poll_interval: Duration,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite,
{
    let initial = court.snapshot().await;
    let mut in_match = !initial.available;
    let mut last_sent = initial.score;
    conn.send(&ServerToClient::score(last_sent.to_snapshot()).to_message())
        .await?;

    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    while !last_sent.is_finished() {
        tokio::select! {
            _ = ticker.tick() => {
                let current = court.snapshot().await;
                if current.score != last_sent {
                    conn.send(&ServerToClient::score(current.score.to_snapshot()).to_message())
                        .await?;
                    last_sent = current.score;
                }
                if in_match && current.available && !last_sent.is_finished() {
                    info!(court_id = court.id, "match abandoned");
                    break;
                }
                in_match |= !current.available;
            }
            incoming = conn.receive() => {
                // Nothing is expected from a subscribed spectator; this only
                // notices a disconnect while the score is idle.
                let message = incoming?;
                debug!(court_id = court.id, "ignoring {:?} from spectator", message.code);
            }
        }
    }

    conn.send(&ServerToClient::EndMatch.to_message()).await?;
    info!(court_id = court.id, "match over, spectator released");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionId;
    use crate::court::score::Side;
    use crate::messages::{Code, Message};
    use crate::player::registry::{Player, PlayerHandle};
    use crate::state::SessionConfig;
    use crate::test_utils::{connection_pair, expect_code, expect_silence};

    fn player(id: u32) -> Player {
        Player {
            id,
            first_name: format!("first{id}"),
            last_name: format!("last{id}"),
            connection: PlayerHandle::new(ConnectionId::new()).0,
        }
    }

    async fn state_with_match() -> Arc<ServerState> {
        let state = Arc::new(ServerState::new(SessionConfig {
            poll_interval: Duration::from_millis(10),
        }));
        let id = state
            .courts
            .register("127.0.0.1:4000".parse().unwrap(), ConnectionId::new())
            .await;
        state.courts.assign(id, player(1), player(2)).await.unwrap();
        state
    }

    fn spawn_spectator(
        state: &Arc<ServerState>,
    ) -> (
        Connection<tokio::io::DuplexStream>,
        tokio::task::JoinHandle<Result<(), SessionError>>,
    ) {
        let (client, mut server) = connection_pair();
        let state = state.clone();
        let task = tokio::spawn(async move { spectator_session(&mut server, &state).await });
        (client, task)
    }

    #[tokio::test]
    async fn test_list_and_unknown_court() {
        let state = state_with_match().await;
        let (mut spectator, _task) = spawn_spectator(&state);
        expect_code(&mut spectator, Code::Ok).await;

        spectator.send(&Message::empty(Code::AskCourts)).await.unwrap();
        let listing = expect_code(&mut spectator, Code::ListCourts).await;
        assert_eq!(listing.payload, "0");

        spectator.send(&Message::new(Code::Subscribe, "7")).await.unwrap();
        expect_code(&mut spectator, Code::Nok).await;

        // Still open for another attempt.
        spectator.send(&Message::new(Code::Subscribe, "0")).await.unwrap();
        let first = expect_code(&mut spectator, Code::Score).await;
        assert_eq!(first.payload, "0/0:0/0:0/0:0/0");
    }

    #[tokio::test]
    async fn test_pushes_only_on_change() {
        let state = state_with_match().await;
        let (mut spectator, _task) = spawn_spectator(&state);
        expect_code(&mut spectator, Code::Ok).await;

        spectator.send(&Message::new(Code::Subscribe, "0")).await.unwrap();
        let snapshot = expect_code(&mut spectator, Code::Score).await;
        assert_eq!(snapshot.payload, "0/0:0/0:0/0:0/0");

        // Several polls pass with no change: nothing is pushed.
        expect_silence(&mut spectator, Duration::from_millis(80)).await;

        state.courts.increment_score(0, Side::A).await.unwrap();
        let update = expect_code(&mut spectator, Code::Score).await;
        assert_eq!(update.payload, "15/0:0/0:0/0:0/0");

        expect_silence(&mut spectator, Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_final_score_then_end_match() {
        let state = state_with_match().await;
        let (mut spectator, task) = spawn_spectator(&state);
        expect_code(&mut spectator, Code::Ok).await;
        spectator.send(&Message::new(Code::Subscribe, "0")).await.unwrap();
        expect_code(&mut spectator, Code::Score).await;

        for _ in 0..48 {
            state.courts.increment_score(0, Side::B).await.unwrap();
        }

        // Intermediate scores may or may not be seen depending on poll timing.
        let mut last_score = None;
        loop {
            let message = spectator.receive().await.unwrap();
            match message.code {
                Code::Score => last_score = Some(message.payload),
                Code::EndMatch => break,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(last_score.as_deref(), Some("0/0:0/6:0/6:0/0"));
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_abandoned_match_ends_watch() {
        let state = state_with_match().await;
        let (mut spectator, task) = spawn_spectator(&state);
        expect_code(&mut spectator, Code::Ok).await;
        spectator.send(&Message::new(Code::Subscribe, "0")).await.unwrap();
        expect_code(&mut spectator, Code::Score).await;

        state.courts.release(0).await.unwrap();
        expect_code(&mut spectator, Code::EndMatch).await;
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_stray_code_before_subscribing() {
        let state = state_with_match().await;
        let (mut spectator, task) = spawn_spectator(&state);
        expect_code(&mut spectator, Code::Ok).await;

        spectator.send(&Message::new(Code::Invite, "Doe:John")).await.unwrap();
        expect_code(&mut spectator, Code::Nok).await;
        assert!(!task.is_finished());

        spectator.send(&Message::new(Code::Subscribe, "0")).await.unwrap();
        expect_code(&mut spectator, Code::Score).await;
    }

    #[tokio::test]
    async fn test_disconnect_ends_watch() {
        let state = state_with_match().await;
        let (mut spectator, task) = spawn_spectator(&state);
        expect_code(&mut spectator, Code::Ok).await;
        spectator.send(&Message::new(Code::Subscribe, "0")).await.unwrap();
        expect_code(&mut spectator, Code::Score).await;

        drop(spectator);
        assert!(task.await.unwrap().is_err());
    }
}
