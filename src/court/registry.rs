use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, info};

use super::score::{PointOutcome, Score, Side};
use crate::connection::ConnectionId;
use crate::error::SessionError;
use crate::player::registry::Player;

pub type CourtId = u32;

/// Mutable part of a court, guarded by the court's own lock.
#[derive(Debug, Clone)]
pub struct CourtState {
    pub available: bool,
    /// False once the court's connection dropped; the record stays in the pool.
    pub online: bool,
    /// Only meaningful while `available` is false; left stale on release.
    pub players: Option<[Player; 2]>,
    pub score: Score,
}

#[derive(Debug)]
pub struct Court {
    pub id: CourtId,
    pub endpoint: SocketAddr,
    pub connection: ConnectionId,
    state: RwLock<CourtState>,
}

impl Court {
    fn new(id: CourtId, endpoint: SocketAddr, connection: ConnectionId) -> Self {
        Self {
            id,
            endpoint,
            connection,
            state: RwLock::new(CourtState {
                available: true,
                online: true,
                players: None,
                score: Score::default(),
            }),
        }
    }

    /// Consistent copy of the current score, taken under the read lock.
    #[cfg(test)]
    pub async fn score(&self) -> Score {
        self.state.read().await.score.clone()
    }

    pub async fn snapshot(&self) -> CourtState {
        self.state.read().await.clone()
    }

    pub async fn is_available(&self) -> bool {
        let state = self.state.read().await;
        state.available && state.online
    }
}

/// Courts that reported in. Records are never removed; a court returns to
/// the pool when its match ends.
#[derive(Debug)]
pub struct CourtRegistry {
    courts: RwLock<BTreeMap<CourtId, Arc<Court>>>,
    next_id: AtomicU32,
}

impl Default for CourtRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CourtRegistry {
    pub fn new() -> Self {
        Self {
            courts: RwLock::new(BTreeMap::new()),
            next_id: AtomicU32::new(0),
        }
    }

    pub async fn register(&self, endpoint: SocketAddr, connection: ConnectionId) -> CourtId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let court = Arc::new(Court::new(id, endpoint, connection));
        self.courts.write().await.insert(id, court);
        info!(court_id = id, %endpoint, "court registered");
        id
    }

    pub async fn find(&self, id: CourtId) -> Option<Arc<Court>> {
        self.courts.read().await.get(&id).cloned()
    }

    pub async fn list(&self) -> Vec<CourtId> {
        self.courts.read().await.keys().copied().collect()
    }

    async fn get(&self, id: CourtId) -> Result<Arc<Court>, SessionError> {
        self.find(id).await.ok_or(SessionError::CourtNotFound(id))
    }

    // The map lock is released before any court lock is taken.
    async fn all(&self) -> Vec<Arc<Court>> {
        self.courts.read().await.values().cloned().collect()
    }

    /// Some available court, in no guaranteed order.
    pub async fn first_available(&self) -> Option<Arc<Court>> {
        for court in self.all().await {
            if court.is_available().await {
                return Some(court);
            }
        }
        None
    }

    /// Gives the court to two players and starts a fresh match on it.
    pub async fn assign(&self, id: CourtId, a: Player, b: Player) -> Result<(), SessionError> {
        let court = self.get(id).await?;
        let mut state = court.state.write().await;
        if !(state.available && state.online) {
            return Err(SessionError::CourtBusy(id));
        }
        start_match(&mut state, a, b);
        Ok(())
    }

    /// `first_available` and `assign` in one step, so two pairs can never
    /// receive the same court.
    pub async fn reserve(&self, a: Player, b: Player) -> Result<Arc<Court>, SessionError> {
        for court in self.all().await {
            let mut state = court.state.write().await;
            if state.available && state.online {
                start_match(&mut state, a, b);
                drop(state);
                debug!(court_id = court.id, "court reserved");
                return Ok(court);
            }
        }
        Err(SessionError::NoCourtAvailable)
    }

    /// Awards a point on the court's running match. The court goes back to
    /// the pool when the point ends the match.
    pub async fn increment_score(
        &self,
        id: CourtId,
        side: Side,
    ) -> Result<(Score, PointOutcome), SessionError> {
        let court = self.get(id).await?;
        let mut state = court.state.write().await;
        ensure_match(&state, id)?;

        let outcome = state.score.award_point(side)?;
        if outcome == PointOutcome::Match {
            state.available = true;
            info!(court_id = id, score = %state.score, "match finished");
        }
        Ok((state.score.clone(), outcome))
    }

    /// Replaces the running match's score with one reported as text.
    pub async fn apply_score_update(&self, id: CourtId, raw: &str) -> Result<Score, SessionError> {
        let score = Score::from_snapshot(raw)?;
        let court = self.get(id).await?;
        let mut state = court.state.write().await;
        ensure_match(&state, id)?;

        state.score = score;
        if state.score.is_finished() {
            state.available = true;
            info!(court_id = id, score = %state.score, "match finished");
        }
        Ok(state.score.clone())
    }

    pub async fn release(&self, id: CourtId) -> Result<(), SessionError> {
        let court = self.get(id).await?;
        court.state.write().await.available = true;
        Ok(())
    }

    /// Marks a court whose connection dropped; it is kept but never assigned again.
    pub async fn set_offline(&self, id: CourtId) -> Result<(), SessionError> {
        let court = self.get(id).await?;
        court.state.write().await.online = false;
        Ok(())
    }
}

fn start_match(state: &mut CourtState, a: Player, b: Player) {
    state.available = false;
    state.players = Some([a, b]);
    state.score = Score::default();
}

fn ensure_match(state: &CourtState, id: CourtId) -> Result<(), SessionError> {
    if state.score.is_finished() {
        return Err(SessionError::MatchFinished(super::score::MatchFinished));
    }
    if state.available {
        return Err(SessionError::NoMatch(id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::registry::PlayerHandle;

    fn player(id: u32, last: &str, first: &str) -> Player {
        Player {
            id,
            first_name: first.into(),
            last_name: last.into(),
            connection: PlayerHandle::new(ConnectionId::new()).0,
        }
    }

    fn endpoint(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    async fn court_with_match(registry: &CourtRegistry) -> CourtId {
        let id = registry.register(endpoint(4000), ConnectionId::new()).await;
        registry
            .assign(id, player(1, "Doe", "John"), player(2, "Smith", "Jane"))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_register_and_list() {
        let registry = CourtRegistry::new();
        assert!(registry.first_available().await.is_none());

        let a = registry.register(endpoint(4000), ConnectionId::new()).await;
        let b = registry.register(endpoint(4001), ConnectionId::new()).await;
        assert_eq!(registry.list().await, vec![a, b]);
        assert_eq!(registry.find(b).await.unwrap().endpoint, endpoint(4001));
        assert!(registry.find(42).await.is_none());
    }

    #[tokio::test]
    async fn test_assign_and_release() {
        let registry = CourtRegistry::new();
        let id = court_with_match(&registry).await;
        assert!(registry.first_available().await.is_none());

        let court = registry.find(id).await.unwrap();
        let state = court.snapshot().await;
        assert!(!state.available);
        let players = state.players.unwrap();
        assert_eq!(players[0].last_name, "Doe");
        assert_eq!(players[1].last_name, "Smith");

        assert!(matches!(
            registry
                .assign(id, player(3, "X", "Y"), player(4, "Z", "W"))
                .await,
            Err(SessionError::CourtBusy(_))
        ));

        registry.release(id).await.unwrap();
        assert_eq!(registry.first_available().await.unwrap().id, id);
        // Players stay stale until the next assignment.
        assert!(court.snapshot().await.players.is_some());
    }

    #[tokio::test]
    async fn test_assign_resets_score() {
        let registry = CourtRegistry::new();
        let id = court_with_match(&registry).await;
        registry.increment_score(id, Side::A).await.unwrap();
        registry.release(id).await.unwrap();

        registry
            .assign(id, player(3, "X", "Y"), player(4, "Z", "W"))
            .await
            .unwrap();
        let court = registry.find(id).await.unwrap();
        assert_eq!(court.score().await, Score::default());
    }

    #[tokio::test]
    async fn test_reserve_never_double_books() {
        let registry = Arc::new(CourtRegistry::new());
        registry.register(endpoint(4000), ConnectionId::new()).await;

        let first = registry
            .reserve(player(1, "A", "A"), player(2, "B", "B"))
            .await;
        let second = registry
            .reserve(player(3, "C", "C"), player(4, "D", "D"))
            .await;
        assert!(first.is_ok());
        assert!(matches!(second, Err(SessionError::NoCourtAvailable)));
    }

    #[tokio::test]
    async fn test_offline_court_is_skipped() {
        let registry = CourtRegistry::new();
        let id = registry.register(endpoint(4000), ConnectionId::new()).await;
        registry.set_offline(id).await.unwrap();
        assert!(registry.first_available().await.is_none());
        assert_eq!(registry.list().await, vec![id]);
    }

    #[tokio::test]
    async fn test_increment_requires_match() {
        let registry = CourtRegistry::new();
        let id = registry.register(endpoint(4000), ConnectionId::new()).await;
        assert!(matches!(
            registry.increment_score(id, Side::A).await,
            Err(SessionError::NoMatch(_))
        ));
        assert!(matches!(
            registry.increment_score(99, Side::A).await,
            Err(SessionError::CourtNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_match_end_releases_court() {
        let registry = CourtRegistry::new();
        let id = court_with_match(&registry).await;

        let mut last = PointOutcome::Point;
        for _ in 0..48 {
            let (_, outcome) = registry.increment_score(id, Side::B).await.unwrap();
            last = outcome;
        }
        assert_eq!(last, PointOutcome::Match);

        let court = registry.find(id).await.unwrap();
        assert!(court.is_available().await);
        assert!(matches!(
            registry.increment_score(id, Side::A).await,
            Err(SessionError::MatchFinished(_))
        ));
        assert_eq!(court.score().await.winner(), Some(Side::B));
    }

    #[tokio::test]
    async fn test_apply_score_update() {
        let registry = CourtRegistry::new();
        let id = court_with_match(&registry).await;

        let score = registry.apply_score_update(id, "40/15:6/2:1/1:0/0").await.unwrap();
        assert_eq!(score.sets_won(Side::A), 1);
        assert_eq!(registry.find(id).await.unwrap().score().await, score);

        assert!(matches!(
            registry.apply_score_update(id, "garbage").await,
            Err(SessionError::Snapshot(_))
        ));

        registry.apply_score_update(id, "0/0:6/2:6/1:0/0").await.unwrap();
        assert!(registry.find(id).await.unwrap().is_available().await);
    }
}
