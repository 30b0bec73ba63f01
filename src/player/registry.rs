use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::connection::ConnectionId;
use crate::messages::PlayerCommand;

pub type PlayerId = u32;

/// Connection handle of a player: the worker owning the socket listens on
/// the other end of `commands`.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    pub connection_id: ConnectionId,
    pub commands: mpsc::UnboundedSender<PlayerCommand>,
}

impl PlayerHandle {
    pub fn new(connection_id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<PlayerCommand>) {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        (
            Self {
                connection_id,
                commands,
            },
            commands_rx,
        )
    }

    pub fn send(&self, command: PlayerCommand) -> Result<(), mpsc::error::SendError<PlayerCommand>> {
        self.commands.send(command)
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub first_name: String,
    pub last_name: String,
    pub connection: PlayerHandle,
}

/// Players waiting to be invited.
///
/// A single lock guards the collection; ids come from a counter that never
/// goes backwards, so an id is never reused.
#[derive(Debug)]
pub struct PlayerRegistry {
    players: Mutex<BTreeMap<PlayerId, Player>>,
    next_id: AtomicU32,
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            players: Mutex::new(BTreeMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    /// Allocates an id without listing the player (hosting players).
    pub fn next_id(&self) -> PlayerId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn register(
        &self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        connection: PlayerHandle,
    ) -> PlayerId {
        let id = self.next_id();
        let player = Player {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            connection,
        };
        self.players.lock().await.insert(id, player);
        id
    }

    /// Removes and returns the record. Only one caller can get it.
    pub async fn unregister(&self, id: PlayerId) -> Option<Player> {
        self.players.lock().await.remove(&id)
    }

    pub async fn find(&self, id: PlayerId) -> Option<Player> {
        self.players.lock().await.get(&id).cloned()
    }

    /// Snapshot in ascending id order.
    pub async fn list_all(&self) -> Vec<Player> {
        self.players.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.players.lock().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.players.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn handle() -> PlayerHandle {
        PlayerHandle::new(ConnectionId::new()).0
    }

    #[tokio::test]
    async fn test_register_find_unregister() {
        let registry = PlayerRegistry::new();
        let john = registry.register("John", "Doe", handle()).await;
        let jane = registry.register("Jane", "Smith", handle()).await;
        assert_eq!((john, jane), (1, 2));

        let found = registry.find(john).await.unwrap();
        assert_eq!(found.last_name, "Doe");
        assert_eq!(found.first_name, "John");

        let ids: Vec<PlayerId> = registry.list_all().await.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);

        assert!(registry.unregister(john).await.is_some());
        assert!(registry.unregister(john).await.is_none());
        assert!(registry.find(john).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_ids_not_reused() {
        let registry = PlayerRegistry::new();
        let first = registry.register("A", "A", handle()).await;
        registry.unregister(first).await;
        let host = registry.next_id();
        let second = registry.register("B", "B", handle()).await;
        assert!(first < host && host < second);
        assert!(registry.find(host).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_unregister() {
        let registry = Arc::new(PlayerRegistry::new());
        let mut tasks = Vec::new();

        for worker in 0..16 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let mut kept = Vec::new();
                for round in 0..50 {
                    let id = registry
                        .register(format!("p{worker}"), format!("r{round}"), handle())
                        .await;
                    if round % 2 == 0 {
                        assert!(registry.unregister(id).await.is_some());
                    } else {
                        kept.push(id);
                    }
                }
                kept
            }));
        }

        let mut expected = HashSet::new();
        for task in tasks {
            for id in task.await.unwrap() {
                assert!(expected.insert(id), "id {id} issued twice");
            }
        }

        let listed: HashSet<PlayerId> = registry.list_all().await.iter().map(|p| p.id).collect();
        assert_eq!(listed, expected);
        assert_eq!(registry.len().await, 16 * 25);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unregister_is_at_most_once() {
        let registry = Arc::new(PlayerRegistry::new());
        let id = registry.register("John", "Doe", handle()).await;

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move { registry.unregister(id).await.is_some() }));
        }
        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
