use std::time::Duration;

use crate::court::registry::CourtRegistry;
use crate::player::registry::PlayerRegistry;

/// Settings the session workers need at runtime.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How often a spectator's court is checked for score changes.
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Shared context handed to every connection worker.
#[derive(Debug, Default)]
pub struct ServerState {
    pub players: PlayerRegistry,
    pub courts: CourtRegistry,
    pub config: SessionConfig,
}

impl ServerState {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            players: PlayerRegistry::new(),
            courts: CourtRegistry::new(),
            config,
        }
    }
}
