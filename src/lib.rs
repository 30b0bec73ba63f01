pub mod client;
pub mod config;
pub mod connection;
pub mod court;
pub mod error;
pub mod logging;
pub mod matchmaking;
pub mod messages;
pub mod peer;
pub mod player;
pub mod server;
pub mod state;

#[cfg(test)]
mod test_utils;
