use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::{Args, Parser};

use crate::state::SessionConfig;

/// Command line of `courtside-server`.
#[derive(Debug, Parser)]
#[command(name = "courtside-server", about = "Tennis session server", version)]
pub struct ServerArgs {
    /// Port to listen on; 0 lets the OS pick one.
    #[arg(default_value_t = 0)]
    pub port: u16,

    /// Address to bind.
    #[arg(long, env = "COURTSIDE_BIND_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// How often spectators' courts are polled for score changes.
    #[arg(
        long,
        env = "COURTSIDE_POLL_INTERVAL_MS",
        default_value_t = 500,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval_ms: u64,

    /// Idle time before TCP keep-alive probes start on accepted sockets.
    #[arg(long, env = "COURTSIDE_KEEPALIVE_SECS", default_value_t = 10)]
    pub keepalive_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub keepalive: Duration,
    pub session: SessionConfig,
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            bind_addr: SocketAddr::new(args.bind, args.port),
            keepalive: Duration::from_secs(args.keepalive_secs),
            session: SessionConfig {
                poll_interval: Duration::from_millis(args.poll_interval_ms),
            },
        }
    }
}

/// Server location shared by the client programs.
#[derive(Debug, Clone, Args)]
pub struct ServerEndpoint {
    /// Server address or host name.
    pub server_ip: String,
    pub server_port: u16,
}

impl ServerEndpoint {
    pub fn address(&self) -> (&str, u16) {
        (self.server_ip.as_str(), self.server_port)
    }
}
