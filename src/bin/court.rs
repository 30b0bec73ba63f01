use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use courtside::config::ServerEndpoint;
use courtside::connection::Connection;
use courtside::court::score::Side;
use courtside::logging;
use courtside::messages::{ClientToServer, Code, Message, Role};
use courtside::peer;

#[derive(Debug, Parser)]
#[command(name = "courtside-court", about = "Host matches and report their points")]
struct Cli {
    #[command(flatten)]
    server: ServerEndpoint,
}

/// A point claimed by the player in `side`, answered with the server's reply.
type PointClaim = (Side, oneshot::Sender<Message>);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_client();

    let mut server = peer::connect(cli.server.address()).await?;
    peer::authenticate(&mut server, Role::Court).await?;

    let listener = TcpListener::bind("0.0.0.0:0").await?;
    let port = listener.local_addr()?.port();
    let reply = server
        .request(&ClientToServer::ListenPort { port }.to_message())
        .await?;
    let court_id = peer::expect(reply, Code::Ok).context("registration refused")?.payload;
    println!("Court {court_id} waiting for players on port {port}");

    loop {
        let (first, first_addr) = listener.accept().await?;
        println!("Player 1 arrived from {first_addr}");
        let (second, second_addr) = listener.accept().await?;
        println!("Player 2 arrived from {second_addr}");

        if !host_match(&mut server, [first, second]).await? {
            // Both players left early: hand the court back to the server's pool.
            let reply = server
                .request(&ClientToServer::AbandonMatch.to_message())
                .await?;
            peer::expect(reply, Code::Ok).context("server kept the court reserved")?;
            println!("Players left before the end of the match");
        }
        println!("Court {court_id} free again");
    }
}

/// Relays the players' points to the server, one at a time, until the
/// server reports the end of the match or both players leave. Returns
/// whether the match reached its end.
async fn host_match(server: &mut Connection<TcpStream>, players: [TcpStream; 2]) -> Result<bool> {
    let (claims_tx, mut claims_rx) = mpsc::unbounded_channel::<PointClaim>();
    for (stream, side) in players.into_iter().zip([Side::A, Side::B]) {
        tokio::spawn(relay_player(Connection::new(stream), side, claims_tx.clone()));
    }
    drop(claims_tx);

    while let Some((side, reply_tx)) = claims_rx.recv().await {
        let reply = server
            .request(&ClientToServer::IncrementScore { side }.to_message())
            .await?;
        let finished = reply.code == Code::EndMatch;
        let _ = reply_tx.send(reply);
        if finished {
            info!("match finished");
            return Ok(true);
        }
    }
    Ok(false)
}

async fn relay_player(
    mut player: Connection<TcpStream>,
    side: Side,
    claims: mpsc::UnboundedSender<PointClaim>,
) {
    loop {
        let message = match player.receive().await {
            Ok(message) => message,
            Err(e) => {
                debug!(?side, "player left: {}", e);
                return;
            }
        };
        if message.code != Code::IncrementScore {
            warn!(?side, "unexpected {:?} from player", message.code);
            if player.send(&Message::empty(Code::Nok)).await.is_err() {
                return;
            }
            continue;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let reply = match claims.send((side, reply_tx)) {
            Ok(()) => reply_rx.await.ok(),
            Err(_) => None,
        };
        // No reply means the match is already over.
        let reply = reply.unwrap_or_else(|| Message::empty(Code::EndMatch));
        let finished = reply.code == Code::EndMatch;
        if player.send(&reply).await.is_err() || finished {
            return;
        }
    }
}
