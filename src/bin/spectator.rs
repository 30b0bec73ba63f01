use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tracing::warn;

use courtside::config::ServerEndpoint;
use courtside::court::score::Score;
use courtside::logging;
use courtside::messages::{ClientToServer, Code, Role};
use courtside::peer;

#[derive(Debug, Parser)]
#[command(name = "courtside-spectator", about = "Follow the score of a court")]
struct Cli {
    #[command(flatten)]
    server: ServerEndpoint,

    /// Print each score update as a JSON line.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ScoreLine<'a> {
    court_id: u32,
    snapshot: &'a str,
    score: &'a Score,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_client();

    let mut server = peer::connect(cli.server.address()).await?;
    peer::authenticate(&mut server, Role::Spectator).await?;
    let mut input = peer::stdin_lines();

    let court_id = loop {
        let reply = server.request(&ClientToServer::AskCourts.to_message()).await?;
        let listing = peer::expect(reply, Code::ListCourts)?;
        if listing.payload.is_empty() {
            println!("No courts yet");
        } else {
            println!("Courts:");
            for id in listing.payload.lines() {
                println!("-> {id}");
            }
        }

        let choice = peer::prompt(&mut input, "Court to watch (empty to refresh): ").await?;
        let Ok(court_id) = choice.parse::<u32>() else {
            continue;
        };
        let reply = server
            .request(&ClientToServer::Subscribe { court_id }.to_message())
            .await?;
        match reply.code {
            Code::Score => {
                show(court_id, &reply.payload, cli.json)?;
                break court_id;
            }
            _ => println!("Court {court_id} does not exist"),
        }
    };

    loop {
        let message = server.receive().await?;
        match message.code {
            Code::Score => show(court_id, &message.payload, cli.json)?,
            Code::EndMatch => {
                println!("Match over");
                return Ok(());
            }
            other => warn!("unexpected {:?} while watching", other),
        }
    }
}

fn show(court_id: u32, snapshot: &str, json: bool) -> Result<()> {
    if !json {
        println!("[court {court_id}] {snapshot}");
        return Ok(());
    }
    let score = Score::from_snapshot(snapshot)?;
    let line = ScoreLine {
        court_id,
        snapshot,
        score: &score,
    };
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}
