use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::net::TcpStream;

use courtside::config::ServerEndpoint;
use courtside::connection::Connection;
use courtside::logging;
use courtside::messages::{ClientToServer, Code, Message, Role, parse_player_list};
use courtside::peer::{self, StdinLines};

#[derive(Debug, Parser)]
#[command(name = "courtside-player", about = "Find a partner and play a match")]
struct Cli {
    #[command(flatten)]
    server: ServerEndpoint,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_client();

    let mut server = peer::connect(cli.server.address()).await?;
    let mut input = peer::stdin_lines();

    let first_name = peer::prompt(&mut input, "First name: ").await?;
    let last_name = peer::prompt(&mut input, "Last name: ").await?;
    let choice = peer::prompt(
        &mut input,
        "1) Wait for an invitation\n2) Invite a partner\nChoice: ",
    )
    .await?;

    match choice.as_str() {
        "1" => {
            peer::authenticate(
                &mut server,
                Role::Invited {
                    last_name,
                    first_name,
                },
            )
            .await?;
            wait_for_partner(&mut server, &mut input).await?;
        }
        "2" => {
            peer::authenticate(
                &mut server,
                Role::Host {
                    last_name,
                    first_name,
                },
            )
            .await?;
            invite_partner(&mut server, &mut input).await?;
        }
        other => bail!("invalid choice `{other}`"),
    }

    println!("Waiting for a court...");
    let placement = server.receive().await?;
    if placement.code == Code::Nok {
        println!("No court is free right now, try again later.");
        return Ok(());
    }
    let endpoint = peer::parse_endpoint(&peer::expect(placement, Code::CourtFound)?.payload)?;
    println!("Court found at {endpoint}");

    let stream = TcpStream::connect(endpoint)
        .await
        .with_context(|| format!("could not reach the court at {endpoint}"))?;
    play(Connection::new(stream), &mut input).await
}

async fn wait_for_partner(
    server: &mut Connection<TcpStream>,
    input: &mut StdinLines,
) -> Result<()> {
    let info = peer::expect(server.receive().await?, Code::InfoPlayer)?;
    println!("Your player id is {}", info.payload);

    loop {
        println!("Waiting for an invitation...");
        let invite = peer::expect(server.receive().await?, Code::Invite)?;
        let (last_name, first_name) = invite
            .payload
            .split_once(':')
            .unwrap_or((invite.payload.as_str(), ""));
        let answer = peer::prompt(
            input,
            &format!("Invitation from {first_name} {last_name}. Accept? [y/n] "),
        )
        .await?;

        if answer.eq_ignore_ascii_case("y") {
            server.send(&ClientToServer::Accept.to_message()).await?;
            println!("Invitation accepted");
            return Ok(());
        }
        server.send(&ClientToServer::Decline.to_message()).await?;
        println!("Invitation declined");
    }
}

async fn invite_partner(server: &mut Connection<TcpStream>, input: &mut StdinLines) -> Result<()> {
    loop {
        let choice = peer::prompt(input, "Player id to invite (0 lists players): ").await?;
        let Ok(player_id) = choice.parse::<u32>() else {
            println!("Not a number");
            continue;
        };

        if player_id == 0 {
            let reply = server.request(&ClientToServer::AskPlayers.to_message()).await?;
            let players = parse_player_list(&peer::expect(reply, Code::ListPlayers)?.payload);
            if players.is_empty() {
                println!("Nobody is waiting");
            }
            for player in players {
                println!("-> [{}] {} {}", player.id, player.last_name, player.first_name);
            }
            continue;
        }

        println!("Invitation sent, waiting for an answer...");
        let reply = server
            .request(&ClientToServer::PlayWith { player_id }.to_message())
            .await?;
        if reply.code == Code::Ok {
            println!("Invitation accepted!");
            return Ok(());
        }
        println!("The player declined or does not exist, pick someone else");
    }
}

/// Each Enter press scores a point for this player.
async fn play(mut court: Connection<TcpStream>, input: &mut StdinLines) -> Result<()> {
    println!("Press Enter to score a point");
    loop {
        if input.next_line().await?.is_none() {
            return Ok(());
        }
        let reply = court
            .request(&Message::empty(Code::IncrementScore))
            .await?;
        match reply.code {
            Code::Ok => println!("Point scored"),
            Code::EndMatch => {
                println!("Match over!");
                return Ok(());
            }
            other => bail!("court refused the point: {other:?}"),
        }
    }
}
