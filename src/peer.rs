//! Helpers shared by the client programs.

use std::io::Write;
use std::net::SocketAddr;

use anyhow::{Context, Result, anyhow, bail};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::connection::Connection;
use crate::messages::{ClientToServer, Code, Message, Role};

pub type StdinLines = Lines<BufReader<Stdin>>;

pub fn stdin_lines() -> StdinLines {
    BufReader::new(tokio::io::stdin()).lines()
}

pub async fn connect(addr: impl ToSocketAddrs) -> Result<Connection<TcpStream>> {
    let stream = TcpStream::connect(addr)
        .await
        .context("could not reach the server")?;
    let conn = Connection::to_server(stream);
    debug!(connection = %conn.id(), "connected");
    Ok(conn)
}

/// Declares the role and waits for the server's `OK`.
pub async fn authenticate(conn: &mut Connection<TcpStream>, role: Role) -> Result<()> {
    let reply = conn.request(&ClientToServer::Auth(role).to_message()).await?;
    expect(reply, Code::Ok).context("authentication refused")?;
    Ok(())
}

/// Checks the code of a received message.
pub fn expect(message: Message, code: Code) -> Result<Message> {
    if message.code != code {
        bail!("expected {:?}, got {:?}", code, message.code);
    }
    Ok(message)
}

/// `ip:port` as sent in `COURT_FOUND`.
pub fn parse_endpoint(payload: &str) -> Result<SocketAddr> {
    let (ip, port) = payload
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("bad court endpoint `{payload}`"))?;
    let ip = ip.trim_start_matches('[').trim_end_matches(']');
    Ok(SocketAddr::new(
        ip.parse().with_context(|| format!("bad court address `{ip}`"))?,
        port.parse().with_context(|| format!("bad court port `{port}`"))?,
    ))
}

/// Prints `question` and reads one trimmed line of input.
pub async fn prompt(lines: &mut StdinLines, question: &str) -> Result<String> {
    print!("{question}");
    std::io::stdout().flush()?;
    let line = lines
        .next_line()
        .await?
        .ok_or_else(|| anyhow!("input closed"))?;
    Ok(line.trim().to_string())
}
