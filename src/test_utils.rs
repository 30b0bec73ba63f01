use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::time::timeout;

use crate::connection::Connection;
use crate::messages::{Code, Message};

/// Two framed ends of an in-memory pipe: `(client, server)`.
pub fn connection_pair() -> (Connection<DuplexStream>, Connection<DuplexStream>) {
    let (client, server) = tokio::io::duplex(4096);
    (Connection::to_server(client), Connection::new(server))
}

/// Receives the next message and checks its code.
pub async fn expect_code<S>(conn: &mut Connection<S>, code: Code) -> Message
where
    S: AsyncRead + AsyncWrite,
{
    let message = timeout(Duration::from_secs(2), conn.receive())
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {code:?}"))
        .unwrap_or_else(|e| panic!("connection failed waiting for {code:?}: {e}"));
    assert_eq!(message.code, code, "unexpected message {message:?}");
    message
}

/// Asserts nothing arrives for `period`.
pub async fn expect_silence<S>(conn: &mut Connection<S>, period: Duration)
where
    S: AsyncRead + AsyncWrite,
{
    if let Ok(received) = timeout(period, conn.receive()).await {
        panic!("expected silence, got {received:?}");
    }
}
