//! Framed message stream over any bidirectional byte stream.
//!
//! A frame is `[code byte][UTF-8 payload][0x00]`. The terminator is a NUL
//! byte because the code byte of `AUTH` is 10 and would collide with a
//! newline delimiter.

use std::fmt;
use std::io;

use thiserror::Error;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use uuid::Uuid;

use crate::messages::{Code, Message};

pub const FRAME_END: u8 = 0;
/// Inbound limit for frames sent by peers to the server.
pub const MAX_FRAME_LEN: usize = 1024;
/// Inbound limit on the peer side, where listings grow with the pools.
pub const MAX_REPLY_LEN: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("connection closed by peer")]
    Closed,
    #[error("frame exceeds {0} bytes")]
    TooLarge(usize),
    #[error("empty frame")]
    Empty,
    #[error("unknown code byte {0}")]
    UnknownCode(u8),
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("payload contains a NUL byte")]
    NulInPayload,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Opaque identity of one accepted connection, used in logs and as the
/// connection handle stored in registry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn encode(message: &Message) -> Result<Vec<u8>, FrameError> {
    if message.payload.as_bytes().contains(&FRAME_END) {
        return Err(FrameError::NulInPayload);
    }
    let mut frame = Vec::with_capacity(message.payload.len() + 2);
    frame.push(message.code.wire_byte());
    frame.extend_from_slice(message.payload.as_bytes());
    frame.push(FRAME_END);
    Ok(frame)
}

/// Decodes a frame body (terminator already stripped).
pub fn decode(frame: &[u8]) -> Result<Message, FrameError> {
    let (&byte, payload) = frame.split_first().ok_or(FrameError::Empty)?;
    let code = Code::from_wire_byte(byte).ok_or(FrameError::UnknownCode(byte))?;
    let payload = std::str::from_utf8(payload).map_err(|_| FrameError::InvalidUtf8)?;
    Ok(Message::new(code, payload))
}

/// `send`/`receive` primitive used by every session worker.
pub struct Connection<S> {
    id: ConnectionId,
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    pending: Vec<u8>,
    max_frame_len: usize,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Server side of a connection: inbound frames are capped at `MAX_FRAME_LEN`.
    pub fn new(stream: S) -> Self {
        Self::with_frame_limit(stream, MAX_FRAME_LEN)
    }

    /// Peer side of a connection to the server, which accepts replies up to
    /// `MAX_REPLY_LEN`.
    pub fn to_server(stream: S) -> Self {
        Self::with_frame_limit(stream, MAX_REPLY_LEN)
    }

    pub fn with_frame_limit(stream: S, max_frame_len: usize) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            id: ConnectionId::new(),
            reader: BufReader::new(reader),
            writer,
            pending: Vec::new(),
            max_frame_len,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), FrameError> {
        let frame = encode(message)?;
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads the next frame. Cancel safe: bytes of a partially read frame are
    /// kept until the frame completes.
    pub async fn receive(&mut self) -> Result<Message, FrameError> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Err(FrameError::Closed);
            }

            let (complete, consumed) = match available.iter().position(|b| *b == FRAME_END) {
                Some(end) => {
                    self.pending.extend_from_slice(&available[..end]);
                    (true, end + 1)
                }
                None => {
                    self.pending.extend_from_slice(available);
                    (false, available.len())
                }
            };
            self.reader.consume(consumed);

            if self.pending.len() >= self.max_frame_len {
                self.pending.clear();
                return Err(FrameError::TooLarge(self.max_frame_len));
            }
            if complete {
                let frame = std::mem::take(&mut self.pending);
                return decode(&frame);
            }
        }
    }

    /// Sends `request` and waits for the next message.
    pub async fn request(&mut self, request: &Message) -> Result<Message, FrameError> {
        self.send(request).await?;
        self.receive().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_send_receive_over_duplex() {
        let (left, right) = tokio::io::duplex(256);
        let mut a = Connection::new(left);
        let mut b = Connection::new(right);

        a.send(&Message::new(Code::Auth, "2:Doe:John")).await.unwrap();
        a.send(&Message::empty(Code::AskPlayers)).await.unwrap();

        assert_eq!(
            b.receive().await.unwrap(),
            Message::new(Code::Auth, "2:Doe:John")
        );
        assert_eq!(b.receive().await.unwrap(), Message::empty(Code::AskPlayers));
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_frame_split_across_writes() {
        let (mut raw, right) = tokio::io::duplex(64);
        let mut conn = Connection::new(right);

        raw.write_all(&[Code::Nok.wire_byte(), b'a']).await.unwrap();
        raw.write_all(b"bc\0").await.unwrap();
        assert_eq!(conn.receive().await.unwrap(), Message::new(Code::Nok, "abc"));
    }

    #[tokio::test]
    async fn test_closed_and_invalid_frames() {
        let (mut raw, right) = tokio::io::duplex(64);
        let mut conn = Connection::new(right);

        raw.write_all(&[99, b'x', 0]).await.unwrap();
        assert!(matches!(
            conn.receive().await,
            Err(FrameError::UnknownCode(99))
        ));

        drop(raw);
        assert!(matches!(conn.receive().await, Err(FrameError::Closed)));
    }

    #[tokio::test]
    async fn test_oversized_frame() {
        let (mut raw, right) = tokio::io::duplex(4096);
        let mut conn = Connection::new(right);

        raw.write_all(&vec![b'x'; MAX_FRAME_LEN + 10]).await.unwrap();
        assert!(matches!(
            conn.receive().await,
            Err(FrameError::TooLarge(MAX_FRAME_LEN))
        ));
    }

    #[tokio::test]
    async fn test_large_reply_reaches_peer() {
        let (left, right) = tokio::io::duplex(4096);
        let mut server = Connection::new(left);
        let mut peer = Connection::to_server(right);

        let payload = "x".repeat(MAX_FRAME_LEN * 4);
        let sender = tokio::spawn(async move {
            server
                .send(&Message::new(Code::ListPlayers, payload))
                .await
                .unwrap();
        });
        let received = peer.receive().await.unwrap();
        assert_eq!(received.payload.len(), MAX_FRAME_LEN * 4);
        sender.await.unwrap();
    }

    #[test]
    fn test_encode_rejects_nul() {
        let message = Message::new(Code::Score, "a\0b");
        assert!(matches!(encode(&message), Err(FrameError::NulInPayload)));
        assert_eq!(
            encode(&Message::empty(Code::Ok)).unwrap(),
            vec![200, FRAME_END]
        );
    }
}
