mod msg_client_to_server;
mod msg_coordinator;
mod msg_server_to_client;

pub use self::msg_client_to_server::*;
pub use self::msg_coordinator::*;
pub use self::msg_server_to_client::*;

/// Message codes. Values are fixed for interoperability with existing peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Code {
    Ok = 200,
    Nok = 400,
    Score = 2,
    Invite = 3,
    CourtFound = 4,
    ListPlayers = 5,
    InfoPlayer = 6,
    ListCourts = 7,
    AskCourts = 8,
    Subscribe = 9,
    Auth = 10,
    AskPlayers = 11,
    PlayWith = 12,
    IncrementScore = 13,
    ListenPort = 14,
    EndMatch = 15,
}

const ALL_CODES: [Code; 16] = [
    Code::Ok,
    Code::Nok,
    Code::Score,
    Code::Invite,
    Code::CourtFound,
    Code::ListPlayers,
    Code::InfoPlayer,
    Code::ListCourts,
    Code::AskCourts,
    Code::Subscribe,
    Code::Auth,
    Code::AskPlayers,
    Code::PlayWith,
    Code::IncrementScore,
    Code::ListenPort,
    Code::EndMatch,
];

impl Code {
    pub fn value(self) -> u16 {
        self as u16
    }

    /// The single byte carried on the wire. Codes above 255 keep their low
    /// byte only (`Ok` is 0xC8, `Nok` is 0x90).
    pub fn wire_byte(self) -> u8 {
        (self.value() & 0xff) as u8
    }

    pub fn from_wire_byte(byte: u8) -> Option<Self> {
        ALL_CODES.into_iter().find(|code| code.wire_byte() == byte)
    }
}

/// One logical message: a code and a text payload whose fields are `:`-separated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub code: Code,
    pub payload: String,
}

impl Message {
    pub fn new(code: Code, payload: impl Into<String>) -> Self {
        Self {
            code,
            payload: payload.into(),
        }
    }

    pub fn empty(code: Code) -> Self {
        Self::new(code, String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_bytes_are_unique() {
        for code in ALL_CODES {
            assert_eq!(Code::from_wire_byte(code.wire_byte()), Some(code));
        }
        assert_eq!(Code::Ok.wire_byte(), 200);
        assert_eq!(Code::Nok.wire_byte(), 144);
        assert_eq!(Code::Auth.wire_byte(), 10);
        assert_eq!(Code::from_wire_byte(0), None);
        assert_eq!(Code::from_wire_byte(16), None);
    }
}
