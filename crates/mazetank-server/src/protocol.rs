use serde::{Deserialize, Serialize};

use mazetank_sim::{GameEvent, Snapshot};

/// Maximum encoded message size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

/// Leading byte identifying the payload that follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Snapshot = 0x01,
    Event = 0x02,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Snapshot),
            0x02 => Some(Self::Event),
            _ => None,
        }
    }
}

/// Everything the simulation host pushes to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Snapshot(Snapshot),
    Event(GameEvent),
}

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a payload behind a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::Snapshot(s) => encode_message(MessageType::Snapshot, s),
        ServerMessage::Event(e) => encode_message(MessageType::Event, e),
    }
}

fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode wire bytes back into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let Some(&first) = data.first() else {
        return Err(ProtocolError::EmptyMessage);
    };
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    match MessageType::from_byte(first) {
        Some(MessageType::Snapshot) => Ok(ServerMessage::Snapshot(decode_payload(data)?)),
        Some(MessageType::Event) => Ok(ServerMessage::Event(decode_payload(data)?)),
        None => Err(ProtocolError::UnknownMessageType(first)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use mazetank_sim::player::PlayerColor;
    use mazetank_sim::snapshot::{BulletSnapshot, LaserSnapshot, PlayerSnapshot};

    use super::*;

    #[test]
    fn snapshot_survives_the_wire() {
        let mut players = BTreeMap::new();
        players.insert(
            3,
            PlayerSnapshot {
                x: 250.0,
                y: 410.5,
                angle: 1.25,
                alive: true,
                color: PlayerColor {
                    r: 10,
                    g: 20,
                    b: 30,
                },
                name: "Ada".to_string(),
                has_laser_active: true,
            },
        );
        let snapshot = Snapshot {
            tick: 42,
            players,
            bullets: vec![BulletSnapshot {
                x: 1.0,
                y: 2.0,
                angle: 0.5,
                speed: 300.0,
            }],
            crystals: Vec::new(),
            lasers: vec![LaserSnapshot {
                x: 5.0,
                y: 6.0,
                angle: 0.0,
                reflected_points: vec![(986.0, 6.0), (214.0, 6.0)],
            }],
        };
        let msg = ServerMessage::Snapshot(snapshot);
        let data = encode_server_message(&msg).unwrap();
        assert_eq!(data[0], MessageType::Snapshot as u8);
        assert_eq!(decode_server_message(&data).unwrap(), msg);
    }

    #[test]
    fn event_survives_the_wire() {
        let mut wins = BTreeMap::new();
        wins.insert(1, 2);
        wins.insert(2, 0);
        let msg = ServerMessage::Event(GameEvent::GameOver {
            winner: 1,
            winner_name: "A".to_string(),
            wins,
        });
        let data = encode_server_message(&msg).unwrap();
        assert_eq!(data[0], MessageType::Event as u8);
        assert_eq!(decode_server_message(&data).unwrap(), msg);
    }

    #[test]
    fn empty_message_rejected() {
        assert!(matches!(
            decode_server_message(&[]),
            Err(ProtocolError::EmptyMessage)
        ));
    }

    #[test]
    fn unknown_type_rejected() {
        assert!(matches!(
            decode_server_message(&[0x7f, 0x00]),
            Err(ProtocolError::UnknownMessageType(0x7f))
        ));
    }

    #[test]
    fn truncated_payload_rejected() {
        let msg = ServerMessage::Event(GameEvent::PlayerJoined {
            player_id: 1,
            name: "Somebody".to_string(),
        });
        let data = encode_server_message(&msg).unwrap();
        let truncated = &data[..data.len() / 2];
        assert!(matches!(
            decode_server_message(truncated),
            Err(ProtocolError::DeserializeError(_))
        ));
    }

    #[test]
    fn oversized_payload_rejected() {
        let huge = "x".repeat(MAX_MESSAGE_SIZE);
        let result = encode_message(MessageType::Event, &huge);
        assert!(matches!(result, Err(ProtocolError::PayloadTooLarge(_))));
    }

    #[test]
    fn error_display_names_the_problem() {
        assert_eq!(
            ProtocolError::UnknownMessageType(0xab).to_string(),
            "unknown message type: 0xab"
        );
    }
}
