use portal_core::{LevelData, WorldPoint};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub type PlayerId = u32;

// JSON text framing shared by both directions.
pub trait WireMessage: Serialize + DeserializeOwned {
    fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

// Client → server. The connection layer knows which player sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Join {
        name: String,
    },
    // Desired horizontal direction; (0, 0) means coast.
    Input {
        x: f32,
        z: f32,
        #[serde(default)]
        jump: bool,
    },
    Leave,
}

impl WireMessage for ClientMessage {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub position: WorldPoint,
    pub velocity: WorldPoint,
    pub grounded: bool,
    pub progress: f32,
    pub finished: bool,
    pub is_bot: bool,
}

// Server → clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Level {
        level: LevelData,
    },
    State {
        tick: u64,
        players: Vec<PlayerState>,
    },
    PlayerJoined {
        player: PlayerState,
    },
    PlayerLeft {
        id: PlayerId,
    },
    // Sent once per player as they reach the end portal.
    RaceFinished {
        id: PlayerId,
        place: usize,
        ticks: u64,
    },
}

impl WireMessage for ServerMessage {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;

    #[test]
    fn client_messages_use_type_tags() {
        let msg = ClientMessage::decode(r#"{"type":"input","x":1.0,"z":-0.5}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Input {
                x: 1.0,
                z: -0.5,
                jump: false
            }
        );
        assert_eq!(ClientMessage::Leave.encode().unwrap(), r#"{"type":"leave"}"#);
    }

    #[test]
    fn server_fields_are_camel_case() {
        let text = ServerMessage::RaceFinished {
            id: 3,
            place: 1,
            ticks: 900,
        }
        .encode()
        .unwrap();
        assert_eq!(text, r#"{"type":"race_finished","id":3,"place":1,"ticks":900}"#);

        let joined = ServerMessage::PlayerJoined {
            player: PlayerState {
                id: 1,
                name: "ada".into(),
                position: WorldPoint::new(0.0, 1.0, 2.0),
                velocity: WorldPoint::new(0.0, 0.0, 0.0),
                grounded: true,
                progress: 0.0,
                finished: false,
                is_bot: false,
            },
        };
        let value: serde_json::Value = serde_json::from_str(&joined.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "player_joined");
        assert_eq!(value["player"]["isBot"], false);
    }

    #[test]
    fn garbage_is_a_json_error() {
        assert!(matches!(
            ClientMessage::decode(r#"{"type":"teleport"}"#),
            Err(ProtocolError::Json(_))
        ));
    }
}
