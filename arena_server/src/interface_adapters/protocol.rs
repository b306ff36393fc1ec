// Wire protocol DTOs and conversions for the arena WebSocket.
// Every frame is a `{ "type": ..., "payload": ... }` JSON envelope.

use crate::domain::{
    GamePhase, GameSnapshot, Obstacle, Player, PlayerAction, PlayerStatus, Position,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum ServerMessage {
    // Full game state after any accepted mutation (and on connect).
    GameStateUpdate(SnapshotDto),
    // Rejection sent only to the requester; the game state is untouched.
    ActionInvalid {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    JoinedAsPlayer {
        player_id: String,
    },
    JoinedAsSpectator {
        message: String,
    },
    // Follows every state update while the match is finished. `None` on a draw.
    #[serde(rename_all = "camelCase")]
    GameOver {
        winner_pseudo: Option<String>,
    },
    GameReset {
        message: String,
    },
}

impl ServerMessage {
    pub fn action_invalid(message: impl Into<String>) -> Self {
        ServerMessage::ActionInvalid {
            message: message.into(),
        }
    }
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    JoinGame(JoinPayload),
    RequestAction(ActionRequestDto),
    ResetGame,
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid JSON message")]
    InvalidJson,
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

// Raw envelope; the payload is decoded once the type is known.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl ClientMessage {
    /// Decodes one inbound text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|_| ProtocolError::InvalidJson)?;

        // A missing or null payload reads as an empty object.
        let payload = match envelope.payload {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        match envelope.kind.as_str() {
            "JOIN_GAME" => serde_json::from_value(payload)
                .map(ClientMessage::JoinGame)
                .map_err(|source| ProtocolError::InvalidPayload {
                    kind: "JOIN_GAME",
                    source,
                }),
            "REQUEST_ACTION" => serde_json::from_value(payload)
                .map(ClientMessage::RequestAction)
                .map_err(|source| ProtocolError::InvalidPayload {
                    kind: "REQUEST_ACTION",
                    source,
                }),
            "RESET_GAME" => Ok(ClientMessage::ResetGame),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

/// Payload for `JOIN_GAME`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    #[serde(default)]
    pub pseudo: String,
    #[serde(default, alias = "color")]
    pub couleur: Option<String>,
    #[serde(default)]
    pub grid_size: Option<GridSizeDto>,
}

/// Browsers send the grid size from a `<select>`, so it may be a number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum GridSizeDto {
    Number(u64),
    Text(String),
}

impl JoinPayload {
    /// Requested grid size, or `None` when absent. Unparseable values map to `Some(0)`,
    /// which the engine rejects like any other size outside the allowed set.
    pub fn requested_grid_size(&self) -> Option<u32> {
        match self.grid_size.as_ref()? {
            GridSizeDto::Number(n) => Some(u32::try_from(*n).unwrap_or(0)),
            GridSizeDto::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(text.parse().unwrap_or(0))
                }
            }
        }
    }
}

/// Payload for `REQUEST_ACTION`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequestDto {
    pub action_type: String,
    #[serde(default)]
    pub target: Option<PositionDto>,
}

impl TryFrom<ActionRequestDto> for PlayerAction {
    type Error = ValidationError;

    fn try_from(request: ActionRequestDto) -> Result<Self, Self::Error> {
        PlayerAction::from_parts(&request.action_type, request.target.map(Position::from))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDto {
    pub x: i32,
    pub y: i32,
}

impl From<PositionDto> for Position {
    fn from(pos: PositionDto) -> Self {
        Position::new(pos.x, pos.y)
    }
}

impl From<Position> for PositionDto {
    fn from(pos: Position) -> Self {
        Self { x: pos.x, y: pos.y }
    }
}

/// Snapshot of the game sent with every `GAME_STATE_UPDATE`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    pub grid_size: Option<u32>,
    pub players: Vec<PlayerDto>,
    pub obstacles: Vec<ObstacleDto>,
    pub game_status: GameStatusDto,
    pub current_player_turn: Option<String>,
    // Winner pseudo; clients display it directly.
    pub winner: Option<String>,
    pub winner_id: Option<String>,
}

impl From<&GameSnapshot> for SnapshotDto {
    fn from(snapshot: &GameSnapshot) -> Self {
        Self {
            grid_size: snapshot.grid_size,
            players: snapshot.players.iter().map(PlayerDto::from).collect(),
            obstacles: snapshot.obstacles.iter().map(ObstacleDto::from).collect(),
            game_status: snapshot.phase.into(),
            current_player_turn: snapshot.current_turn.map(|id| id.to_string()),
            winner: snapshot.winner.as_ref().map(|w| w.pseudo.clone()),
            winner_id: snapshot.winner.as_ref().map(|w| w.id.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub id: String,
    pub pseudo: String,
    pub couleur: String,
    pub pdv: u32,
    pub obstacles_restants: u32,
    pub position: Option<PositionDto>,
    pub status: PlayerStatusDto,
}

impl From<&Player> for PlayerDto {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.to_string(),
            pseudo: player.pseudo.clone(),
            couleur: player.color.clone(),
            pdv: player.health,
            obstacles_restants: player.obstacle_charges,
            position: player.position.map(PositionDto::from),
            status: player.status.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ObstacleDto {
    pub id: String,
    pub position: PositionDto,
    pub pdv: u32,
}

impl From<&Obstacle> for ObstacleDto {
    fn from(obstacle: &Obstacle) -> Self {
        Self {
            id: obstacle.id.to_string(),
            position: obstacle.position.into(),
            pdv: obstacle.health,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameStatusDto {
    Lobby,
    InProgress,
    Finished,
}

impl From<GamePhase> for GameStatusDto {
    fn from(phase: GamePhase) -> Self {
        match phase {
            GamePhase::Lobby => GameStatusDto::Lobby,
            GamePhase::InProgress => GameStatusDto::InProgress,
            GamePhase::Finished => GameStatusDto::Finished,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayerStatusDto {
    Active,
    Defeated,
}

impl From<PlayerStatus> for PlayerStatusDto {
    fn from(status: PlayerStatus) -> Self {
        match status {
            PlayerStatus::Active => PlayerStatusDto::Active,
            PlayerStatus::Defeated => PlayerStatusDto::Defeated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Winner;
    use serde_json::json;

    #[test]
    fn when_join_frame_uses_color_alias_and_string_grid_size_then_it_parses() {
        let msg = ClientMessage::parse(
            r##"{"type":"JOIN_GAME","payload":{"pseudo":"Ana","color":"#f00","gridSize":"12"}}"##,
        )
        .expect("valid join");

        let ClientMessage::JoinGame(join) = msg else {
            panic!("expected join");
        };
        assert_eq!(join.pseudo, "Ana");
        assert_eq!(join.couleur.as_deref(), Some("#f00"));
        assert_eq!(join.requested_grid_size(), Some(12));
    }

    #[test]
    fn when_grid_size_is_missing_or_garbage_then_it_maps_to_none_or_zero() {
        let none = ClientMessage::parse(r#"{"type":"JOIN_GAME","payload":{"pseudo":"Ana"}}"#)
            .expect("valid join");
        let garbage = ClientMessage::parse(
            r#"{"type":"JOIN_GAME","payload":{"pseudo":"Ana","gridSize":"huge"}}"#,
        )
        .expect("valid join");

        let (ClientMessage::JoinGame(none), ClientMessage::JoinGame(garbage)) = (none, garbage)
        else {
            panic!("expected joins");
        };
        assert_eq!(none.requested_grid_size(), None);
        assert_eq!(garbage.requested_grid_size(), Some(0));
    }

    #[test]
    fn when_reset_frame_has_no_payload_then_it_parses() {
        let msg = ClientMessage::parse(r#"{"type":"RESET_GAME"}"#).expect("valid reset");
        assert_eq!(msg, ClientMessage::ResetGame);
    }

    #[test]
    fn when_frame_is_not_json_then_invalid_json_is_reported() {
        assert!(matches!(
            ClientMessage::parse("{not json"),
            Err(ProtocolError::InvalidJson)
        ));
    }

    #[test]
    fn when_type_is_unknown_then_it_is_named_in_the_error() {
        let err = ClientMessage::parse(r#"{"type":"DANCE","payload":{}}"#).unwrap_err();
        assert_eq!(err.to_string(), "unknown message type: DANCE");
    }

    #[test]
    fn when_action_payload_lacks_action_type_then_payload_is_invalid() {
        let err = ClientMessage::parse(r#"{"type":"REQUEST_ACTION","payload":{}}"#).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidPayload {
                kind: "REQUEST_ACTION",
                ..
            }
        ));
    }

    #[test]
    fn when_action_request_converts_then_domain_action_is_built() {
        let request = ActionRequestDto {
            action_type: "ATTACK".to_string(),
            target: Some(PositionDto { x: 2, y: 3 }),
        };
        assert_eq!(
            PlayerAction::try_from(request),
            Ok(PlayerAction::Attack(Position::new(2, 3)))
        );

        let missing = ActionRequestDto {
            action_type: "MOVE".to_string(),
            target: None,
        };
        assert_eq!(
            PlayerAction::try_from(missing),
            Err(ValidationError::MissingTarget)
        );
    }

    #[test]
    fn when_snapshot_is_serialized_then_wire_shape_matches_clients() {
        let snapshot = GameSnapshot {
            grid_size: Some(8),
            players: vec![Player {
                id: 7,
                pseudo: "Ana".to_string(),
                color: "#f00".to_string(),
                health: 75,
                obstacle_charges: 2,
                position: None,
                status: PlayerStatus::Defeated,
            }],
            obstacles: vec![Obstacle {
                id: 1,
                position: Position::new(1, 1),
                health: 50,
            }],
            phase: GamePhase::Finished,
            current_turn: None,
            winner: Some(Winner {
                id: 9,
                pseudo: "Bo".to_string(),
            }),
        };

        let value =
            serde_json::to_value(ServerMessage::GameStateUpdate(SnapshotDto::from(&snapshot)))
                .expect("serialize");

        assert_eq!(
            value,
            json!({
                "type": "GAME_STATE_UPDATE",
                "payload": {
                    "gridSize": 8,
                    "players": [{
                        "id": "7",
                        "pseudo": "Ana",
                        "couleur": "#f00",
                        "pdv": 75,
                        "obstaclesRestants": 2,
                        "position": null,
                        "status": "Defeated"
                    }],
                    "obstacles": [{ "id": "1", "position": { "x": 1, "y": 1 }, "pdv": 50 }],
                    "gameStatus": "Finished",
                    "currentPlayerTurn": null,
                    "winner": "Bo",
                    "winnerId": "9"
                }
            })
        );
    }

    #[test]
    fn when_direct_replies_serialize_then_payload_keys_are_camel_case() {
        let joined = serde_json::to_value(ServerMessage::JoinedAsPlayer {
            player_id: "3".to_string(),
        })
        .expect("serialize");
        let over = serde_json::to_value(ServerMessage::GameOver {
            winner_pseudo: None,
        })
        .expect("serialize");

        assert_eq!(
            joined,
            json!({ "type": "JOINED_AS_PLAYER", "payload": { "playerId": "3" } })
        );
        assert_eq!(
            over,
            json!({ "type": "GAME_OVER", "payload": { "winnerPseudo": null } })
        );
    }
}
