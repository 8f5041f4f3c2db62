//! Classifies inbound frames and checks their structure before dispatch.

use crate::game::engine::{GameKind, Move, connect4, tictactoe};
use crate::game::error::SessionError;
use crate::game::messages::ClientMessage;
use serde_json::{Map, Value};

const KNOWN_TYPES: [&str; 5] = [
    "join_game",
    "create_game",
    "make_move",
    "restart_game",
    "get_game_state",
];

/// Where a validated frame goes
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Join,
    Move(Value),
    Restart,
    StateQuery,
    /// Unrecognized `type`: the original text is relayed to the rest of the match
    Relay { kind: String, raw: String },
}

impl From<ClientMessage> for Route {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::JoinGame | ClientMessage::CreateGame => Route::Join,
            ClientMessage::MakeMove { mv } => Route::Move(mv),
            ClientMessage::RestartGame => Route::Restart,
            ClientMessage::GetGameState => Route::StateQuery,
        }
    }
}

impl Route {
    pub fn name(&self) -> &str {
        match self {
            Route::Join => "join_game",
            Route::Move(_) => "make_move",
            Route::Restart => "restart_game",
            Route::StateQuery => "get_game_state",
            Route::Relay { kind, .. } => kind,
        }
    }
}

/// Structural validation: size ceiling, JSON object, string `type`.
pub fn route_frame(text: &str, max_bytes: usize) -> Result<Route, SessionError> {
    if text.len() > max_bytes {
        return Err(SessionError::FrameTooLarge {
            size: text.len(),
            limit: max_bytes,
        });
    }

    let value: Value =
        serde_json::from_str(text).map_err(|e| SessionError::MalformedFrame(e.to_string()))?;

    let kind = match value.as_object().map(|obj| obj.get("type")) {
        None => {
            return Err(SessionError::MalformedFrame(
                "frame must be a JSON object".to_string(),
            ));
        }
        Some(None) => {
            return Err(SessionError::MalformedFrame(
                "missing `type` field".to_string(),
            ));
        }
        Some(Some(Value::String(kind))) => kind.clone(),
        Some(Some(_)) => {
            return Err(SessionError::MalformedFrame(
                "`type` must be a string".to_string(),
            ));
        }
    };

    if !KNOWN_TYPES.contains(&kind.as_str()) {
        return Ok(Route::Relay {
            kind,
            raw: text.to_string(),
        });
    }

    serde_json::from_value::<ClientMessage>(value)
        .map(Route::from)
        .map_err(|e| SessionError::InvalidPayload(e.to_string()))
}

/// Schema check of a `make_move` payload for the match's game kind
pub fn parse_move(kind: GameKind, payload: &Value) -> Result<Move, SessionError> {
    let Some(fields) = payload.as_object() else {
        return Err(SessionError::InvalidPayload(
            "`move` must be an object".to_string(),
        ));
    };

    match kind {
        GameKind::Connect4 => {
            let column = index_field(fields, "column", connect4::COLS)?;
            Ok(Move::Drop { column })
        }
        GameKind::TicTacToe => {
            let row = index_field(fields, "row", tictactoe::SIZE)?;
            let col = index_field(fields, "col", tictactoe::SIZE)?;
            Ok(Move::Place { row, col })
        }
    }
}

fn index_field(fields: &Map<String, Value>, name: &str, bound: usize) -> Result<usize, SessionError> {
    let value = fields
        .get(name)
        .ok_or_else(|| SessionError::InvalidPayload(format!("missing `{name}`")))?;

    value
        .as_u64()
        .map(|v| v as usize)
        .filter(|v| *v < bound)
        .ok_or_else(|| {
            SessionError::InvalidPayload(format!(
                "`{name}` must be an integer between 0 and {}",
                bound - 1
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::messages::ErrorCode;
    use serde_json::json;

    const LIMIT: usize = 10 * 1024;

    #[test]
    fn create_game_is_an_alias_of_join() {
        assert_eq!(route_frame(r#"{"type":"create_game"}"#, LIMIT).unwrap(), Route::Join);
        assert_eq!(route_frame(r#"{"type":"join_game"}"#, LIMIT).unwrap(), Route::Join);
    }

    #[test]
    fn routes_known_types() {
        assert_eq!(
            route_frame(r#"{"type":"make_move","move":{"column":2}}"#, LIMIT).unwrap(),
            Route::Move(json!({"column": 2}))
        );
        assert_eq!(route_frame(r#"{"type":"restart_game"}"#, LIMIT).unwrap(), Route::Restart);
        assert_eq!(
            route_frame(r#"{"type":"get_game_state","extra":true}"#, LIMIT).unwrap(),
            Route::StateQuery
        );
    }

    #[test]
    fn unknown_type_falls_back_to_relay() {
        let raw = r#"{"type":"chat","text":"gg"}"#;
        assert_eq!(
            route_frame(raw, LIMIT).unwrap(),
            Route::Relay {
                kind: "chat".to_string(),
                raw: raw.to_string()
            }
        );
    }

    #[test]
    fn rejects_structurally_invalid_frames() {
        let missing_type = route_frame(r#"{"move":{}}"#, LIMIT).unwrap_err();
        assert_eq!(missing_type.error_code(), ErrorCode::MessageError);

        let not_json = route_frame("not json", LIMIT).unwrap_err();
        assert!(matches!(not_json, SessionError::MalformedFrame(_)));

        let array = route_frame("[1,2]", LIMIT).unwrap_err();
        assert!(matches!(array, SessionError::MalformedFrame(_)));

        let numeric_type = route_frame(r#"{"type":7}"#, LIMIT).unwrap_err();
        assert!(matches!(numeric_type, SessionError::MalformedFrame(_)));
    }

    #[test]
    fn rejects_oversized_frames() {
        let padding = "x".repeat(LIMIT);
        let frame = format!(r#"{{"type":"chat","text":"{padding}"}}"#);

        let err = route_frame(&frame, LIMIT).unwrap_err();
        assert!(matches!(err, SessionError::FrameTooLarge { limit: LIMIT, .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn make_move_without_payload_is_invalid() {
        let err = route_frame(r#"{"type":"make_move"}"#, LIMIT).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::ValidationFailed);
    }

    #[test]
    fn connect4_move_schema() {
        assert_eq!(
            parse_move(GameKind::Connect4, &json!({"column": 6})).unwrap(),
            Move::Drop { column: 6 }
        );
        assert!(parse_move(GameKind::Connect4, &json!({"column": 7})).is_err());
        assert!(parse_move(GameKind::Connect4, &json!({"column": -1})).is_err());
        assert!(parse_move(GameKind::Connect4, &json!({"column": "3"})).is_err());
        assert!(parse_move(GameKind::Connect4, &json!({"row": 1, "col": 1})).is_err());
    }

    #[test]
    fn tictactoe_move_schema() {
        assert_eq!(
            parse_move(GameKind::TicTacToe, &json!({"row": 2, "col": 0})).unwrap(),
            Move::Place { row: 2, col: 0 }
        );
        assert!(parse_move(GameKind::TicTacToe, &json!({"row": 3, "col": 0})).is_err());
        assert!(parse_move(GameKind::TicTacToe, &json!({"column": 1})).is_err());
        assert!(parse_move(GameKind::TicTacToe, &json!([0, 0])).is_err());
    }
}
