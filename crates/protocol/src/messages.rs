//! Message definitions for the client/server JSON protocol.
//!
//! Every message is an envelope of the form
//! `{"type": "SOME_TYPE", "data": {...}}` with camelCase data fields.

use crate::{LeaderboardEntry, Orb, Position, ProtocolError};
use serde::{Deserialize, Serialize};

/// Messages sent by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Register for a brand new match.
    NewClientNoCode { username: String },
    /// Join a running match by its code.
    #[serde(rename_all = "camelCase")]
    NewClientWithCode { username: String, game_code: String },
    /// Report one tick of movement: the new head cell and the vacated
    /// tail cell.
    UpdatePosition { add: Position, remove: Position },
}

/// Messages sent by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Generic acknowledgement (sent once when a socket opens).
    Success { msg: String },
    /// A join request was accepted.
    #[serde(rename_all = "camelCase")]
    JoinSuccess { msg: String, game_code: String },
    /// A join request was rejected.
    JoinError { msg: String },
    /// A request from an already-joined client was rejected.
    Error { msg: String },
    /// The authoritative code for the client's match.
    #[serde(rename_all = "camelCase")]
    SetGameCode { game_code: String },
    /// Full orb snapshot for the match.
    #[serde(rename_all = "camelCase")]
    SendOrbs { orb_set: Vec<Orb> },
    /// Sorted score board snapshot.
    UpdateLeaderboard { leaderboard: Vec<LeaderboardEntry> },
    /// Another player's movement delta.
    UpdatePosition { add: Position, remove: Position },
    /// The receiving client's own snake grew by these segments.
    #[serde(rename_all = "camelCase")]
    IncreaseOwnLength { new_body_parts: Vec<Position> },
    /// Another snake in the match grew by these segments.
    #[serde(rename_all = "camelCase")]
    IncreaseOtherLength { new_body_parts: Vec<Position> },
    /// Terminal notification: the receiving client's snake died.
    YouDied {},
    /// Another snake died; stop rendering these segments.
    #[serde(rename_all = "camelCase")]
    OtherUserDied { remove_positions: Vec<Position> },
}

/// Decode a client message from its JSON wire form.
pub fn decode(text: &str) -> Result<ClientMessage, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

/// Encode a server message into its JSON wire form.
pub fn encode(message: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrbSize;
    use serde_json::json;

    #[test]
    fn test_decode_new_client_no_code() {
        let text = r#"{"type":"NEW_CLIENT_NO_CODE","data":{"username":"viper"}}"#;
        match decode(text).unwrap() {
            ClientMessage::NewClientNoCode { username } => assert_eq!(username, "viper"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_decode_update_position() {
        let text = r#"{"type":"UPDATE_POSITION","data":{"add":{"x":10.5,"y":-3.0},"remove":{"x":600.0,"y":195.0}}}"#;
        match decode(text).unwrap() {
            ClientMessage::UpdatePosition { add, remove } => {
                assert_eq!(add, Position::new(10.5, -3.0));
                assert_eq!(remove, Position::new(600.0, 195.0));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        let text = r#"{"type":"NEW_CLIENT_WITH_CODE","data":{"username":"viper"}}"#;
        assert!(decode(text).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let text = r#"{"type":"SELF_DESTRUCT","data":{}}"#;
        assert!(decode(text).is_err());
    }

    #[test]
    fn test_encode_join_success_wire_shape() {
        let encoded = encode(&ServerMessage::JoinSuccess {
            msg: "New client added to new game".to_string(),
            game_code: "ABCDEF".to_string(),
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["type"], "JOIN_SUCCESS");
        assert_eq!(value["data"]["gameCode"], "ABCDEF");
    }

    #[test]
    fn test_encode_orbs_uses_camel_case_keys() {
        let encoded = encode(&ServerMessage::SendOrbs {
            orb_set: vec![Orb {
                position: Position::new(12.0, -40.5),
                orb_size: OrbSize::Large,
                color: "#ff0000".to_string(),
            }],
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(
            value["data"]["orbSet"][0],
            json!({"position": {"x": 12.0, "y": -40.5}, "orbSize": "LARGE", "color": "#ff0000"})
        );
    }

    #[test]
    fn test_encode_you_died_has_empty_data() {
        let encoded = encode(&ServerMessage::YouDied {}).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["type"], "YOU_DIED");
        assert_eq!(value["data"], json!({}));
    }
}
