use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::engine::board::Coordinate;
use crate::engine::ships::ShipKind;
use crate::engine::strike::GamePhase;

#[derive(Deserialize, Serialize, sqlx::FromRow, Debug, Clone)]
pub struct Game {
    pub id: u32,
    pub player_one_id: u32,
    pub player_two_id: Option<u32>,
    pub player_turn_id: u32,
    pub player_one_pieces_loaded: bool,
    pub player_two_pieces_loaded: bool,
    pub started: bool,
    pub over: bool,
    pub winner_id: Option<u32>,
    pub history: Json<Vec<MoveLogEntry>>,
}

impl Game {
    /// Current phase of the forward-only game lifecycle.
    pub fn phase(&self) -> GamePhase {
        if self.over {
            GamePhase::Finished
        } else if self.started {
            GamePhase::InProgress
        } else {
            GamePhase::Setup
        }
    }

    pub fn has_player(&self, user_id: u32) -> bool {
        self.player_one_id == user_id || self.player_two_id == Some(user_id)
    }

    /// The other registered player, when both seats are taken.
    pub fn opponent_of(&self, user_id: u32) -> Option<u32> {
        if user_id == self.player_one_id {
            self.player_two_id
        } else if self.player_two_id == Some(user_id) {
            Some(self.player_one_id)
        } else {
            None
        }
    }
}

/// Outcome classification of a resolved strike, most severe first.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStatus {
    #[serde(rename = "Hit-SunkShip-GameOver")]
    HitSunkShipGameOver,
    #[serde(rename = "Hit-SunkShip")]
    HitSunkShip,
    Hit,
    Miss,
}

impl fmt::Display for MoveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MoveStatus::HitSunkShipGameOver => "Hit-SunkShip-GameOver",
            MoveStatus::HitSunkShip => "Hit-SunkShip",
            MoveStatus::Hit => "Hit",
            MoveStatus::Miss => "Miss",
        };
        f.write_str(s)
    }
}

/// One resolved strike, as stored in the game's append-only history.
/// Stored zero-indexed; move numbers in responses are one-indexed.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MoveLogEntry {
    pub target_player_name: String,
    pub attacking_player_name: String,
    pub target_coordinate: Coordinate,
    pub status: MoveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship_kind: Option<ShipKind>,
}

// The struct used for receiving the players of a new game as json
#[derive(Deserialize, Serialize, Debug)]
pub struct NewGame {
    pub player_one: String,
    pub player_two: Option<String>,
}

// The struct used for receiving the joining player as json
#[derive(Deserialize, Serialize, Debug)]
pub struct JoinGame {
    pub user_name: String,
}

// The struct used for receiving a strike as json
#[derive(Deserialize, Serialize, Debug)]
pub struct StrikeRequest {
    pub target_player: String,
    pub coordinate: String,
}

/// Game status with player ids resolved to names, used in responses.
#[derive(Deserialize, Serialize, Debug)]
pub struct GameSummary {
    pub game_id: u32,
    pub player_one: String,
    pub player_two: Option<String>,
    pub player_turn: String,
    pub player_one_pieces_loaded: bool,
    pub player_two_pieces_loaded: bool,
    pub started: bool,
    pub over: bool,
    pub winner: Option<String>,
}

impl GameSummary {
    pub fn build(game: &Game, names: &HashMap<u32, String>) -> Self {
        fn name_of(names: &HashMap<u32, String>, id: u32) -> String {
            names.get(&id).cloned().unwrap_or_default()
        }
        GameSummary {
            game_id: game.id,
            player_one: name_of(names, game.player_one_id),
            player_two: game.player_two_id.map(|id| name_of(names, id)),
            player_turn: name_of(names, game.player_turn_id),
            player_one_pieces_loaded: game.player_one_pieces_loaded,
            player_two_pieces_loaded: game.player_two_pieces_loaded,
            started: game.started,
            over: game.over,
            winner: game.winner_id.map(|id| name_of(names, id)),
        }
    }
}

/// A history entry paired with its one-indexed position.
#[derive(Deserialize, Serialize, Debug)]
pub struct MoveRecord {
    pub move_number: usize,
    #[serde(flatten)]
    pub entry: MoveLogEntry,
}
