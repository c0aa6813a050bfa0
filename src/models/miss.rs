use serde::{Deserialize, Serialize};

/// One coordinate a given attacker-target pair has fired at and missed.
/// Keyed by (game, target player, coordinate); used to reject re-firing at
/// an already-resolved empty cell.
#[derive(Deserialize, Serialize, sqlx::FromRow, Debug, Clone)]
pub struct Miss {
    pub game_id: u32,
    pub target_player_id: u32,
    pub coordinate: String,
}
