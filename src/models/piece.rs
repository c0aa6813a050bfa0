use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::engine::board::Coordinate;
use crate::engine::ships::ShipKind;

#[derive(Deserialize, Serialize, sqlx::FromRow, Debug, Clone)]
pub struct Piece {
    /// Assigned by the database on insert; zero until persisted.
    pub id: u32,
    pub game_id: u32,
    pub owner_id: u32,
    pub ship: ShipKind,
    pub coordinates: Json<Vec<Coordinate>>,
    pub hit_marks: Json<Vec<Coordinate>>,
    pub sunk: bool,
}

impl Piece {
    pub fn occupies(&self, coordinate: Coordinate) -> bool {
        self.coordinates.contains(&coordinate)
    }

    pub fn is_hit_at(&self, coordinate: Coordinate) -> bool {
        self.hit_marks.contains(&coordinate)
    }

    /// Set equality of hit marks and coordinates. Hit marks are only ever
    /// appended from the coordinate set without duplicates, so comparing as
    /// sets is independent of insertion order.
    pub fn all_cells_hit(&self) -> bool {
        self.coordinates
            .iter()
            .all(|coord| self.hit_marks.contains(coord))
    }
}
