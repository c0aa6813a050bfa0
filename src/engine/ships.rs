//! The static piece catalog: five ship kinds with fixed lengths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ShipKind {
    AircraftCarrier,
    Battleship,
    Submarine,
    Destroyer,
    PatrolShip,
}

impl ShipKind {
    /// Every kind, in catalog order. A full fleet is one of each.
    pub const ALL: [ShipKind; 5] = [
        ShipKind::AircraftCarrier,
        ShipKind::Battleship,
        ShipKind::Submarine,
        ShipKind::Destroyer,
        ShipKind::PatrolShip,
    ];

    /// Number of cells the ship occupies.
    pub fn spaces(self) -> u8 {
        match self {
            ShipKind::AircraftCarrier => 5,
            ShipKind::Battleship => 4,
            ShipKind::Submarine => 3,
            ShipKind::Destroyer => 3,
            ShipKind::PatrolShip => 2,
        }
    }

    /// Human-readable name.
    pub fn display_name(self) -> &'static str {
        match self {
            ShipKind::AircraftCarrier => "Aircraft Carrier",
            ShipKind::Battleship => "Battleship",
            ShipKind::Submarine => "Submarine",
            ShipKind::Destroyer => "Destroyer",
            ShipKind::PatrolShip => "Patrol Ship",
        }
    }

    /// Catalog identifier, as used in requests and storage.
    pub fn key(self) -> &'static str {
        match self {
            ShipKind::AircraftCarrier => "aircraft_carrier",
            ShipKind::Battleship => "battleship",
            ShipKind::Submarine => "submarine",
            ShipKind::Destroyer => "destroyer",
            ShipKind::PatrolShip => "patrol_ship",
        }
    }
}

impl fmt::Display for ShipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ShipKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShipKind::ALL
            .into_iter()
            .find(|kind| kind.key() == s)
            .ok_or(())
    }
}
