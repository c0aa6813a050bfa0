//! Piece placement validation. Placement is only possible while the game is
//! in its setup phase; the fifth piece of the second player is what starts
//! the game.

use std::fmt;

use sqlx::types::Json;

use crate::engine::board::{self, Alignment, Coordinate, CoordinateError};
use crate::engine::ships::ShipKind;
use crate::models::game::Game;
use crate::models::piece::Piece;
use crate::models::user::User;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// Origin row/column do not form an on-grid coordinate.
    InvalidCoordinate(CoordinateError),
    /// The cell span would run off the board edge.
    OutOfBounds,
    /// The game has started; placement is closed for good.
    PlacementClosed,
    /// The player already placed a piece of this kind.
    DuplicateShip(ShipKind),
    /// The span intersects a piece the player already placed.
    Overlap(Coordinate),
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::InvalidCoordinate(e) => write!(f, "{}", e),
            PlacementError::OutOfBounds => write!(f, "Piece does not fit on the board"),
            PlacementError::PlacementClosed => {
                write!(f, "The game has started, pieces can no longer be placed")
            }
            PlacementError::DuplicateShip(kind) => {
                write!(f, "A {} has already been placed", kind)
            }
            PlacementError::Overlap(coord) => {
                write!(f, "Another piece already occupies {}", coord)
            }
        }
    }
}

impl From<CoordinateError> for PlacementError {
    fn from(err: CoordinateError) -> Self {
        PlacementError::InvalidCoordinate(err)
    }
}

/// Result of a successful placement: the updated game and the new piece,
/// both to be persisted by the caller.
#[derive(Debug, Clone)]
pub struct PlacementOutcome {
    pub game: Game,
    pub piece: Piece,
}

/// Validate and apply a placement request. `existing` must be every piece the
/// player has already placed in this game; the caller is responsible for
/// ensuring `player` is registered in `game`.
///
/// Validation order: coordinate format, board containment, placement still
/// open, per-player ship uniqueness, overlap against the player's own pieces.
pub fn place_piece(
    game: &Game,
    player: &User,
    ship: ShipKind,
    alignment: Alignment,
    origin_row: &str,
    origin_col: &str,
    existing: &[Piece],
) -> Result<PlacementOutcome, PlacementError> {
    let origin: Coordinate = format!("{}{}", origin_col, origin_row).parse()?;

    if !board::fits_on_board(alignment, ship.spaces(), origin) {
        return Err(PlacementError::OutOfBounds);
    }
    if game.started {
        return Err(PlacementError::PlacementClosed);
    }
    if existing.iter().any(|p| p.ship == ship) {
        return Err(PlacementError::DuplicateShip(ship));
    }

    let cells = board::cells_for_piece(alignment, ship.spaces(), origin);
    for cell in &cells {
        if existing.iter().any(|p| p.occupies(*cell)) {
            return Err(PlacementError::Overlap(*cell));
        }
    }

    let piece = Piece {
        id: 0,
        game_id: game.id,
        owner_id: player.id,
        ship,
        coordinates: Json(cells),
        hit_marks: Json(Vec::new()),
        sunk: false,
    };

    let mut game = game.clone();
    if existing.len() + 1 == ShipKind::ALL.len() {
        if player.id == game.player_one_id {
            game.player_one_pieces_loaded = true;
        } else {
            game.player_two_pieces_loaded = true;
        }
        // the only place a game can start
        if game.player_one_pieces_loaded && game.player_two_pieces_loaded {
            game.started = true;
        }
    }

    Ok(PlacementOutcome { game, piece })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u32, name: &str) -> User {
        User {
            id,
            name: name.to_string(),
            email_address: format!("{}@example.com", name),
            notify: false,
        }
    }

    fn fresh_game() -> Game {
        Game {
            id: 1,
            player_one_id: 1,
            player_two_id: Some(2),
            player_turn_id: 1,
            player_one_pieces_loaded: false,
            player_two_pieces_loaded: false,
            started: false,
            over: false,
            winner_id: None,
            history: Json(Vec::new()),
        }
    }

    #[test]
    fn patrol_ship_at_a1_occupies_a1_b1() {
        let game = fresh_game();
        let outcome = place_piece(
            &game,
            &user(1, "alice"),
            ShipKind::PatrolShip,
            Alignment::Horizontal,
            "1",
            "A",
            &[],
        )
        .unwrap();
        let cells: Vec<String> = outcome
            .piece
            .coordinates
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(cells, vec!["A1", "B1"]);
        assert!(outcome.piece.hit_marks.is_empty());
        assert!(!outcome.piece.sunk);
        assert!(!outcome.game.started);
    }

    #[test]
    fn patrol_ship_at_j1_runs_off_the_board() {
        let game = fresh_game();
        let err = place_piece(
            &game,
            &user(1, "alice"),
            ShipKind::PatrolShip,
            Alignment::Horizontal,
            "1",
            "J",
            &[],
        )
        .unwrap_err();
        assert_eq!(err, PlacementError::OutOfBounds);
    }

    #[test]
    fn bad_origin_is_rejected_before_bounds() {
        let game = fresh_game();
        let err = place_piece(
            &game,
            &user(1, "alice"),
            ShipKind::Submarine,
            Alignment::Vertical,
            "11",
            "A",
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, PlacementError::InvalidCoordinate(_)));
    }

    #[test]
    fn started_game_refuses_placement() {
        let mut game = fresh_game();
        game.started = true;
        let err = place_piece(
            &game,
            &user(1, "alice"),
            ShipKind::Destroyer,
            Alignment::Vertical,
            "1",
            "A",
            &[],
        )
        .unwrap_err();
        assert_eq!(err, PlacementError::PlacementClosed);
    }

    #[test]
    fn second_piece_of_same_kind_is_rejected() {
        let game = fresh_game();
        let alice = user(1, "alice");
        let first = place_piece(
            &game,
            &alice,
            ShipKind::Destroyer,
            Alignment::Vertical,
            "1",
            "A",
            &[],
        )
        .unwrap();
        let err = place_piece(
            &game,
            &alice,
            ShipKind::Destroyer,
            Alignment::Vertical,
            "1",
            "C",
            &[first.piece],
        )
        .unwrap_err();
        assert_eq!(err, PlacementError::DuplicateShip(ShipKind::Destroyer));
    }

    #[test]
    fn overlap_reports_first_colliding_cell() {
        let game = fresh_game();
        let alice = user(1, "alice");
        // submarine down column C: C3 C4 C5
        let first = place_piece(
            &game,
            &alice,
            ShipKind::Submarine,
            Alignment::Vertical,
            "3",
            "C",
            &[],
        )
        .unwrap();
        // battleship across row 4: A4 B4 C4 D4 -> collides at C4
        let err = place_piece(
            &game,
            &alice,
            ShipKind::Battleship,
            Alignment::Horizontal,
            "4",
            "A",
            &[first.piece],
        )
        .unwrap_err();
        assert_eq!(err, PlacementError::Overlap("C4".parse().unwrap()));
    }

    #[test]
    fn opposing_pieces_do_not_collide() {
        let game = fresh_game();
        // bob's pieces are not in alice's `existing` set, so the same cells
        // are free on his board
        let outcome = place_piece(
            &game,
            &user(2, "bob"),
            ShipKind::PatrolShip,
            Alignment::Horizontal,
            "1",
            "A",
            &[],
        )
        .unwrap();
        assert_eq!(outcome.piece.owner_id, 2);
    }

    /// Places the full fleet for one player, threading the game state through.
    fn place_fleet(mut game: Game, player: &User) -> Game {
        let mut placed: Vec<Piece> = Vec::new();
        for (i, kind) in ShipKind::ALL.into_iter().enumerate() {
            let row = (i + 1).to_string();
            let outcome = place_piece(
                &game,
                player,
                kind,
                Alignment::Horizontal,
                &row,
                "A",
                &placed,
            )
            .unwrap();
            game = outcome.game;
            placed.push(outcome.piece);
        }
        game
    }

    #[test]
    fn game_starts_on_second_players_fifth_piece_never_earlier() {
        let game = fresh_game();
        let alice = user(1, "alice");
        let bob = user(2, "bob");

        let game = place_fleet(game, &alice);
        assert!(game.player_one_pieces_loaded);
        assert!(!game.started);

        // bob's first four pieces leave the game in setup
        let mut bobs: Vec<Piece> = Vec::new();
        let mut game = game;
        for (i, kind) in ShipKind::ALL.into_iter().take(4).enumerate() {
            let row = (i + 1).to_string();
            let outcome =
                place_piece(&game, &bob, kind, Alignment::Horizontal, &row, "A", &bobs).unwrap();
            game = outcome.game;
            bobs.push(outcome.piece);
            assert!(!game.started);
        }

        let outcome = place_piece(
            &game,
            &bob,
            ShipKind::PatrolShip,
            Alignment::Horizontal,
            "5",
            "A",
            &bobs,
        )
        .unwrap();
        assert!(outcome.game.player_two_pieces_loaded);
        assert!(outcome.game.started);
    }
}
