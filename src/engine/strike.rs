//! Strike resolution: the per-game state machine. A game moves forward
//! through `Setup -> InProgress -> Finished` and never back. Resolving a
//! strike is a pure transition: it takes the loaded game, the target's
//! pieces and miss records, and returns the updated values plus the history
//! entry, leaving persistence to the caller.

use std::fmt;

use crate::engine::board::{Coordinate, CoordinateError};
use crate::models::game::{Game, MoveLogEntry, MoveStatus};
use crate::models::miss::Miss;
use crate::models::piece::Piece;
use crate::models::user::User;

/// Lifecycle phase of a game. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Setup,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrikeError {
    GameAlreadyOver,
    GameNotStarted,
    /// The resolved target holds the turn, i.e. the attacker is firing at
    /// their own board.
    SelfStrikeForbidden,
    InvalidCoordinate(CoordinateError),
    /// Coordinate already recorded as a hit on the target.
    DuplicateHit(Coordinate),
    /// Coordinate already recorded as a miss against the target.
    DuplicateMiss(Coordinate),
}

impl fmt::Display for StrikeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrikeError::GameAlreadyOver => write!(f, "The game is already over"),
            StrikeError::GameNotStarted => write!(f, "The game has not started yet"),
            StrikeError::SelfStrikeForbidden => {
                write!(f, "You cannot strike your own board")
            }
            StrikeError::InvalidCoordinate(e) => write!(f, "{}", e),
            StrikeError::DuplicateHit(c) => write!(f, "{} was already hit", c),
            StrikeError::DuplicateMiss(c) => {
                write!(f, "{} was already fired at and missed", c)
            }
        }
    }
}

impl From<CoordinateError> for StrikeError {
    fn from(err: CoordinateError) -> Self {
        StrikeError::InvalidCoordinate(err)
    }
}

/// Everything a committed strike changes, to be persisted atomically:
/// the updated game, at most one updated piece, at most one new miss
/// record, and the appended history entry with its one-indexed number.
#[derive(Debug, Clone)]
pub struct StrikeResolution {
    pub game: Game,
    pub struck_piece: Option<Piece>,
    pub miss: Option<Miss>,
    pub entry: MoveLogEntry,
    pub move_number: usize,
}

/// Resolve one strike by `attacker` against `target`'s board.
///
/// The caller resolves `target` by name and loads `attacker` as the holder of
/// the game's turn. `target_pieces` and `target_misses` must be the complete
/// sets for the (game, target) pair. Validation is side-effect-free; on the
/// first failing precondition nothing has been built or changed.
pub fn strike(
    game: &Game,
    attacker: &User,
    target: &User,
    raw_coordinate: &str,
    target_pieces: &[Piece],
    target_misses: &[Coordinate],
) -> Result<StrikeResolution, StrikeError> {
    match game.phase() {
        GamePhase::Finished => return Err(StrikeError::GameAlreadyOver),
        GamePhase::Setup => return Err(StrikeError::GameNotStarted),
        GamePhase::InProgress => {}
    }
    if target.id == game.player_turn_id {
        return Err(StrikeError::SelfStrikeForbidden);
    }
    let coordinate: Coordinate = raw_coordinate.parse()?;
    if target_pieces.iter().any(|p| p.is_hit_at(coordinate)) {
        return Err(StrikeError::DuplicateHit(coordinate));
    }
    if target_misses.contains(&coordinate) {
        return Err(StrikeError::DuplicateMiss(coordinate));
    }

    let mut game = game.clone();

    // Turn passes to the other player exactly once per resolved strike,
    // before the outcome is known. An in-progress game always has both
    // seats taken.
    game.player_turn_id = match game.opponent_of(game.player_turn_id) {
        Some(id) => id,
        None => return Err(StrikeError::GameNotStarted),
    };

    let mut struck_piece = None;
    let mut miss = None;

    // A coordinate belongs to at most one piece (non-overlap invariant),
    // so the first owning piece is the only one.
    let (status, ship_kind) = match target_pieces.iter().find(|p| p.occupies(coordinate)) {
        Some(piece) => {
            let mut piece = piece.clone();
            piece.hit_marks.push(coordinate);
            piece.sunk = piece.all_cells_hit();

            let fleet_sunk = piece.sunk
                && target_pieces
                    .iter()
                    .filter(|p| p.ship != piece.ship)
                    .all(|p| p.sunk);

            let status = if fleet_sunk {
                game.over = true;
                game.winner_id = Some(attacker.id);
                MoveStatus::HitSunkShipGameOver
            } else if piece.sunk {
                MoveStatus::HitSunkShip
            } else {
                MoveStatus::Hit
            };
            let kind = piece.ship;
            struck_piece = Some(piece);
            (status, Some(kind))
        }
        None => {
            miss = Some(Miss {
                game_id: game.id,
                target_player_id: target.id,
                coordinate: coordinate.to_string(),
            });
            (MoveStatus::Miss, None)
        }
    };

    let entry = MoveLogEntry {
        target_player_name: target.name.clone(),
        attacking_player_name: attacker.name.clone(),
        target_coordinate: coordinate,
        status,
        ship_kind,
    };
    // appended after the state mutation so history length is the move number
    game.history.push(entry.clone());
    let move_number = game.history.len();

    Ok(StrikeResolution {
        game,
        struck_piece,
        miss,
        entry,
        move_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::board::{self, Alignment};
    use crate::engine::ships::ShipKind;
    use sqlx::types::Json;

    fn user(id: u32, name: &str) -> User {
        User {
            id,
            name: name.to_string(),
            email_address: format!("{}@example.com", name),
            notify: false,
        }
    }

    fn started_game() -> Game {
        Game {
            id: 7,
            player_one_id: 1,
            player_two_id: Some(2),
            player_turn_id: 1,
            player_one_pieces_loaded: true,
            player_two_pieces_loaded: true,
            started: true,
            over: false,
            winner_id: None,
            history: Json(Vec::new()),
        }
    }

    fn piece(owner: u32, ship: ShipKind, origin: &str, alignment: Alignment) -> Piece {
        let origin: Coordinate = origin.parse().unwrap();
        Piece {
            id: 0,
            game_id: 7,
            owner_id: owner,
            ship,
            coordinates: Json(board::cells_for_piece(alignment, ship.spaces(), origin)),
            hit_marks: Json(Vec::new()),
            sunk: false,
        }
    }

    #[test]
    fn hit_marks_the_piece_and_flips_the_turn() {
        let game = started_game();
        let bobs = vec![piece(2, ShipKind::Submarine, "C3", Alignment::Vertical)];

        let res = strike(&game, &user(1, "alice"), &user(2, "bob"), "C4", &bobs, &[]).unwrap();
        assert_eq!(res.game.player_turn_id, 2);
        assert_eq!(res.entry.status, MoveStatus::Hit);
        assert_eq!(res.entry.ship_kind, Some(ShipKind::Submarine));
        assert_eq!(res.entry.attacking_player_name, "alice");
        assert_eq!(res.entry.target_player_name, "bob");
        assert_eq!(res.move_number, 1);
        assert!(res.miss.is_none());

        let struck = res.struck_piece.unwrap();
        assert!(struck.is_hit_at("C4".parse().unwrap()));
        assert!(!struck.sunk);
        assert!(!res.game.over);
    }

    #[test]
    fn miss_flips_the_turn_and_records_a_miss() {
        let game = started_game();
        let bobs = vec![piece(2, ShipKind::Submarine, "C3", Alignment::Vertical)];

        let res = strike(&game, &user(1, "alice"), &user(2, "bob"), "J10", &bobs, &[]).unwrap();
        assert_eq!(res.game.player_turn_id, 2);
        assert_eq!(res.entry.status, MoveStatus::Miss);
        assert_eq!(res.entry.ship_kind, None);
        assert!(res.struck_piece.is_none());

        let miss = res.miss.unwrap();
        assert_eq!(miss.target_player_id, 2);
        assert_eq!(miss.coordinate, "J10");
    }

    #[test]
    fn last_cell_of_a_piece_sinks_it() {
        let game = started_game();
        let mut patrol = piece(2, ShipKind::PatrolShip, "A1", Alignment::Horizontal);
        patrol.hit_marks.push("B1".parse().unwrap());
        // another ship afloat keeps the game going
        let bobs = vec![
            patrol,
            piece(2, ShipKind::Destroyer, "E5", Alignment::Vertical),
        ];

        let res = strike(&game, &user(1, "alice"), &user(2, "bob"), "A1", &bobs, &[]).unwrap();
        assert_eq!(res.entry.status, MoveStatus::HitSunkShip);
        assert!(res.struck_piece.unwrap().sunk);
        assert!(!res.game.over);
        assert_eq!(res.game.winner_id, None);
    }

    #[test]
    fn sinking_the_last_piece_ends_the_game() {
        let game = started_game();
        let mut patrol = piece(2, ShipKind::PatrolShip, "A1", Alignment::Horizontal);
        patrol.hit_marks.push("B1".parse().unwrap());
        let mut destroyer = piece(2, ShipKind::Destroyer, "E5", Alignment::Vertical);
        destroyer.hit_marks = destroyer.coordinates.clone();
        destroyer.sunk = true;
        let bobs = vec![patrol, destroyer];

        let res = strike(&game, &user(1, "alice"), &user(2, "bob"), "A1", &bobs, &[]).unwrap();
        assert_eq!(res.entry.status, MoveStatus::HitSunkShipGameOver);
        assert!(res.game.over);
        assert_eq!(res.game.winner_id, Some(1));
        // turn still flipped even on the winning strike
        assert_eq!(res.game.player_turn_id, 2);
    }

    #[test]
    fn turn_alternates_for_both_outcomes() {
        let mut game = started_game();
        let alices = vec![piece(1, ShipKind::PatrolShip, "H8", Alignment::Vertical)];
        let bobs = vec![piece(2, ShipKind::PatrolShip, "A1", Alignment::Horizontal)];
        let alice = user(1, "alice");
        let bob = user(2, "bob");

        // alice hits
        let res = strike(&game, &alice, &bob, "A1", &bobs, &[]).unwrap();
        game = res.game;
        assert_eq!(game.player_turn_id, 2);

        // bob misses
        let res = strike(&game, &bob, &alice, "C5", &alices, &[]).unwrap();
        game = res.game;
        assert_eq!(game.player_turn_id, 1);
        assert_eq!(game.history.len(), 2);
    }

    #[test]
    fn finished_game_rejects_strikes() {
        let mut game = started_game();
        game.over = true;
        game.winner_id = Some(1);
        let err = strike(&game, &user(1, "alice"), &user(2, "bob"), "A1", &[], &[]).unwrap_err();
        assert_eq!(err, StrikeError::GameAlreadyOver);
    }

    #[test]
    fn setup_game_rejects_strikes() {
        let mut game = started_game();
        game.started = false;
        let err = strike(&game, &user(1, "alice"), &user(2, "bob"), "A1", &[], &[]).unwrap_err();
        assert_eq!(err, StrikeError::GameNotStarted);
    }

    #[test]
    fn striking_the_turn_holder_is_a_self_strike() {
        let game = started_game();
        // player_turn is 1, so targeting player 1 means firing at yourself
        let err = strike(&game, &user(1, "alice"), &user(1, "alice"), "A1", &[], &[]).unwrap_err();
        assert_eq!(err, StrikeError::SelfStrikeForbidden);
    }

    #[test]
    fn off_grid_coordinate_is_rejected() {
        let game = started_game();
        for bad in ["K1", "A11", "A0", "banana"] {
            let err =
                strike(&game, &user(1, "alice"), &user(2, "bob"), bad, &[], &[]).unwrap_err();
            assert!(matches!(err, StrikeError::InvalidCoordinate(_)));
        }
    }

    #[test]
    fn duplicate_hit_and_miss_are_rejected_without_effects() {
        let game = started_game();
        let mut sub = piece(2, ShipKind::Submarine, "C3", Alignment::Vertical);
        sub.hit_marks.push("C3".parse().unwrap());
        let bobs = vec![sub];
        let misses = vec!["F6".parse::<Coordinate>().unwrap()];

        let err = strike(&game, &user(1, "alice"), &user(2, "bob"), "C3", &bobs, &misses)
            .unwrap_err();
        assert_eq!(err, StrikeError::DuplicateHit("C3".parse().unwrap()));

        let err = strike(&game, &user(1, "alice"), &user(2, "bob"), "F6", &bobs, &misses)
            .unwrap_err();
        assert_eq!(err, StrikeError::DuplicateMiss("F6".parse().unwrap()));

        // rejection happened before any mutation: caller's game is untouched
        assert_eq!(game.player_turn_id, 1);
        assert!(game.history.is_empty());
    }

    #[test]
    fn move_numbers_follow_history_length() {
        let mut game = started_game();
        let alices = vec![piece(1, ShipKind::PatrolShip, "H8", Alignment::Vertical)];
        let bobs = vec![piece(2, ShipKind::PatrolShip, "A1", Alignment::Horizontal)];
        let alice = user(1, "alice");
        let bob = user(2, "bob");

        let res = strike(&game, &alice, &bob, "J1", &bobs, &[]).unwrap();
        assert_eq!(res.move_number, 1);
        game = res.game;
        let res = strike(&game, &bob, &alice, "J2", &alices, &[]).unwrap();
        assert_eq!(res.move_number, 2);
        assert_eq!(res.game.history[1], res.entry);
    }
}
