//! Board geometry: the coordinate value type, span generation and the
//! rendered board state used in game status responses.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::models::piece::Piece;

/// Columns run A..J, rows 1..10. The grid is their Cartesian product.
pub const BOARD_SIZE: u8 = 10;
pub const COLUMNS: [char; BOARD_SIZE as usize] =
    ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J'];

/// Orientation of a piece on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Horizontal,
    Vertical,
}

/// Errors produced when validating a coordinate string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinateError {
    /// String is not of the form `<letter><digits>`.
    Malformed(String),
    /// Well-formed but outside the A..J / 1..10 grid.
    OutOfRange(String),
}

impl fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateError::Malformed(s) => write!(f, "'{}' is not a valid coordinate", s),
            CoordinateError::OutOfRange(s) => write!(f, "'{}' is not on the board", s),
        }
    }
}

/// One cell of the grid, stored as zero-based column and row indices.
/// The canonical serialized form is `"<COLUMN><ROW>"`, e.g. `"C3"` or `"J10"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coordinate {
    col: u8,
    row: u8,
}

impl Coordinate {
    /// Build a coordinate from zero-based indices, rejecting off-grid values.
    pub fn new(col: u8, row: u8) -> Result<Self, CoordinateError> {
        if col >= BOARD_SIZE || row >= BOARD_SIZE {
            return Err(CoordinateError::OutOfRange(format!("({},{})", col, row)));
        }
        Ok(Coordinate { col, row })
    }

    /// Zero-based column index (0 = A).
    pub fn col(&self) -> u8 {
        self.col
    }

    /// Zero-based row index (0 = row 1).
    pub fn row(&self) -> u8 {
        self.row
    }

    /// Column letter as displayed, A..J.
    pub fn column_letter(&self) -> char {
        COLUMNS[self.col as usize]
    }

    /// Row number as displayed, 1..10.
    pub fn row_number(&self) -> u8 {
        self.row + 1
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letter(), self.row_number())
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    /// Accepts only `<letter A-J><1-10>`; the letter is case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let letter = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
            _ => return Err(CoordinateError::Malformed(s.to_string())),
        };
        let digits = chars.as_str();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoordinateError::Malformed(s.to_string()));
        }
        // no leading zeros: "C03" is not a row label
        if digits.len() > 1 && digits.starts_with('0') {
            return Err(CoordinateError::Malformed(s.to_string()));
        }
        let col = match COLUMNS.iter().position(|&c| c == letter) {
            Some(i) => i as u8,
            None => return Err(CoordinateError::OutOfRange(s.to_string())),
        };
        let row: u8 = digits
            .parse()
            .map_err(|_| CoordinateError::Malformed(s.to_string()))?;
        if row < 1 || row > BOARD_SIZE {
            return Err(CoordinateError::OutOfRange(s.to_string()));
        }
        Ok(Coordinate { col, row: row - 1 })
    }
}

impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// True iff a piece of `length` cells starting at `origin` stays within the
/// 10-cell extent along the placement axis. Must hold before calling
/// `cells_for_piece`.
pub fn fits_on_board(alignment: Alignment, length: u8, origin: Coordinate) -> bool {
    match alignment {
        Alignment::Horizontal => origin.col() + length <= BOARD_SIZE,
        Alignment::Vertical => origin.row() + length <= BOARD_SIZE,
    }
}

/// All cells occupied by a piece, in walk order from the origin. Horizontal
/// pieces fix the row and walk consecutive columns; vertical pieces fix the
/// column and walk consecutive rows.
pub fn cells_for_piece(alignment: Alignment, length: u8, origin: Coordinate) -> Vec<Coordinate> {
    debug_assert!(fits_on_board(alignment, length, origin));
    (0..length)
        .map(|i| match alignment {
            Alignment::Horizontal => Coordinate {
                col: origin.col + i,
                row: origin.row,
            },
            Alignment::Vertical => Coordinate {
                col: origin.col,
                row: origin.row + i,
            },
        })
        .collect()
}

/// What a single cell looks like from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    Empty,
    Occupied,
    Miss,
    Hit,
}

/// One rendered cell of a player's board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellView {
    pub column: char,
    pub row: u8,
    pub value: CellStatus,
}

/// Render a player's full board from their pieces and the misses recorded
/// against them. Cells are emitted column-major, A1..A10, B1..B10, ...
pub fn board_state(pieces: &[Piece], misses: &[Coordinate]) -> Vec<CellView> {
    let mut grid = [[CellStatus::Empty; BOARD_SIZE as usize]; BOARD_SIZE as usize];
    for miss in misses {
        grid[miss.col as usize][miss.row as usize] = CellStatus::Miss;
    }
    for piece in pieces {
        for coord in piece.coordinates.iter() {
            grid[coord.col as usize][coord.row as usize] = CellStatus::Occupied;
        }
        for coord in piece.hit_marks.iter() {
            grid[coord.col as usize][coord.row as usize] = CellStatus::Hit;
        }
    }
    let mut cells = Vec::with_capacity((BOARD_SIZE as usize) * (BOARD_SIZE as usize));
    for col in 0..BOARD_SIZE {
        for row in 0..BOARD_SIZE {
            cells.push(CellView {
                column: COLUMNS[col as usize],
                row: row + 1,
                value: grid[col as usize][row as usize],
            });
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_coordinates() {
        let c: Coordinate = "C3".parse().unwrap();
        assert_eq!((c.col(), c.row()), (2, 2));
        assert_eq!(c.to_string(), "C3");

        // letter is case-insensitive, J10 is the far corner
        let c: Coordinate = "j10".parse().unwrap();
        assert_eq!((c.col(), c.row()), (9, 9));
        assert_eq!(c.to_string(), "J10");

        let c: Coordinate = "a1".parse().unwrap();
        assert_eq!((c.col(), c.row()), (0, 0));
    }

    #[test]
    fn rejects_invalid_coordinates() {
        for bad in ["", "C", "3", "33", "C0", "C11", "K1", "1A", "C3x", "CC3"] {
            assert!(bad.parse::<Coordinate>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn rejects_leading_zeros_in_the_row() {
        for bad in ["C03", "C003", "A01", "J010"] {
            assert_eq!(
                bad.parse::<Coordinate>(),
                Err(CoordinateError::Malformed(bad.to_string())),
                "accepted {:?}",
                bad
            );
        }
        // the bare zero row is off the grid, not malformed
        assert_eq!(
            "C0".parse::<Coordinate>(),
            Err(CoordinateError::OutOfRange("C0".to_string()))
        );
    }

    #[test]
    fn coordinate_order_is_column_major() {
        let a1: Coordinate = "A1".parse().unwrap();
        let a2: Coordinate = "A2".parse().unwrap();
        let b1: Coordinate = "B1".parse().unwrap();
        assert!(a1 < a2);
        assert!(a2 < b1);
    }

    #[test]
    fn horizontal_walk_fixes_row() {
        let origin: Coordinate = "A1".parse().unwrap();
        let cells = cells_for_piece(Alignment::Horizontal, 2, origin);
        let rendered: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
        assert_eq!(rendered, vec!["A1", "B1"]);
    }

    #[test]
    fn vertical_walk_fixes_column() {
        let origin: Coordinate = "C3".parse().unwrap();
        let cells = cells_for_piece(Alignment::Vertical, 3, origin);
        let rendered: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
        assert_eq!(rendered, vec!["C3", "C4", "C5"]);
    }

    #[test]
    fn fits_on_board_checks_the_walk_axis() {
        let j1: Coordinate = "J1".parse().unwrap();
        assert!(!fits_on_board(Alignment::Horizontal, 2, j1));
        assert!(fits_on_board(Alignment::Vertical, 10, "J1".parse().unwrap()));
        assert!(!fits_on_board(Alignment::Vertical, 2, "A10".parse().unwrap()));
        assert!(fits_on_board(Alignment::Horizontal, 5, "F1".parse().unwrap()));
        assert!(!fits_on_board(Alignment::Horizontal, 5, "G1".parse().unwrap()));
    }

    #[test]
    fn coordinate_serializes_as_string() {
        let c: Coordinate = "B7".parse().unwrap();
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"B7\"");
        let back: Coordinate = serde_json::from_str("\"b7\"").unwrap();
        assert_eq!(back, c);
    }
}
