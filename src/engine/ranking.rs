//! Win/loss aggregation over finished games and the ranking score.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::game::Game;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankingError {
    NoGamesPlayed,
}

impl fmt::Display for RankingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingError::NoGamesPlayed => write!(f, "No games have been completed yet"),
        }
    }
}

/// One user's aggregated record, ordered by descending score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStanding {
    pub username: String,
    pub games_won: u32,
    pub games_lost: u32,
    pub score: f64,
}

/// Aggregate every finished game into per-user standings.
///
/// The winner of each game is credited a win and the other registered player
/// a loss. With `total` the system-wide count of finished games:
/// `score = win_diff / total` when `total <= 1`, otherwise
/// `score = win_diff / total + log_total(games_played)`. The log term is
/// computed as `ln(games_played) / ln(total)`, which is well-defined for
/// every reachable input once `total > 1` (`games_played >= 1` always holds
/// for a user that appears in some finished game).
pub fn rank_players(
    finished: &[Game],
    names: &HashMap<u32, String>,
) -> Result<Vec<PlayerStanding>, RankingError> {
    let total = finished.len();
    if total == 0 {
        return Err(RankingError::NoGamesPlayed);
    }

    // BTreeMap keeps the pre-sort order deterministic so ties stay stable
    let mut tally: BTreeMap<u32, (u32, u32)> = BTreeMap::new();
    for game in finished {
        let winner = match game.winner_id {
            Some(id) => id,
            // a game cannot be over without a winner; skip rather than crash
            None => continue,
        };
        let loser = if winner == game.player_one_id {
            game.player_two_id
        } else {
            Some(game.player_one_id)
        };
        tally.entry(winner).or_insert((0, 0)).0 += 1;
        if let Some(loser) = loser {
            tally.entry(loser).or_insert((0, 0)).1 += 1;
        }
    }

    let mut standings: Vec<PlayerStanding> = tally
        .into_iter()
        .map(|(user_id, (wins, losses))| {
            let win_diff = wins as f64 - losses as f64;
            let games_played = (wins + losses) as f64;
            let mut score = win_diff / total as f64;
            if total > 1 {
                score += games_played.ln() / (total as f64).ln();
            }
            PlayerStanding {
                username: names.get(&user_id).cloned().unwrap_or_default(),
                games_won: wins,
                games_lost: losses,
                score,
            }
        })
        .collect();

    standings.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    Ok(standings)
}

/// Average number of moves per finished game, `None` when there are none.
pub fn average_moves(finished: &[Game]) -> Option<f64> {
    if finished.is_empty() {
        return None;
    }
    let moves: usize = finished.iter().map(|g| g.history.len()).sum();
    Some(moves as f64 / finished.len() as f64)
}
