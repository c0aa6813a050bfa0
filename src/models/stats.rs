use chrono::Local;
use serde::{Deserialize, Serialize};

/// Cached aggregate statistics, refreshed by the background job.
#[derive(Deserialize, Serialize, sqlx::FromRow, Debug)]
pub struct Stats {
    pub name: String,
    pub finished_games: u32,
    pub average_moves: f64,
    pub refreshed: chrono::DateTime<Local>,
}
