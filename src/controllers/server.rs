use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use log::{error, info};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

use crate::controllers::user::player_names;
use crate::engine::ranking::{self, PlayerStanding};
use crate::errors::CustomError;
use crate::models::{game::Game, stats::Stats};

// One ranked entry: the standing plus its one-indexed position
#[derive(Deserialize, Serialize, Debug)]
pub struct RankingEntry {
    pub ranking: usize,
    #[serde(flatten)]
    pub standing: PlayerStanding,
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Handler for the user rankings over all finished games.
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn get_rankings(
    Extension(pool): Extension<MySqlPool>,
) -> Result<impl IntoResponse, CustomError> {
    info!("rankings request");

    let finished = fetch_finished_games(&pool).await?;
    let names = player_names(&pool, &finished).await?;

    let rankings: Vec<RankingEntry> = ranking::rank_players(&finished, &names)?
        .into_iter()
        .enumerate()
        .map(|(index, standing)| RankingEntry {
            ranking: index + 1,
            standing,
        })
        .collect();

    Ok((StatusCode::OK, Json(rankings)))
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Handler for the cached aggregate statistics. The cache row is maintained
// by the background job; until it has been primed once the numbers are
// computed live.
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn get_stats(
    Extension(pool): Extension<MySqlPool>,
) -> Result<impl IntoResponse, CustomError> {
    info!("stats request");

    let sql = "SELECT * FROM stats WHERE name='broadside'";
    if let Ok(stats) = sqlx::query_as::<_, Stats>(sql).fetch_one(&pool).await {
        return Ok((StatusCode::OK, Json(stats)));
    }

    info!("stats cache not primed yet, computing live");
    let finished = fetch_finished_games(&pool).await?;
    let stats = Stats {
        name: "broadside".to_string(),
        finished_games: finished.len() as u32,
        average_moves: ranking::average_moves(&finished).unwrap_or(0.0),
        refreshed: chrono::Local::now(),
    };
    Ok((StatusCode::OK, Json(stats)))
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Shared loading helper, also used by the background statistics job
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn fetch_finished_games(pool: &MySqlPool) -> Result<Vec<Game>, CustomError> {
    let sql = "SELECT * FROM game WHERE over=true";
    sqlx::query_as(sql).fetch_all(pool).await.map_err(|err| {
        error!("Error retrieving finished games: {:?}", err);
        CustomError::InternalServerError
    })
}
