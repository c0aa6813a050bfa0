use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use sqlx::MySqlPool;

use crate::controllers::user::{fetch_user_by_id, fetch_user_by_name, player_names};
use crate::engine::board::{self, CellView, Coordinate};
use crate::engine::strike::strike as resolve_strike;
use crate::errors::CustomError;
use crate::models::{game::*, miss::Miss, piece::Piece};

// Game status plus both rendered boards, returned by get_game
#[derive(Deserialize, Serialize, Debug)]
pub struct GameStatusResponse {
    #[serde(flatten)]
    pub summary: GameSummary,
    pub player_one_board: Vec<CellView>,
    pub player_two_board: Option<Vec<CellView>>,
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Handler for creating a new game with one player, or two when the second
// player is named up front. Player one holds the first turn.
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn new_game(
    Extension(pool): Extension<MySqlPool>,
    Json(new_game): Json<NewGame>,
) -> Result<impl IntoResponse, CustomError> {
    info!("new game request");

    let player_one = fetch_user_by_name(&pool, &new_game.player_one).await?;

    let player_two_id = match &new_game.player_two {
        Some(name) => {
            if *name == player_one.name {
                error!("Player {} tried to start a game against themself", name);
                return Err(CustomError::InvalidGame);
            }
            Some(fetch_user_by_name(&pool, name).await?.id)
        }
        None => None,
    };

    let sql = "INSERT INTO game (player_one_id, player_two_id, player_turn_id, history) VALUES (?, ?, ?, ?)";
    let game_id = match sqlx::query(sql)
        .bind(player_one.id)
        .bind(player_two_id)
        .bind(player_one.id)
        .bind(SqlJson(Vec::<MoveLogEntry>::new()))
        .execute(&pool)
        .await
    {
        Ok(result) => result.last_insert_id() as u32,
        Err(err) => {
            error!("Error creating game: {:?}", err);
            return Err(CustomError::BadRequest);
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "game_id": game_id,
            "message": "Game created, place your pieces"
        })),
    ))
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Handler for joining an existing game as player two.
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn join_game(
    Path(game_id): Path<u32>,
    Extension(pool): Extension<MySqlPool>,
    Json(join): Json<JoinGame>,
) -> Result<impl IntoResponse, CustomError> {
    info!("join game request");

    let game = fetch_game(&pool, game_id).await?;
    if game.over {
        return Err(CustomError::GameAlreadyOver);
    }
    if game.player_two_id.is_some() {
        return Err(CustomError::GameFull);
    }

    let user = fetch_user_by_name(&pool, &join.user_name).await?;
    if user.id == game.player_one_id {
        error!("User {} is already a player in game {}", user.name, game_id);
        return Err(CustomError::InvalidGame);
    }

    // the IS NULL guard keeps a second concurrent join from taking the seat
    let sql = "UPDATE game SET player_two_id=? WHERE id=? AND player_two_id IS NULL";
    match sqlx::query(sql)
        .bind(user.id)
        .bind(game_id)
        .execute(&pool)
        .await
    {
        Ok(result) if result.rows_affected() == 0 => {
            info!("Game {} was joined concurrently", game_id);
            Err(CustomError::GameFull)
        }
        Ok(_) => Ok((StatusCode::OK, "Game joined, place your pieces")),
        Err(err) => {
            error!("Error joining game: {:?}", err);
            Err(CustomError::BadRequest)
        }
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Handler for fetching a game's status together with both board states.
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn get_game(
    Path(game_id): Path<u32>,
    Extension(pool): Extension<MySqlPool>,
) -> Result<impl IntoResponse, CustomError> {
    info!("get game request");

    let game = fetch_game(&pool, game_id).await?;
    let names = player_names(&pool, std::slice::from_ref(&game)).await?;
    let summary = GameSummary::build(&game, &names);

    let player_one_board = render_board(&pool, &game, game.player_one_id).await?;
    let player_two_board = match game.player_two_id {
        Some(id) => Some(render_board(&pool, &game, id).await?),
        None => None,
    };

    Ok((
        StatusCode::OK,
        Json(GameStatusResponse {
            summary,
            player_one_board,
            player_two_board,
        }),
    ))
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Handler for cancelling a game. The game and its pieces and miss records
// are deleted together; finished games cannot be cancelled.
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn cancel_game(
    Path(game_id): Path<u32>,
    Extension(pool): Extension<MySqlPool>,
) -> Result<impl IntoResponse, CustomError> {
    info!("cancel game request");

    let game = fetch_game(&pool, game_id).await?;
    if game.over {
        return Err(CustomError::GameAlreadyOver);
    }

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Error cancelling game: {:?}", err);
            return Err(CustomError::InternalServerError);
        }
    };

    for sql in [
        "DELETE FROM miss WHERE game_id=?",
        "DELETE FROM piece WHERE game_id=?",
        "DELETE FROM game WHERE id=?",
    ] {
        if let Err(err) = sqlx::query(sql).bind(game_id).execute(&mut tx).await {
            error!("Error cancelling game: {:?}", err);
            return Err(CustomError::BadRequest);
        }
    }

    if let Err(err) = tx.commit().await {
        error!("Error cancelling game: {:?}", err);
        return Err(CustomError::InternalServerError);
    }

    Ok((StatusCode::OK, "Game cancelled"))
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Handler for a game's move history, one-indexed for display.
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn game_history(
    Path(game_id): Path<u32>,
    Extension(pool): Extension<MySqlPool>,
) -> Result<impl IntoResponse, CustomError> {
    info!("game history request");

    let game = fetch_game(&pool, game_id).await?;
    let moves: Vec<MoveRecord> = game
        .history
        .iter()
        .enumerate()
        .map(|(index, entry)| MoveRecord {
            move_number: index + 1,
            entry: entry.clone(),
        })
        .collect();

    Ok((StatusCode::OK, Json(moves)))
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Handler for a strike. The attacker is whoever holds the turn; the request
// names the target and the coordinate. All entities are loaded up front,
// the engine resolves the strike, and the outcome is persisted in one
// transaction.
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn strike(
    Path(game_id): Path<u32>,
    Extension(pool): Extension<MySqlPool>,
    Json(request): Json<StrikeRequest>,
) -> Result<impl IntoResponse, CustomError> {
    info!("strike request");

    let game = fetch_game(&pool, game_id).await?;
    let target = fetch_user_by_name(&pool, &request.target_player).await?;
    if !game.has_player(target.id) {
        return Err(CustomError::PlayerNotRegistered);
    }
    let attacker = fetch_user_by_id(&pool, game.player_turn_id).await?;

    let target_pieces = fetch_pieces(&pool, game_id, target.id).await?;
    let target_misses = fetch_miss_coordinates(&pool, game_id, target.id).await?;

    let resolution = resolve_strike(
        &game,
        &attacker,
        &target,
        &request.coordinate,
        &target_pieces,
        &target_misses,
    )?;

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Error resolving strike: {:?}", err);
            return Err(CustomError::InternalServerError);
        }
    };

    // The turn holder in the WHERE clause serializes concurrent strikes:
    // a writer that raced ahead already flipped the turn, so the stale
    // writer matches no row and nothing of its resolution is committed.
    let sql = "UPDATE game SET player_turn_id=?, over=?, winner_id=?, history=? WHERE id=? AND player_turn_id=?";
    match sqlx::query(sql)
        .bind(resolution.game.player_turn_id)
        .bind(resolution.game.over)
        .bind(resolution.game.winner_id)
        .bind(&resolution.game.history)
        .bind(game_id)
        .bind(game.player_turn_id)
        .execute(&mut tx)
        .await
    {
        Ok(result) if result.rows_affected() == 0 => {
            info!("Strike on game {} lost a concurrent update race", game_id);
            return Err(CustomError::ConcurrentUpdate);
        }
        Ok(_) => {}
        Err(err) => {
            error!("Error resolving strike: {:?}", err);
            return Err(CustomError::BadRequest);
        }
    }

    if let Some(piece) = &resolution.struck_piece {
        let sql = "UPDATE piece SET hit_marks=?, sunk=? WHERE id=?";
        if let Err(err) = sqlx::query(sql)
            .bind(&piece.hit_marks)
            .bind(piece.sunk)
            .bind(piece.id)
            .execute(&mut tx)
            .await
        {
            error!("Error resolving strike: {:?}", err);
            return Err(CustomError::BadRequest);
        }
    }

    if let Some(miss) = &resolution.miss {
        let sql = "INSERT INTO miss (game_id, target_player_id, coordinate) VALUES (?, ?, ?)";
        if let Err(err) = sqlx::query(sql)
            .bind(miss.game_id)
            .bind(miss.target_player_id)
            .bind(&miss.coordinate)
            .execute(&mut tx)
            .await
        {
            error!("Error resolving strike: {:?}", err);
            return Err(CustomError::BadRequest);
        }
    }

    if let Err(err) = tx.commit().await {
        error!("Error resolving strike: {:?}", err);
        return Err(CustomError::InternalServerError);
    }

    Ok((
        StatusCode::OK,
        Json(MoveRecord {
            move_number: resolution.move_number,
            entry: resolution.entry,
        }),
    ))
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Shared loading helpers
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn fetch_game(pool: &MySqlPool, game_id: u32) -> Result<Game, CustomError> {
    let sql = "SELECT * FROM game WHERE id=?";
    sqlx::query_as(sql)
        .bind(game_id)
        .fetch_one(pool)
        .await
        .map_err(|err| {
            error!("Error retrieving game {}: {:?}", game_id, err);
            CustomError::GameNotFound
        })
}

pub async fn fetch_pieces(
    pool: &MySqlPool,
    game_id: u32,
    owner_id: u32,
) -> Result<Vec<Piece>, CustomError> {
    let sql = "SELECT * FROM piece WHERE game_id=? AND owner_id=?";
    sqlx::query_as(sql)
        .bind(game_id)
        .bind(owner_id)
        .fetch_all(pool)
        .await
        .map_err(|err| {
            error!("Error retrieving pieces for game {}: {:?}", game_id, err);
            CustomError::InternalServerError
        })
}

pub async fn fetch_miss_coordinates(
    pool: &MySqlPool,
    game_id: u32,
    target_player_id: u32,
) -> Result<Vec<Coordinate>, CustomError> {
    let sql = "SELECT * FROM miss WHERE game_id=? AND target_player_id=?";
    let misses: Vec<Miss> = sqlx::query_as(sql)
        .bind(game_id)
        .bind(target_player_id)
        .fetch_all(pool)
        .await
        .map_err(|err| {
            error!("Error retrieving misses for game {}: {:?}", game_id, err);
            CustomError::InternalServerError
        })?;

    misses
        .iter()
        .map(|miss| {
            miss.coordinate.parse().map_err(|err| {
                error!("Stored miss coordinate is corrupt: {:?}", err);
                CustomError::InternalServerError
            })
        })
        .collect()
}

async fn render_board(
    pool: &MySqlPool,
    game: &Game,
    player_id: u32,
) -> Result<Vec<CellView>, CustomError> {
    let pieces = fetch_pieces(pool, game.id, player_id).await?;
    let misses = fetch_miss_coordinates(pool, game.id, player_id).await?;
    Ok(board::board_state(&pieces, &misses))
}
