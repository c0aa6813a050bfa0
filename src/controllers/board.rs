use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

use crate::controllers::game::{fetch_game, fetch_pieces};
use crate::controllers::user::fetch_user_by_name;
use crate::engine::board::{Alignment, Coordinate};
use crate::engine::placement::{self, PlacementError};
use crate::engine::ships::ShipKind;
use crate::errors::CustomError;

// The struct used for receiving a placement request as json
#[derive(Deserialize, Serialize, Debug)]
pub struct PlacePiece {
    pub player_name: String,
    pub ship: ShipKind,
    pub alignment: Alignment,
    pub row: String,
    pub column: String,
}

// Details of the placed piece, echoed back to the caller
#[derive(Deserialize, Serialize, Debug)]
pub struct PieceDetails {
    pub game_id: u32,
    pub owner: String,
    pub ship: ShipKind,
    pub coordinates: Vec<Coordinate>,
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Handler for placing a piece during setup. The engine validates the span
// and may flip the game to started; the new piece and the updated game
// flags are persisted in one transaction.
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn place_piece(
    Path(game_id): Path<u32>,
    Extension(pool): Extension<MySqlPool>,
    Json(request): Json<PlacePiece>,
) -> Result<impl IntoResponse, CustomError> {
    info!("place piece request");

    let game = fetch_game(&pool, game_id).await?;
    let player = fetch_user_by_name(&pool, &request.player_name).await?;
    if !game.has_player(player.id) {
        return Err(CustomError::PlayerNotRegistered);
    }

    let existing = fetch_pieces(&pool, game_id, player.id).await?;

    let outcome = placement::place_piece(
        &game,
        &player,
        request.ship,
        request.alignment,
        &request.row,
        &request.column,
        &existing,
    )?;

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Error placing piece: {:?}", err);
            return Err(CustomError::InternalServerError);
        }
    };

    let sql =
        "INSERT INTO piece (game_id, owner_id, ship, coordinates, hit_marks, sunk) VALUES (?, ?, ?, ?, ?, ?)";
    if let Err(err) = sqlx::query(sql)
        .bind(outcome.piece.game_id)
        .bind(outcome.piece.owner_id)
        .bind(outcome.piece.ship)
        .bind(&outcome.piece.coordinates)
        .bind(&outcome.piece.hit_marks)
        .bind(outcome.piece.sunk)
        .execute(&mut tx)
        .await
    {
        // the unique (game_id, owner_id, ship) key catches a concurrent
        // placement of the same kind that slipped past the loaded state
        let duplicate = err
            .as_database_error()
            .map_or(false, |db| db.code().as_deref() == Some("23000"));
        if duplicate {
            info!("Concurrent duplicate placement in game {}", game_id);
            return Err(CustomError::Placement(PlacementError::DuplicateShip(
                request.ship,
            )));
        }
        error!("Error placing piece: {:?}", err);
        return Err(CustomError::BadRequest);
    }

    // only an unstarted game accepts the flag update; a race that started
    // the game in the meantime matches no row
    let sql =
        "UPDATE game SET player_one_pieces_loaded=?, player_two_pieces_loaded=?, started=? WHERE id=? AND started=false";
    match sqlx::query(sql)
        .bind(outcome.game.player_one_pieces_loaded)
        .bind(outcome.game.player_two_pieces_loaded)
        .bind(outcome.game.started)
        .bind(game_id)
        .execute(&mut tx)
        .await
    {
        Ok(result) if result.rows_affected() == 0 => {
            info!("Placement in game {} lost a concurrent update race", game_id);
            return Err(CustomError::ConcurrentUpdate);
        }
        Ok(_) => {}
        Err(err) => {
            error!("Error placing piece: {:?}", err);
            return Err(CustomError::BadRequest);
        }
    }

    if let Err(err) = tx.commit().await {
        error!("Error placing piece: {:?}", err);
        return Err(CustomError::InternalServerError);
    }

    Ok((
        StatusCode::CREATED,
        Json(PieceDetails {
            game_id,
            owner: player.name,
            ship: outcome.piece.ship,
            coordinates: outcome.piece.coordinates.0,
        }),
    ))
}
