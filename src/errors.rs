use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::engine::placement::PlacementError;
use crate::engine::ranking::RankingError;
use crate::engine::strike::StrikeError;

// Custom Errors used in handlers
pub enum CustomError {
    BadRequest,
    InternalServerError,
    UserNotFound,
    UserExists,
    EmailExists,
    InvalidUserName,
    InvalidEmail,
    GameNotFound,
    GameFull,
    InvalidGame,
    PlayerNotRegistered,
    GameAlreadyOver,
    ConcurrentUpdate,
    Placement(PlacementError),
    Strike(StrikeError),
    Ranking(RankingError),
}

impl From<PlacementError> for CustomError {
    fn from(err: PlacementError) -> Self {
        CustomError::Placement(err)
    }
}

impl From<StrikeError> for CustomError {
    fn from(err: StrikeError) -> Self {
        CustomError::Strike(err)
    }
}

impl From<RankingError> for CustomError {
    fn from(err: RankingError) -> Self {
        CustomError::Ranking(err)
    }
}

//implementation of custom errors that are used in handlers.
//validation errors map to 400, state conflicts to 409, lookups to 404
impl IntoResponse for CustomError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            Self::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
            Self::BadRequest => (StatusCode::BAD_REQUEST, "Bad Request".to_string()),
            Self::UserNotFound => (StatusCode::NOT_FOUND, "User not Found".to_string()),
            Self::UserExists => (StatusCode::CONFLICT, "User already exists".to_string()),
            Self::EmailExists => {
                (StatusCode::CONFLICT, "You already have an account".to_string())
            }
            Self::InvalidUserName => (
                StatusCode::BAD_REQUEST,
                "User name must be at least 3 characters".to_string(),
            ),
            Self::InvalidEmail => (StatusCode::BAD_REQUEST, "E-mail is not valid".to_string()),
            Self::GameNotFound => (StatusCode::NOT_FOUND, "Game not Found".to_string()),
            Self::GameFull => (
                StatusCode::CONFLICT,
                "Game already has two players".to_string(),
            ),
            Self::InvalidGame => (StatusCode::BAD_REQUEST, "Invalid Game".to_string()),
            Self::PlayerNotRegistered => (
                StatusCode::BAD_REQUEST,
                "Player is not registered in this game".to_string(),
            ),
            Self::GameAlreadyOver => {
                (StatusCode::CONFLICT, "The game is already over".to_string())
            }
            Self::ConcurrentUpdate => (
                StatusCode::CONFLICT,
                "The game changed while the request was processed, retry".to_string(),
            ),
            Self::Placement(err) => {
                let status = match err {
                    PlacementError::InvalidCoordinate(_) | PlacementError::OutOfBounds => {
                        StatusCode::BAD_REQUEST
                    }
                    _ => StatusCode::CONFLICT,
                };
                (status, err.to_string())
            }
            Self::Strike(err) => {
                let status = match err {
                    StrikeError::InvalidCoordinate(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::CONFLICT,
                };
                (status, err.to_string())
            }
            Self::Ranking(err) => (StatusCode::NOT_FOUND, err.to_string()),
        };
        (status, Json(json!({ "error": error_message }))).into_response()
    }
}
