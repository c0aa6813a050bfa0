use std::collections::HashMap;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use log::{error, info};
use sqlx::MySqlPool;

use crate::errors::CustomError;
use crate::models::game::{Game, GameSummary};
use crate::models::user::*;

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Handler for registering a new user. Name must be unique and at least 3
// characters, the e-mail address must be well formed and unique.
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn create_user(
    Extension(pool): Extension<MySqlPool>,
    Json(new_user): Json<NewUser>,
) -> Result<(StatusCode, String), CustomError> {
    info!("create user request");

    let name = new_user.name.trim().to_string();
    if name.chars().count() < 3 {
        info!("Rejected user name: {:?}", name);
        return Err(CustomError::InvalidUserName);
    }
    check_email(&new_user.email_address)?;

    // check if the name is taken
    let sql = "SELECT * FROM user WHERE name=?";
    if sqlx::query_as::<_, User>(sql)
        .bind(&name)
        .fetch_one(&pool)
        .await
        .is_ok()
    {
        error!("Trying to register a username that already exists");
        return Err(CustomError::UserExists);
    }

    // check if the e-mail address is taken
    let sql = "SELECT * FROM user WHERE email_address=?";
    if sqlx::query_as::<_, User>(sql)
        .bind(&new_user.email_address)
        .fetch_one(&pool)
        .await
        .is_ok()
    {
        error!("Trying to register an e-mail address that already exists");
        return Err(CustomError::EmailExists);
    }

    let sql = "INSERT INTO user (name, email_address, notify) VALUES (?, ?, ?)";
    match sqlx::query(sql)
        .bind(&name)
        .bind(&new_user.email_address)
        .bind(new_user.notify)
        .execute(&pool)
        .await
    {
        Ok(_) => Ok((StatusCode::CREATED, "User created".to_string())),
        Err(err) => {
            error!("Error creating user: {:?}", err);
            Err(CustomError::BadRequest)
        }
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Handler for looking up a user by name.
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn get_user(
    Path(name): Path<String>,
    Extension(pool): Extension<MySqlPool>,
) -> Result<impl IntoResponse, CustomError> {
    info!("get user request");

    let sql = "SELECT * FROM user WHERE name=?";
    match sqlx::query_as::<_, User>(sql)
        .bind(name)
        .fetch_one(&pool)
        .await
    {
        Ok(user) => Ok((StatusCode::OK, Json(user))),
        Err(_) => Err(CustomError::UserNotFound),
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Handler for listing every unfinished game a user participates in,
// as either player.
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn get_user_games(
    Path(name): Path<String>,
    Extension(pool): Extension<MySqlPool>,
) -> Result<impl IntoResponse, CustomError> {
    info!("user games request");

    let user = fetch_user_by_name(&pool, &name).await?;

    let sql = "SELECT * FROM game WHERE (player_one_id=? OR player_two_id=?) AND over=false";
    let games: Vec<Game> = match sqlx::query_as(sql)
        .bind(user.id)
        .bind(user.id)
        .fetch_all(&pool)
        .await
    {
        Ok(games) => games,
        Err(err) => {
            error!("Error listing games for user {}: {:?}", user.name, err);
            return Err(CustomError::BadRequest);
        }
    };

    let names = player_names(&pool, &games).await?;
    let summaries: Vec<GameSummary> = games
        .iter()
        .map(|game| GameSummary::build(game, &names))
        .collect();

    Ok((StatusCode::OK, Json(summaries)))
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Shared lookup helpers used across the game and board controllers
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

// Resolve a player name to the full user record
pub async fn fetch_user_by_name(pool: &MySqlPool, name: &str) -> Result<User, CustomError> {
    let sql = "SELECT * FROM user WHERE name=?";
    sqlx::query_as(sql)
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(|err| {
            error!("Error retrieving user {:?}: {:?}", name, err);
            CustomError::UserNotFound
        })
}

pub async fn fetch_user_by_id(pool: &MySqlPool, id: u32) -> Result<User, CustomError> {
    let sql = "SELECT * FROM user WHERE id=?";
    sqlx::query_as(sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|err| {
            error!("Error retrieving user {}: {:?}", id, err);
            CustomError::UserNotFound
        })
}

// Map of user id -> name for every player appearing in `games`
pub async fn player_names(
    pool: &MySqlPool,
    games: &[Game],
) -> Result<HashMap<u32, String>, CustomError> {
    let mut names = HashMap::new();
    for game in games {
        let mut ids = vec![game.player_one_id];
        if let Some(id) = game.player_two_id {
            ids.push(id);
        }
        for id in ids {
            if !names.contains_key(&id) {
                let user = fetch_user_by_id(pool, id).await?;
                names.insert(id, user.name);
            }
        }
    }
    Ok(names)
}

// Structural check: a local part, an @, and a dotted domain
pub fn check_email(email: &str) -> Result<(), CustomError> {
    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return Err(CustomError::InvalidEmail),
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_.+-".contains(c));
    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    if local_ok && domain_ok {
        Ok(())
    } else {
        Err(CustomError::InvalidEmail)
    }
}

#[cfg(test)]
mod tests {
    use super::check_email;

    #[test]
    fn accepts_plain_addresses() {
        for good in [
            "alice@example.com",
            "a.b+c@mail.example.co",
            "x_1-2@ex-ample.org",
        ] {
            assert!(check_email(good).is_ok(), "rejected {:?}", good);
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "",
            "alice",
            "alice@",
            "@example.com",
            "alice@example",
            "alice@exa mple.com",
            "al ice@example.com",
            "alice@.com",
            "alice@example..com",
        ] {
            assert!(check_email(bad).is_err(), "accepted {:?}", bad);
        }
    }
}
