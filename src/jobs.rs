//! Background jobs: periodic e-mail reminders for players with unfinished
//! games, and the cached-statistics refresh. Both run on their own tokio
//! task and log failures instead of dying.

use std::env;
use std::time::Duration;

use chrono::Local;
use lettre::{
    transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport, Message,
    Tokio1Executor,
};
use log::{error, info};
use sqlx::MySqlPool;

use crate::controllers::server::fetch_finished_games;
use crate::engine::ranking;
use crate::models::user::User;

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Reminder loop: every period, mail each notify-enabled user that still has
// an unfinished game.
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn reminder_loop(pool: MySqlPool, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        if let Err(err) = send_reminders(&pool).await {
            error!("Reminder job failed: {:?}", err);
        }
    }
}

async fn send_reminders(pool: &MySqlPool) -> anyhow::Result<()> {
    let sql = "SELECT DISTINCT user.* FROM user \
               INNER JOIN game ON (game.player_one_id=user.id OR game.player_two_id=user.id) \
               WHERE game.over=false AND user.notify=true";
    let users: Vec<User> = sqlx::query_as(sql).fetch_all(pool).await?;

    info!("Sending reminders to {} user(s)", users.len());
    for user in users {
        if let Err(err) = mail_reminder(&user).await {
            // keep going, one bad address must not starve the rest
            error!("Error reminding {}: {:?}", user.name, err);
        }
    }
    Ok(())
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Send a reminder mail message
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

async fn mail_reminder(user: &User) -> anyhow::Result<()> {
    // Get the mail settings from environment variables
    let email_from = env::var("EMAIL_FROM")?;
    let smtp_username = env::var("SMTP_USERNAME")?;
    let smtp_password = env::var("SMTP_PASSWORD")?;
    let smtp_host = env::var("SMTP_HOST")?;

    // Construct the mail message
    let email = Message::builder()
        .from(email_from.parse()?)
        .to(format!("{} <{}>", user.name, user.email_address).parse()?)
        .subject("You have an unfinished naval battle waiting")
        .body(format!(
            "Ahoy {}! An opponent is still waiting on your next strike. \
             Come back and finish the fight.",
            user.name
        ))?;

    // Open a remote connection using STARTTLS
    let creds = Credentials::new(smtp_username, smtp_password);
    let mailer: AsyncSmtpTransport<Tokio1Executor> =
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp_host)?
            .credentials(creds)
            .build();

    // Send the email
    mailer.send(email).await?;
    Ok(())
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Statistics loop: every period, recompute the finished-game count and the
// average moves per finished game, and upsert the cache row.
///////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn stats_loop(pool: MySqlPool, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        if let Err(err) = refresh_stats(&pool).await {
            error!("Statistics job failed: {:?}", err);
        }
    }
}

async fn refresh_stats(pool: &MySqlPool) -> anyhow::Result<()> {
    let finished = match fetch_finished_games(pool).await {
        Ok(games) => games,
        Err(_) => anyhow::bail!("could not load finished games"),
    };
    let finished_games = finished.len() as u32;
    let average_moves = ranking::average_moves(&finished).unwrap_or(0.0);

    let sql = "INSERT INTO stats (name, finished_games, average_moves, refreshed) \
               VALUES ('broadside', ?, ?, ?) \
               ON DUPLICATE KEY UPDATE finished_games=VALUES(finished_games), \
               average_moves=VALUES(average_moves), refreshed=VALUES(refreshed)";
    sqlx::query(sql)
        .bind(finished_games)
        .bind(average_moves)
        .bind(Local::now())
        .execute(pool)
        .await?;

    info!(
        "Statistics refreshed: {} finished game(s), {:.2} average moves",
        finished_games, average_moves
    );
    Ok(())
}
