use std::time::Duration;
use std::{env, net::SocketAddr};

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use log::{debug, info};
use simplelog::*;
use sqlx::mysql::MySqlPool;

use broadside::{controllers, jobs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // set up logging facility
    let _ = SimpleLogger::init(LevelFilter::Debug, Config::default());
    info!("Starting..");

    // get database url
    let database_url = env::var("DATABASE_URL").expect("$DATABASE_URL is not set");
    debug!("database_url: {:?}", database_url);

    let pool = MySqlPool::connect(&database_url).await?;

    // Background jobs: reminder mails and the statistics cache
    let reminder_period = env::var("REMINDER_PERIOD_SECS")
        .expect("$REMINDER_PERIOD_SECS is not set")
        .parse::<u64>()
        .expect("$REMINDER_PERIOD_SECS is not numeric");
    let stats_period = env::var("STATS_PERIOD_SECS")
        .expect("$STATS_PERIOD_SECS is not set")
        .parse::<u64>()
        .expect("$STATS_PERIOD_SECS is not numeric");
    tokio::spawn(jobs::reminder_loop(
        pool.clone(),
        Duration::from_secs(reminder_period),
    ));
    tokio::spawn(jobs::stats_loop(
        pool.clone(),
        Duration::from_secs(stats_period),
    ));

    // Define routes
    let app = Router::new()
        .route("/user", post(controllers::user::create_user))
        .route("/user/:name", get(controllers::user::get_user))
        .route("/user/:name/games", get(controllers::user::get_user_games))
        .route("/game", post(controllers::game::new_game))
        .route(
            "/game/:game_id",
            post(controllers::game::join_game)
                .get(controllers::game::get_game)
                .delete(controllers::game::cancel_game),
        )
        .route(
            "/game/:game_id/history",
            get(controllers::game::game_history),
        )
        .route(
            "/game/:game_id/piece",
            post(controllers::board::place_piece),
        )
        .route("/game/:game_id/strike", post(controllers::game::strike))
        .route("/rankings", get(controllers::server::get_rankings))
        .route("/stats", get(controllers::server::get_stats))
        .layer(Extension(pool));

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    debug!("Listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
