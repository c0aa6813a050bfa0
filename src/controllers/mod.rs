pub mod board;
pub mod game;
pub mod server;
pub mod user;
