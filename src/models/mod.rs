pub mod game;
pub mod miss;
pub mod piece;
pub mod stats;
pub mod user;
