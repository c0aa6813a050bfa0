//! The game core: board geometry, piece placement, strike resolution and
//! ranking. Everything in here is pure and synchronous; operations take
//! fully-loaded entities, validate, and return updated values plus a result.
//! Controllers load before and persist after.

pub mod board;
pub mod placement;
pub mod ranking;
pub mod ships;
pub mod strike;
