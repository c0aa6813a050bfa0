pub mod controllers;
pub mod engine;
pub mod errors;
pub mod jobs;
pub mod models;
