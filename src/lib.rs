pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod maze;
pub mod render;
pub mod rng;
pub mod stats;
pub mod stats_store;
pub mod types;
