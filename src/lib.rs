//! Finds the coffee shops nearest to you.
//!
//! The library half is the geo-ranking pipeline: fetch an API token, fetch
//! the shop list, measure every shop's great-circle distance from the user
//! and keep the closest few. The binary puts a terminal UI on top.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod geo;
pub mod location;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod ranking;
pub mod retry;
pub mod ui;

pub use error::FinderError;
pub use pipeline::{PipelineState, RankingPipeline};
