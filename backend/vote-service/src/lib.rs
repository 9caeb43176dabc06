//! vote-service: vote scoring and ranked post listings.
//!
//! Votes move a post's score in a Redis sorted set (`post:score`) together with the
//! per-post voter ledger (`post:voted:<id>`) in one guarded commit. Listings page
//! through `post:time` / `post:score`, optionally narrowed to a community, and are
//! hydrated from PostgreSQL.

pub mod app_state;
pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod workers;

pub use app_state::AppState;
pub use error::{AppError, ResCode};
