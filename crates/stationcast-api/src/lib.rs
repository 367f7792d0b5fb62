//! # stationcast-api
//!
//! HTTP API layer for Stationcast built on Axum.
//!
//! Provides the job endpoints (`/start`, `/status`, `/results`), signed
//! artifact downloads, the health check, middleware (CORS, request logging)
//! and the mapping from `AppError` to HTTP responses.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
