//! Convenience result type alias for Stationcast.

use crate::error::AppError;

/// A specialized `Result` type for Stationcast operations.
pub type AppResult<T> = Result<T, AppError>;
