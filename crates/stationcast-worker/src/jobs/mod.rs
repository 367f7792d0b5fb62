//! Command handlers for the two queues.

pub mod expand;
pub mod station_image;

pub use expand::FeedExpander;
pub use station_image::StationImageWorker;

use stationcast_core::error::{AppError, ErrorKind};

use crate::executor::JobExecutionError;

/// Status store and queue failures that no redelivery can fix become
/// `Drop`; everything else is left for redelivery.
fn classify(err: AppError) -> JobExecutionError {
    match err.kind {
        ErrorKind::NotFound
        | ErrorKind::Conflict
        | ErrorKind::MalformedCommand
        | ErrorKind::Validation => JobExecutionError::Drop(err.to_string()),
        _ => JobExecutionError::Internal(err),
    }
}
