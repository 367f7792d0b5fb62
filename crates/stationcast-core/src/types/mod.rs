//! Core type definitions used across the Stationcast workspace.

pub mod command;
pub mod id;
pub mod job;

pub use command::{StartCommand, WorkCommand, decode_command, encode_command};
pub use id::{ItemKey, JobId};
pub use job::{
    CountTransition, IncrementOutcome, JobRecord, JobStatus, JobView, TotalOutcome,
    TotalTransition,
};
