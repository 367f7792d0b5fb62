//! Background command processing for Stationcast.
//!
//! This crate provides:
//! - Command queues (in-memory with visibility timeouts, Redis reliable lists)
//! - The [`JobDispatcher`] that creates jobs and publishes start commands
//! - The [`FeedExpander`] that fans a job out into per-item work commands
//! - The [`StationImageWorker`] that renders one item and counts it
//! - A worker runner that polls a queue and executes commands concurrently

pub mod dispatcher;
pub mod executor;
pub mod jobs;
pub mod queue;
pub mod render;
pub mod runner;
pub mod sources;

pub use dispatcher::JobDispatcher;
pub use jobs::{FeedExpander, StationImageWorker};
pub use queue::CommandQueueManager;
pub use runner::WorkerRunner;
