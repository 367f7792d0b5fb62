//! # stationcast-core
//!
//! Core crate for Stationcast. Contains the port traits, configuration
//! schemas, typed identifiers, the job record model, the command envelopes
//! exchanged over the queues, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Stationcast crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
