//! # stationcast-status
//!
//! The job status store. [`StatusStore`] is the only mutation surface for
//! job records: it turns the backend's guarded writes into the
//! `create` / `set_total_if_unset` / `increment_completed` / `get`
//! operations, retrying conditional updates within a bounded budget and
//! falling back to the backend's atomic count when the budget runs out.
//!
//! Backends:
//!
//! - **memory**: in-process records in a [dashmap](https://crates.io/crates/dashmap)
//! - **redis**: JSON records guarded by Lua scripts, using the [redis](https://crates.io/crates/redis) crate
//!
//! The backend is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod redis;
pub mod store;

pub use store::StatusStore;
