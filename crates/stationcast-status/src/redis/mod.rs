//! Redis status backend.

pub mod client;
pub mod operations;

pub use client::{RedisClient, mask_redis_url};
pub use operations::RedisStatusBackend;
