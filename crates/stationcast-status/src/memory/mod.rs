//! In-memory status backend.

pub mod store;

pub use store::MemoryStatusBackend;
