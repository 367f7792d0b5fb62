//! Core traits defined in `stationcast-core` and implemented by other crates.

pub mod queue;
pub mod source;
pub mod status;
pub mod storage;

pub use queue::{CommandQueue, Delivery};
pub use source::{FetchedImage, ImageSource, SnapshotSource};
pub use status::StatusBackend;
pub use storage::{ArtifactMeta, ArtifactStore};
