//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use stationcast_core::config::AppConfig;
use stationcast_status::StatusStore;
use stationcast_storage::{ArtifactStoreManager, ResultsReader, UrlSigner};
use stationcast_worker::JobDispatcher;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. Every field is cheap
/// to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Job status store
    pub status: StatusStore,
    /// Job submission
    pub dispatcher: JobDispatcher,
    /// Artifact listing
    pub results: ResultsReader,
    /// Artifact store
    pub artifacts: ArtifactStoreManager,
    /// Verifies artifact download links
    pub signer: UrlSigner,
}
