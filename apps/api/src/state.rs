use crate::config::Config;
use crate::records::RecordPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the record store, extraction adapter, calculator and optional upload archive.
    pub pipeline: RecordPipeline,
    pub config: Config,
}
