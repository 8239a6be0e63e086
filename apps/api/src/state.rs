use crate::config::Config;
use crate::session::SessionHandle;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Front door to the session coordinator, which owns files, job text,
    /// webhook endpoint and results. Scoring backends and the delivery sink
    /// are handed to the coordinator at startup.
    pub session: SessionHandle,
}
