use thiserror::Error;

/// Failures that can stop a backdrop from starting or rendering.
///
/// A missing host container is not an error: bootstrapping simply yields no
/// scene in that case.
#[derive(Debug, Error)]
pub enum BackdropError {
    #[error("a backdrop scene is already running for this host")]
    AlreadyRunning,
    #[error("render surface unavailable: {0}")]
    Surface(String),
    #[error("host environment error: {0}")]
    Host(String),
    #[error("frame scheduling failed: {0}")]
    Scheduler(String),
    #[error("frame submission failed: {0}")]
    Render(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = BackdropError> = std::result::Result<T, E>;
