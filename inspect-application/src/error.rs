use thiserror::Error;

/// Outcome of a failed inspect. `Clone` so one failure reaches every caller
/// waiting on the same asset id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectError {
    #[error("service is still initializing, please try again later")]
    Initializing,
    #[error("queue is full ({current}/{max}), please try again later")]
    QueueFull { current: usize, max: usize },
    #[error("no bots are ready")]
    NoWorkerAvailable,
    #[error("dispatch failed: {0}")]
    DispatchFailed(String),
    #[error("inspection request timed out after retries")]
    Timeout,
    #[error("worker protocol error: {0}")]
    WorkerProtocol(String),
    #[error("persistence failed: {0}")]
    Persistence(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("refresh is not allowed")]
    RefreshForbidden,
    #[error(transparent)]
    Inspect(#[from] InspectError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
