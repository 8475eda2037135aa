use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::entities::{Credential, RawItem};

/// Why a worker account could not be brought up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerInitError {
    #[error("account disabled")]
    AccountDisabled,
    #[error("login throttled")]
    LoginThrottled,
    #[error("initialization timed out")]
    InitializationTimeout,
    #[error("{0}")]
    Other(String),
}

impl WorkerInitError {
    /// Maps the backend's failure codes onto the initialization taxonomy.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "ACCOUNT_DISABLED" => WorkerInitError::AccountDisabled,
            "LOGIN_THROTTLED" => WorkerInitError::LoginThrottled,
            "INITIALIZATION_ERROR" => WorkerInitError::InitializationTimeout,
            other => WorkerInitError::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("send failed: {0}")]
pub struct WorkerSendError(pub String);

/// One connected worker account.
#[async_trait]
pub trait InspectWorker: Send + Sync {
    fn username(&self) -> &str;
    fn is_available(&self) -> bool;
    /// Asks the backend to inspect an item. The result arrives later through
    /// the [`InspectResultSink`] the worker was connected with.
    async fn inspect_item(
        &self,
        owner: &str,
        asset_id: u64,
        decode_token: &str,
    ) -> Result<(), WorkerSendError>;
}

/// Receives inspect results emitted by workers, out-of-band from the request.
pub trait InspectResultSink: Send + Sync {
    fn deliver(&self, username: &str, item: RawItem);
    /// The backend rejected an inspect request for `asset_id`.
    fn failed(&self, _username: &str, _asset_id: u64, _reason: &str) {}
    /// The backend reported a login throttle for a connected account.
    fn throttled(&self, _username: &str) {}
}

#[async_trait]
pub trait WorkerConnector: Send + Sync {
    async fn connect(
        &self,
        credential: &Credential,
        sink: Arc<dyn InspectResultSink>,
    ) -> Result<Arc<dyn InspectWorker>, WorkerInitError>;
}

/// Fire-and-forget notification of accepted inspect parameters.
pub trait PingService: Send + Sync {
    fn spawn_ping(&self, s: &str, a: &str, d: &str, m: &str);
}

#[async_trait]
pub trait HealthCheckService: Send + Sync {
    async fn check_store(&self) -> anyhow::Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_error_codes_map_to_taxonomy() {
        assert_eq!(
            WorkerInitError::from_code("ACCOUNT_DISABLED"),
            WorkerInitError::AccountDisabled
        );
        assert_eq!(
            WorkerInitError::from_code("LOGIN_THROTTLED"),
            WorkerInitError::LoginThrottled
        );
        assert_eq!(
            WorkerInitError::from_code("INITIALIZATION_ERROR"),
            WorkerInitError::InitializationTimeout
        );
        assert_eq!(
            WorkerInitError::from_code("InvalidPassword"),
            WorkerInitError::Other("InvalidPassword".to_string())
        );
    }
}
