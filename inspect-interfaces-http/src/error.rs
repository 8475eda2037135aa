use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use inspect_application::{AppError, InspectError};

#[derive(Debug)]
pub enum HttpError {
    Unauthorized,
    BadRequest(String),
    Forbidden(String),
    TooManyRequests(String),
    FailedDependency(String),
    GatewayTimeout(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl From<AppError> for HttpError {
    fn from(value: AppError) -> Self {
        match value {
            AppError::Unauthorized => HttpError::Unauthorized,
            AppError::BadRequest(msg) => HttpError::BadRequest(msg),
            AppError::RefreshForbidden => HttpError::Forbidden(AppError::RefreshForbidden.to_string()),
            AppError::Inspect(err) => err.into(),
            AppError::Internal(err) => HttpError::Internal(err.to_string()),
        }
    }
}

impl From<InspectError> for HttpError {
    fn from(value: InspectError) -> Self {
        let message = value.to_string();
        match value {
            InspectError::Initializing => HttpError::ServiceUnavailable(message),
            InspectError::QueueFull { .. } => HttpError::TooManyRequests(message),
            InspectError::NoWorkerAvailable => HttpError::FailedDependency(message),
            InspectError::Timeout | InspectError::DispatchFailed(_) | InspectError::WorkerProtocol(_) => {
                HttpError::GatewayTimeout(message)
            }
            InspectError::Persistence(_) => HttpError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::Unauthorized => StatusCode::UNAUTHORIZED,
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::Forbidden(_) => StatusCode::FORBIDDEN,
            HttpError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            HttpError::FailedDependency(_) => StatusCode::FAILED_DEPENDENCY,
            HttpError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            HttpError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            HttpError::Unauthorized => "unauthorized".to_string(),
            HttpError::BadRequest(msg) => format!("bad request: {}", msg),
            HttpError::Forbidden(msg)
            | HttpError::TooManyRequests(msg)
            | HttpError::FailedDependency(msg)
            | HttpError::GatewayTimeout(msg)
            | HttpError::ServiceUnavailable(msg)
            | HttpError::Internal(msg) => msg,
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
