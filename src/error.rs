use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::position::SensorError;
use crate::store::StoreError;
use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("group {0} already exists")]
    Conflict(String),
    #[error("group {0} not found")]
    NotFound(String),
    #[error("remote store error: {0}")]
    Remote(String),
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error("no active session")]
    NoSession,
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(id) => AppError::Conflict(id),
            StoreError::NotFound(id) => AppError::NotFound(id),
            StoreError::Remote(e) => AppError::Remote(e.to_string()),
        }
    }
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, i32) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            AppError::Conflict(_) => (StatusCode::CONFLICT, error_codes::CONFLICT),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            AppError::Remote(_) => (StatusCode::BAD_GATEWAY, error_codes::REMOTE_ERROR),
            AppError::Sensor(SensorError::Timeout) => {
                (StatusCode::GATEWAY_TIMEOUT, error_codes::SENSOR_ERROR)
            }
            AppError::Sensor(_) => (StatusCode::SERVICE_UNAVAILABLE, error_codes::SENSOR_ERROR),
            AppError::NoSession => (StatusCode::UNAUTHORIZED, error_codes::NO_SESSION),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        (status, error_to_api_response::<()>(code, self.to_string())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_their_meaning() {
        let conflict: AppError = StoreError::Conflict("ABC123".into()).into();
        assert_eq!(conflict.status_and_code().0, StatusCode::CONFLICT);

        let missing: AppError = StoreError::NotFound("ABC123".into()).into();
        assert_eq!(missing.status_and_code().1, error_codes::NOT_FOUND);

        let remote: AppError = StoreError::remote("connection refused").into();
        assert_eq!(remote.to_string(), "remote store error: connection refused");
    }
}
