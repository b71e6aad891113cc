use crate::config::{ConfigError, ParametersError};
use crate::telemetry::TelemetryError;
use crate::workflows::answers::StoreError;
use crate::workflows::derivation::DerivationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Parameters(ParametersError),
    Store(StoreError),
    Derivation(DerivationError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Parameters(_) => StatusCode::BAD_REQUEST,
            AppError::Store(err) | AppError::Derivation(DerivationError::Store(err)) => {
                match err {
                    StoreError::Io { .. } | StoreError::Poisoned => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    _ => StatusCode::BAD_REQUEST,
                }
            }
            AppError::Derivation(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Parameters(err) => write!(f, "parameters error: {}", err),
            AppError::Store(err) => write!(f, "storage error: {}", err),
            AppError::Derivation(err) => write!(f, "derivation error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Parameters(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Derivation(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ParametersError> for AppError {
    fn from(value: ParametersError) -> Self {
        Self::Parameters(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<DerivationError> for AppError {
    fn from(value: DerivationError) -> Self {
        Self::Derivation(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        let missing = AppError::from(DerivationError::Store(StoreError::MissingResponseCode {
            code: "users_Q1".to_string(),
        }));
        assert_eq!(missing.into_response().status(), StatusCode::BAD_REQUEST);

        let degenerate = AppError::from(DerivationError::DegenerateAggregate { found: 1 });
        assert_eq!(degenerate.into_response().status(), StatusCode::BAD_REQUEST);

        let invalid = AppError::from(ParametersError::Invalid("no products".to_string()));
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn infrastructure_errors_map_to_server_error() {
        let io = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let poisoned = AppError::from(DerivationError::Store(StoreError::Poisoned));
        assert_eq!(
            poisoned.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
