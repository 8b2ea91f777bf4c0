use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::compensation::{CompensationServiceError, PayrollExportError};
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
    Compensation(CompensationServiceError),
    Export(PayrollExportError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Compensation(err) => write!(f, "compensation error: {}", err),
            AppError::Export(err) => write!(f, "export error: {}", err),
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
            AppError::Compensation(err) => Some(err),
            AppError::Export(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Compensation(CompensationServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Compensation(CompensationServiceError::AlreadyFinalized { .. }) => {
                StatusCode::CONFLICT
            }
            AppError::Compensation(CompensationServiceError::InvalidInput(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Compensation(_)
            | AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "data": null, "error": self.to_string() }));
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

impl From<CompensationServiceError> for AppError {
    fn from(value: CompensationServiceError) -> Self {
        Self::Compensation(value)
    }
}

impl From<PayrollExportError> for AppError {
    fn from(value: PayrollExportError) -> Self {
        Self::Export(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::compensation::{MissingEntity, PlanCode};

    #[test]
    fn compensation_errors_keep_their_status() {
        let missing = AppError::from(CompensationServiceError::NotFound(MissingEntity::Plan(
            PlanCode::new("LEAD_2026"),
        )));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let io = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(
            io.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
