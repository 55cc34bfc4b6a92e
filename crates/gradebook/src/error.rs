use crate::bulletins::{GenerationError, GradebookImportError};
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
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
    Import(GradebookImportError),
    Generation(GenerationError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Import(_) | AppError::Generation(GenerationError::InvalidInput(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Generation(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
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
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Generation(err) => write!(f, "report card error: {}", err),
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
            AppError::Import(err) => Some(err),
            AppError::Generation(err) => Some(err),
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

impl From<GradebookImportError> for AppError {
    fn from(value: GradebookImportError) -> Self {
        Self::Import(value)
    }
}

impl From<GenerationError> for AppError {
    fn from(value: GenerationError) -> Self {
        Self::Generation(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulletins::{InvalidInput, RepositoryError};

    #[test]
    fn maps_generation_errors_to_http_status() {
        let invalid =
            AppError::from(GenerationError::InvalidInput(InvalidInput::TermOutOfRange(9)));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let missing = AppError::from(GenerationError::Store(RepositoryError::NotFound));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let offline = AppError::from(GenerationError::Store(RepositoryError::Unavailable(
            "database offline".to_string(),
        )));
        assert_eq!(offline.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(offline.to_string().contains("database offline"));
    }

    #[test]
    fn import_errors_are_client_errors() {
        let err = AppError::from(GradebookImportError::InvalidRow {
            line: 4,
            reason: "score and weight must be provided together".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("line 4"));
    }
}
