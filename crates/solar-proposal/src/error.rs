use crate::config::ConfigError;
use crate::proposal::ProposalError;
use crate::telemetry::TelemetryError;
use axum::http::{header, HeaderValue, StatusCode};
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
    Proposal(ProposalError),
    /// Request body that is not the expected JSON object.
    InvalidPayload(String),
    /// The blocking worker running a proposal panicked or was cancelled.
    Task(String),
    RateLimited { retry_after_secs: u64 },
}

impl AppError {
    /// Tag carried in failure payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Telemetry(_) => "telemetry",
            AppError::Io(_) => "io",
            AppError::Server(_) => "server",
            AppError::Proposal(err) => err.kind(),
            AppError::InvalidPayload(_) => "invalid_payload",
            AppError::Task(_) => "task",
            AppError::RateLimited { .. } => "rate_limited",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Proposal(ProposalError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Proposal(_)
            | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
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
            AppError::Proposal(err) => write!(f, "{}", err),
            AppError::InvalidPayload(reason) => write!(f, "dados inválidos: {}", reason),
            AppError::Task(reason) => write!(f, "proposal worker failed: {}", reason),
            AppError::RateLimited { retry_after_secs } => write!(
                f,
                "limite de requisições excedido, tente novamente em {}s",
                retry_after_secs
            ),
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
            AppError::Proposal(err) => Some(err),
            AppError::InvalidPayload(_) | AppError::Task(_) | AppError::RateLimited { .. } => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "status": "erro",
            "kind": self.kind(),
            "message": self.to_string(),
        }));

        let mut response = (status, body).into_response();
        if let AppError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
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

impl From<ProposalError> for AppError {
    fn from(value: ProposalError) -> Self {
        Self::Proposal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::{ComputationError, ValidationError};

    #[test]
    fn validation_failures_are_unprocessable() {
        let err = AppError::from(ProposalError::from(ValidationError::BillAmountNotPositive));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn computation_failures_are_server_errors() {
        let err = AppError::from(ProposalError::from(ComputationError::NonFinite {
            field: "generator_invoice",
        }));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), "computation");
    }

    #[test]
    fn rate_limit_sets_retry_after() {
        let response = AppError::RateLimited {
            retry_after_secs: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok()),
            Some("42")
        );
    }
}
