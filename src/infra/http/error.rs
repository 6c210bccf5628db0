use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lpi_render_types::{ErrorBody, GENERATION_FAILED, INVALID_JSON, METHOD_NOT_ALLOWED};

use crate::{
    application::{error::ErrorReport, render::RenderServiceError},
    domain::error::DomainError,
};

/// Failure of a render service request, rendered as `{"error", "message"}`.
#[derive(Debug)]
pub struct ServiceError {
    status: StatusCode,
    error: &'static str,
    message: Option<String>,
    report: ErrorReport,
}

impl ServiceError {
    fn new(
        source: &'static str,
        status: StatusCode,
        error: &'static str,
        message: Option<String>,
        report: Option<ErrorReport>,
    ) -> Self {
        let report = report.unwrap_or_else(|| {
            let detail = message.clone().unwrap_or_else(|| error.to_string());
            ErrorReport::from_message(source, status, detail)
        });
        Self {
            status,
            error,
            message,
            report,
        }
    }

    pub fn invalid_json(rejection: JsonRejection) -> Self {
        let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            StatusCode::PAYLOAD_TOO_LARGE
        } else {
            StatusCode::BAD_REQUEST
        };
        let report = ErrorReport::from_error("infra::http::generate_pdf", status, &rejection);
        Self::new(
            "infra::http::generate_pdf",
            status,
            INVALID_JSON,
            Some(rejection.body_text()),
            Some(report),
        )
    }

    pub fn method_not_allowed() -> Self {
        Self::new(
            "infra::http::method_not_allowed",
            StatusCode::METHOD_NOT_ALLOWED,
            METHOD_NOT_ALLOWED,
            None,
            None,
        )
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::new(
            "infra::http::generate_pdf",
            StatusCode::INTERNAL_SERVER_ERROR,
            GENERATION_FAILED,
            Some(message.into()),
            None,
        )
    }
}

impl From<RenderServiceError> for ServiceError {
    fn from(error: RenderServiceError) -> Self {
        match &error {
            RenderServiceError::Domain(DomainError::Validation { message }) => {
                let report = ErrorReport::from_error(
                    "infra::http::generate_pdf",
                    StatusCode::BAD_REQUEST,
                    &error,
                );
                Self {
                    status: StatusCode::BAD_REQUEST,
                    error: validation_error(message),
                    message: None,
                    report,
                }
            }
            RenderServiceError::Engine(engine) => {
                let report = ErrorReport::from_error(
                    "infra::http::generate_pdf",
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &error,
                );
                Self::new(
                    "infra::http::generate_pdf",
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GENERATION_FAILED,
                    Some(engine.to_string()),
                    Some(report),
                )
            }
        }
    }
}

/// Validation messages are already the public wording; anything else is
/// reported under the generic body.
fn validation_error(message: &str) -> &'static str {
    if message == lpi_render_types::HTML_REQUIRED {
        lpi_render_types::HTML_REQUIRED
    } else {
        INVALID_JSON
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error.to_string(),
            message: self.message,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}
