use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use lpi_render_types::{GeneratePdfBody, HealthResponse};

use crate::{application::render::GeneratedPdf, domain::filename::attachment_disposition};

use super::{error::ServiceError, state::ServiceState};

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

pub async fn generate_pdf(
    State(state): State<ServiceState>,
    payload: Result<Json<GeneratePdfBody>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let Json(body) = payload.map_err(ServiceError::invalid_json)?;
    let generated = state.renderer.generate(body).await?;
    pdf_response(generated)
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> ServiceError {
    ServiceError::method_not_allowed()
}

fn pdf_response(generated: GeneratedPdf) -> Result<Response, ServiceError> {
    let disposition = HeaderValue::from_str(&attachment_disposition(&generated.filename))
        .map_err(|err| ServiceError::generation(format!("invalid filename header: {err}")))?;
    let length = generated.bytes.len();

    let mut response = Body::from(generated.bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}
