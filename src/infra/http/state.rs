use axum::http::HeaderValue;

use crate::{application::render::RenderService, infra::error::InfraError};

#[derive(Clone)]
pub struct ServiceState {
    pub renderer: RenderService,
}

#[derive(Clone, Debug)]
pub struct CorsPolicy {
    pub allow_origin: HeaderValue,
}

impl CorsPolicy {
    pub fn new(allow_origin: &str) -> Result<Self, InfraError> {
        let allow_origin = HeaderValue::from_str(allow_origin).map_err(|err| {
            InfraError::configuration(format!("invalid CORS origin `{allow_origin}`: {err}"))
        })?;
        Ok(Self { allow_origin })
    }
}
