//! Server side of PDF generation: validate a request and hand it to an engine.

pub mod readiness;

pub use readiness::{Readiness, ReadinessPolicy, poll_ready};

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use bytes::Bytes;
use lpi_render_types::{GeneratePdfBody, HTML_REQUIRED, RenderOptions};
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{error::DomainError, filename::sanitize_pdf_filename};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("page did not finish loading within {seconds}s")]
    NavigationTimeout { seconds: u64 },
    #[error("invalid print options: {0}")]
    Options(String),
    #[error("browser protocol error: {0}")]
    Protocol(String),
}

/// A validated render job.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub html: String,
    pub options: RenderOptions,
}

/// Turns HTML into PDF bytes.
#[async_trait]
pub trait PdfEngine: Send + Sync {
    async fn render(&self, job: &RenderJob) -> Result<Bytes, EngineError>;
}

#[derive(Debug, Error)]
pub enum RenderServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone)]
pub struct GeneratedPdf {
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct RenderService {
    engine: Arc<dyn PdfEngine>,
    default_filename: String,
}

impl RenderService {
    pub fn new(engine: Arc<dyn PdfEngine>, default_filename: impl Into<String>) -> Self {
        Self {
            engine,
            default_filename: default_filename.into(),
        }
    }

    pub async fn generate(&self, body: GeneratePdfBody) -> Result<GeneratedPdf, RenderServiceError> {
        let html = match body.html {
            Some(html) if !html.trim().is_empty() => html,
            _ => {
                counter!("lpi_render_requests_total", "result" => "rejected").increment(1);
                return Err(DomainError::validation(HTML_REQUIRED).into());
            }
        };

        let filename = sanitize_pdf_filename(body.filename.as_deref(), &self.default_filename);
        let job = RenderJob {
            html,
            options: body.options.unwrap_or_default(),
        };

        let started = Instant::now();
        let result = self.engine.render(&job).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("lpi_render_duration_ms").record(elapsed_ms);

        match result {
            Ok(bytes) => {
                counter!("lpi_render_requests_total", "result" => "ok").increment(1);
                info!(
                    target = "lpi_export::render",
                    filename = %filename,
                    bytes = bytes.len(),
                    elapsed_ms = elapsed_ms as u64,
                    "PDF generated"
                );
                Ok(GeneratedPdf { filename, bytes })
            }
            Err(err) => {
                counter!("lpi_render_requests_total", "result" => "error").increment(1);
                warn!(
                    target = "lpi_export::render",
                    filename = %filename,
                    elapsed_ms = elapsed_ms as u64,
                    error = %err,
                    "PDF generation failed"
                );
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use lpi_render_types::PageFormat;

    use super::*;

    struct Recording {
        jobs: Mutex<Vec<RenderJob>>,
    }

    #[async_trait]
    impl PdfEngine for Recording {
        async fn render(&self, job: &RenderJob) -> Result<Bytes, EngineError> {
            self.jobs.lock().unwrap().push(job.clone());
            Ok(Bytes::from_static(b"%PDF-1.7"))
        }
    }

    fn service() -> (Arc<Recording>, RenderService) {
        let engine = Arc::new(Recording {
            jobs: Mutex::new(Vec::new()),
        });
        (engine.clone(), RenderService::new(engine, "reporte.pdf"))
    }

    #[tokio::test]
    async fn blank_html_is_rejected_before_rendering() {
        let (engine, service) = service();
        let err = service
            .generate(GeneratePdfBody {
                html: Some("   ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RenderServiceError::Domain(DomainError::Validation { .. })));
        assert!(engine.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn options_and_filename_flow_to_engine() {
        let (engine, service) = service();
        let generated = service
            .generate(GeneratePdfBody {
                html: Some("<p>x</p>".to_string()),
                filename: Some("equipo/ventas".to_string()),
                options: Some(RenderOptions {
                    format: PageFormat::Legal,
                    ..Default::default()
                }),
            })
            .await
            .unwrap();

        assert_eq!(generated.filename, "ventas.pdf");
        assert_eq!(engine.jobs.lock().unwrap()[0].options.format, PageFormat::Legal);
    }
}
