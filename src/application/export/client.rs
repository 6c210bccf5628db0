use std::{fmt, sync::Arc, time::Instant};

use async_trait::async_trait;
use bytes::Bytes;
use lpi_render_types::RenderRequest;
use metrics::counter;
use reqwest::{
    Client,
    header::{CONTENT_DISPOSITION, CONTENT_LENGTH},
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::filename::{filename_from_disposition, sanitize_pdf_filename};

const PDF_MAGIC: &[u8] = b"%PDF-";
const ERROR_BODY_PREVIEW: usize = 256;

/// Why a single endpoint attempt did not yield a usable PDF.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptFailure {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("endpoint answered with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed PDF payload: {0}")]
    Malformed(String),
}

impl AttemptFailure {
    fn label(&self) -> &'static str {
        match self {
            AttemptFailure::Unreachable(_) => "unreachable",
            AttemptFailure::Status { .. } => "status",
            AttemptFailure::Malformed(_) => "malformed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt {
    pub endpoint: Url,
    pub failure: AttemptFailure,
}

impl fmt::Display for FailedAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.endpoint, self.failure)
    }
}

/// Every endpoint was tried and none produced a PDF.
#[derive(Debug, Clone, Error)]
#[error("no render endpoint produced a PDF after {} attempt(s)", attempts.len())]
pub struct RenderUnavailable {
    pub attempts: Vec<FailedAttempt>,
}

/// A PDF payload as received from an endpoint.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Bytes,
    /// `Content-Length` announced by the endpoint, when present.
    pub content_length: Option<u64>,
    pub filename: String,
}

#[async_trait]
pub trait RenderTransport: Send + Sync {
    async fn submit(
        &self,
        endpoint: &Url,
        request: &RenderRequest,
    ) -> Result<RenderedPdf, AttemptFailure>;
}

/// Posts render requests over HTTP.
#[derive(Clone, Debug)]
pub struct HttpRenderTransport {
    client: Client,
    default_filename: String,
}

impl HttpRenderTransport {
    pub fn new(default_filename: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self::with_client(client, default_filename))
    }

    pub fn with_client(client: Client, default_filename: impl Into<String>) -> Self {
        Self {
            client,
            default_filename: default_filename.into(),
        }
    }

    pub fn user_agent() -> &'static str {
        concat!("lpi-export/", env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait]
impl RenderTransport for HttpRenderTransport {
    async fn submit(
        &self,
        endpoint: &Url,
        request: &RenderRequest,
    ) -> Result<RenderedPdf, AttemptFailure> {
        let response = self
            .client
            .post(endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|err| AttemptFailure::Unreachable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AttemptFailure::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_PREVIEW).collect(),
            });
        }

        let headers = response.headers();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let filename = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| {
                sanitize_pdf_filename(request.filename.as_deref(), &self.default_filename)
            });

        let bytes = response
            .bytes()
            .await
            .map_err(|err| AttemptFailure::Unreachable(format!("body interrupted: {err}")))?;

        Ok(RenderedPdf {
            bytes,
            content_length,
            filename,
        })
    }
}

/// The first endpoint that produced a valid PDF, plus the failures before it.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub endpoint: Url,
    pub pdf: RenderedPdf,
    pub failures: Vec<FailedAttempt>,
}

/// Tries render endpoints in order until one yields a valid PDF.
#[derive(Clone)]
pub struct RenderClient {
    transport: Arc<dyn RenderTransport>,
}

impl RenderClient {
    pub fn new(transport: Arc<dyn RenderTransport>) -> Self {
        Self { transport }
    }

    pub async fn render(
        &self,
        request: &RenderRequest,
        endpoints: &[Url],
    ) -> Result<Rendered, RenderUnavailable> {
        self.render_with(request, endpoints, |_, _| {}).await
    }

    /// Like [`render`](Self::render), calling `observe` before each attempt
    /// with its zero-based index.
    pub async fn render_with<F>(
        &self,
        request: &RenderRequest,
        endpoints: &[Url],
        mut observe: F,
    ) -> Result<Rendered, RenderUnavailable>
    where
        F: FnMut(usize, &Url) + Send,
    {
        let mut failures = Vec::new();

        for (attempt, endpoint) in endpoints.iter().enumerate() {
            observe(attempt, endpoint);
            let started = Instant::now();

            let outcome = match self.transport.submit(endpoint, request).await {
                Ok(pdf) => validate_pdf(&pdf).map(|()| pdf),
                Err(failure) => Err(failure),
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(pdf) => {
                    counter!("lpi_export_endpoint_attempts_total", "result" => "ok").increment(1);
                    info!(
                        target = "lpi_export::export::client",
                        op = "render",
                        endpoint = %endpoint,
                        attempt,
                        elapsed_ms,
                        bytes = pdf.bytes.len(),
                        result = "ok",
                        "Render endpoint produced a PDF"
                    );
                    return Ok(Rendered {
                        endpoint: endpoint.clone(),
                        pdf,
                        failures,
                    });
                }
                Err(failure) => {
                    counter!(
                        "lpi_export_endpoint_attempts_total",
                        "result" => failure.label()
                    )
                    .increment(1);
                    warn!(
                        target = "lpi_export::export::client",
                        op = "render",
                        endpoint = %endpoint,
                        attempt,
                        elapsed_ms,
                        result = failure.label(),
                        error = %failure,
                        "Render endpoint failed, trying next"
                    );
                    failures.push(FailedAttempt {
                        endpoint: endpoint.clone(),
                        failure,
                    });
                }
            }
        }

        debug!(
            target = "lpi_export::export::client",
            attempts = failures.len(),
            "Render endpoints exhausted"
        );
        Err(RenderUnavailable { attempts: failures })
    }
}

fn validate_pdf(pdf: &RenderedPdf) -> Result<(), AttemptFailure> {
    if pdf.bytes.is_empty() {
        return Err(AttemptFailure::Malformed("empty body".to_string()));
    }
    if let Some(declared) = pdf.content_length
        && declared != pdf.bytes.len() as u64
    {
        return Err(AttemptFailure::Malformed(format!(
            "Content-Length {declared} does not match {} received bytes",
            pdf.bytes.len()
        )));
    }
    if !pdf.bytes.starts_with(PDF_MAGIC) {
        return Err(AttemptFailure::Malformed(
            "body is not a PDF document".to_string(),
        ));
    }
    Ok(())
}
