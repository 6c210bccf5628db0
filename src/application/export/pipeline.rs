use std::{fmt, sync::Arc};

use lpi_render_types::{RenderOptions, RenderRequest};
use metrics::counter;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    application::export::{
        client::{RenderClient, RenderUnavailable},
        document::DocumentTemplate,
        download::{DeliveredFile, DownloadSink},
        print::{FallbackOutcome, PrintHost, PrintPresenter, PrintView},
        snapshot::{DomSource, SnapshotBuilder, SnapshotError},
        styles::StyleSource,
    },
    domain::filename::{pdf_stem, sanitize_pdf_filename},
};

/// States an export run passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPhase {
    Idle,
    Snapshotting,
    /// Zero-based endpoint index.
    RenderAttempt(usize),
    Download,
    Fallback,
}

impl fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportPhase::Idle => f.write_str("idle"),
            ExportPhase::Snapshotting => f.write_str("snapshotting"),
            ExportPhase::RenderAttempt(index) => write!(f, "render_attempt({index})"),
            ExportPhase::Download => f.write_str("download"),
            ExportPhase::Fallback => f.write_str("fallback"),
        }
    }
}

/// Why the print fallback was entered.
#[derive(Debug, Clone)]
pub enum FallbackCause {
    RenderUnavailable(RenderUnavailable),
    DownloadFailed(String),
}

impl fmt::Display for FallbackCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackCause::RenderUnavailable(err) => err.fmt(f),
            FallbackCause::DownloadFailed(reason) => write!(f, "download failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExportOutcome {
    Downloaded { endpoint: Url, file: DeliveredFile },
    PrintFallback { view: PrintView, cause: FallbackCause },
    /// Neither a PDF nor a print view could be produced.
    Abandoned { cause: FallbackCause, detail: String },
}

impl ExportOutcome {
    fn label(&self) -> &'static str {
        match self {
            ExportOutcome::Downloaded { .. } => "downloaded",
            ExportOutcome::PrintFallback { .. } => "print_fallback",
            ExportOutcome::Abandoned { .. } => "abandoned",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub outcome: ExportOutcome,
    pub phases: Vec<ExportPhase>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("report content not found (tried {})", ids.join(", "))]
    ContentNotFound { ids: Vec<String> },
    #[error(transparent)]
    Snapshot(SnapshotError),
}

impl From<SnapshotError> for ExportError {
    fn from(error: SnapshotError) -> Self {
        match error {
            SnapshotError::ContentNotFound { ids } => ExportError::ContentNotFound { ids },
            other => ExportError::Snapshot(other),
        }
    }
}

/// Collaborators of an export run. Nothing here is shared between runs
/// except through these handles.
pub struct ExportPipeline {
    snapshots: SnapshotBuilder,
    template: DocumentTemplate,
    client: RenderClient,
    endpoints: Vec<Url>,
    options: RenderOptions,
    default_filename: String,
    downloads: Arc<dyn DownloadSink>,
    print_host: Arc<dyn PrintHost>,
}

pub struct ExportPipelineParts {
    pub snapshots: SnapshotBuilder,
    pub template: DocumentTemplate,
    pub client: RenderClient,
    pub endpoints: Vec<Url>,
    pub options: RenderOptions,
    pub default_filename: String,
    pub downloads: Arc<dyn DownloadSink>,
    pub print_host: Arc<dyn PrintHost>,
}

struct PhaseLog(Vec<ExportPhase>);

impl PhaseLog {
    fn start() -> Self {
        Self(vec![ExportPhase::Idle])
    }

    fn enter(&mut self, phase: ExportPhase) {
        let from = self.0.last().copied().unwrap_or(ExportPhase::Idle);
        debug!(
            target = "lpi_export::export::pipeline",
            from = %from,
            to = %phase,
            "Export phase transition"
        );
        self.0.push(phase);
    }
}

impl ExportPipeline {
    pub fn new(parts: ExportPipelineParts) -> Self {
        let ExportPipelineParts {
            snapshots,
            template,
            client,
            endpoints,
            options,
            default_filename,
            downloads,
            print_host,
        } = parts;

        Self {
            snapshots,
            template,
            client,
            endpoints,
            options,
            default_filename,
            downloads,
            print_host,
        }
    }

    /// Run one export to completion.
    ///
    /// Missing report content fails before any endpoint is contacted. Every
    /// later failure ends in the print fallback.
    pub async fn run(
        &self,
        dom: &dyn DomSource,
        styles: &dyn StyleSource,
        filename: Option<&str>,
    ) -> Result<ExportReport, ExportError> {
        let mut phases = PhaseLog::start();
        phases.enter(ExportPhase::Snapshotting);

        let snapshot = match self.snapshots.capture(dom, styles) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(
                    target = "lpi_export::export::pipeline",
                    error = %err,
                    "Export aborted before rendering"
                );
                return Err(err.into());
            }
        };

        let filename = sanitize_pdf_filename(filename, &self.default_filename);
        let request = RenderRequest {
            html: self
                .template
                .render(&snapshot, &self.options, dom.title().as_deref()),
            filename: Some(filename.clone()),
            options: self.options.clone(),
        };
        drop(snapshot);

        let rendered = self
            .client
            .render_with(&request, &self.endpoints, |index, _| {
                phases.enter(ExportPhase::RenderAttempt(index));
            })
            .await;

        let cause = match rendered {
            Ok(rendered) => {
                phases.enter(ExportPhase::Download);
                match self.downloads.deliver(&rendered.pdf).await {
                    Ok(file) => {
                        info!(
                            target = "lpi_export::export::pipeline",
                            endpoint = %rendered.endpoint,
                            path = %file.path.display(),
                            bytes = file.bytes,
                            "PDF downloaded"
                        );
                        let outcome = ExportOutcome::Downloaded {
                            endpoint: rendered.endpoint,
                            file,
                        };
                        return Ok(self.finish(phases, outcome));
                    }
                    Err(err) => {
                        warn!(
                            target = "lpi_export::export::pipeline",
                            error = %err,
                            "Download failed; switching to print view"
                        );
                        FallbackCause::DownloadFailed(err.to_string())
                    }
                }
            }
            Err(unavailable) => FallbackCause::RenderUnavailable(unavailable),
        };

        phases.enter(ExportPhase::Fallback);
        let stem = pdf_stem(&filename);

        let outcome = match PrintPresenter::new(self.print_host.as_ref())
            .present(&request.html, stem)
            .await
        {
            Ok(FallbackOutcome::Presented(view)) => ExportOutcome::PrintFallback { view, cause },
            Ok(FallbackOutcome::Blocked) => ExportOutcome::Abandoned {
                cause,
                detail: "print view was blocked".to_string(),
            },
            Err(err) => {
                error!(
                    target = "lpi_export::export::pipeline",
                    error = %err,
                    "Print view could not be opened"
                );
                ExportOutcome::Abandoned {
                    cause,
                    detail: err.to_string(),
                }
            }
        };

        Ok(self.finish(phases, outcome))
    }

    fn finish(&self, mut phases: PhaseLog, outcome: ExportOutcome) -> ExportReport {
        phases.enter(ExportPhase::Idle);
        counter!("lpi_export_outcomes_total", "outcome" => outcome.label()).increment(1);
        ExportReport {
            outcome,
            phases: phases.0,
        }
    }
}
