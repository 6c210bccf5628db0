//! Report export: snapshot the report, render it remotely, fall back to a
//! print view when no endpoint delivers.

pub mod client;
pub mod document;
pub mod download;
pub mod pipeline;
pub mod print;
pub mod snapshot;
pub mod styles;

pub use client::{
    AttemptFailure, FailedAttempt, HttpRenderTransport, RenderClient, RenderTransport,
    RenderUnavailable, Rendered, RenderedPdf,
};
pub use document::DocumentTemplate;
pub use download::{DeliveredFile, DownloadError, DownloadSink};
pub use pipeline::{
    ExportError, ExportOutcome, ExportPhase, ExportPipeline, ExportPipelineParts, ExportReport,
    FallbackCause,
};
pub use print::{FallbackOutcome, PrintHost, PrintHostError, PrintPresenter, PrintView};
pub use snapshot::{DomSource, SnapshotBuilder, SnapshotError};
pub use styles::{StyleAccessError, StyleSource, extract_styles, split_rules};
