use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::export::client::RenderedPdf;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to prepare download directory `{path}`: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write download: {0}")]
    Write(#[from] std::io::Error),
    #[error("no free filename left for `{filename}`")]
    Exhausted { filename: String },
    #[error("download task failed: {0}")]
    Task(String),
}

/// Where a delivered PDF ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Hands a rendered PDF to the user.
///
/// Implementations must leave nothing behind when delivery fails.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn deliver(&self, pdf: &RenderedPdf) -> Result<DeliveredFile, DownloadError>;
}

/// `n`-th alternative for `filename`: `informe.pdf` becomes `informe (2).pdf`.
pub fn numbered_filename(filename: &str, n: usize) -> String {
    match filename.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => format!("{stem} ({n}).{extension}"),
        _ => format!("{filename} ({n})"),
    }
}
