use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::{Builder, PersistError};
use tokio::{fs, task};
use tracing::debug;

use crate::{
    application::export::{
        client::RenderedPdf,
        download::{DeliveredFile, DownloadError, DownloadSink, numbered_filename},
    },
    domain::filename::sanitize_pdf_filename,
};

const MAX_SUFFIX_ATTEMPTS: usize = 32;

/// Saves PDFs into a directory without ever overwriting an existing file.
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    directory: PathBuf,
    default_filename: String,
}

impl DirectoryDownloads {
    pub fn new(directory: impl Into<PathBuf>, default_filename: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            default_filename: default_filename.into(),
        }
    }
}

#[async_trait]
impl DownloadSink for DirectoryDownloads {
    async fn deliver(&self, pdf: &RenderedPdf) -> Result<DeliveredFile, DownloadError> {
        fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| DownloadError::Directory {
                path: self.directory.clone(),
                source,
            })?;

        let filename = sanitize_pdf_filename(Some(&pdf.filename), &self.default_filename);
        let directory = self.directory.clone();
        let bytes = pdf.bytes.clone();

        let target = task::spawn_blocking(move || persist_unique(&directory, &filename, &bytes))
            .await
            .map_err(|err| DownloadError::Task(err.to_string()))??;

        debug!(
            target = "lpi_export::export::download",
            path = %target.display(),
            bytes = pdf.bytes.len(),
            "Persisted PDF"
        );
        Ok(DeliveredFile {
            path: target,
            bytes: pdf.bytes.len() as u64,
        })
    }
}

/// Stages `bytes` in `directory` and moves them under the first free
/// variant of `filename`.
fn persist_unique(directory: &Path, filename: &str, bytes: &Bytes) -> Result<PathBuf, DownloadError> {
    // Dropping the temporary file on any early return removes it.
    let mut staged = Builder::new()
        .prefix(".lpi-export-")
        .suffix(".part")
        .tempfile_in(directory)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;

    for attempt in 1..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = if attempt == 1 {
            filename.to_string()
        } else {
            numbered_filename(filename, attempt)
        };
        let target = directory.join(&candidate);

        match staged.persist_noclobber(&target) {
            Ok(_) => return Ok(target),
            Err(PersistError { error, file }) if error.kind() == io::ErrorKind::AlreadyExists => {
                staged = file;
            }
            Err(PersistError { error, .. }) => return Err(DownloadError::Write(error)),
        }
    }

    Err(DownloadError::Exhausted {
        filename: filename.to_string(),
    })
}
