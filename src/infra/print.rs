use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::application::export::print::{PrintHost, PrintHostError, PrintView};

/// Writes print views next to downloaded PDFs as `<name>.print.html`.
///
/// A host built with [`FilePrintHost::blocked`] refuses every view, which is
/// how a non-interactive run signals that nothing may be opened.
#[derive(Debug, Clone)]
pub struct FilePrintHost {
    directory: PathBuf,
    blocked: bool,
}

impl FilePrintHost {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            blocked: false,
        }
    }

    pub fn blocked(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            blocked: true,
        }
    }
}

#[async_trait]
impl PrintHost for FilePrintHost {
    async fn open(&self, name: &str, document: &str) -> Result<PrintView, PrintHostError> {
        if self.blocked {
            return Err(PrintHostError::PopupBlocked);
        }

        fs::create_dir_all(&self.directory).await?;
        let stem = if name.trim().is_empty() { "reporte" } else { name };
        let location = self.directory.join(format!("{stem}.print.html"));
        fs::write(&location, document).await?;
        Ok(PrintView { location })
    }
}
