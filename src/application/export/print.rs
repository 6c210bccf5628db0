//! Degraded path: hand the standalone document to a print-capable view.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PrintHostError {
    /// The host refused to open a new view.
    #[error("print view was blocked")]
    PopupBlocked,
    #[error("failed to write print view: {0}")]
    Write(#[from] std::io::Error),
}

/// An opened print view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintView {
    pub location: PathBuf,
}

/// Opens new browsing contexts for the print fallback.
#[async_trait]
pub trait PrintHost: Send + Sync {
    async fn open(&self, name: &str, document: &str) -> Result<PrintView, PrintHostError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackOutcome {
    Presented(PrintView),
    Blocked,
}

const PRINT_CONTROL: &str = r#"<style>
.lpi-print-control { position: fixed; top: 16px; right: 16px; z-index: 2147483647; padding: 10px 18px; border: 0; border-radius: 6px; background: #1f4e79; color: #fff; font: 600 14px/1.2 Inter, Arial, sans-serif; cursor: pointer; box-shadow: 0 2px 8px rgba(0, 0, 0, 0.25); }
@media print { .lpi-print-control { display: none !important; } }
</style>
<button type="button" class="lpi-print-control" onclick="window.print(); window.close();">Imprimir / Guardar PDF</button>
"#;

pub struct PrintPresenter<'a> {
    host: &'a dyn PrintHost,
}

impl<'a> PrintPresenter<'a> {
    pub fn new(host: &'a dyn PrintHost) -> Self {
        Self { host }
    }

    pub async fn present(
        &self,
        document: &str,
        name: &str,
    ) -> Result<FallbackOutcome, PrintHostError> {
        let page = inject_print_control(document);
        match self.host.open(name, &page).await {
            Ok(view) => {
                info!(
                    target = "lpi_export::export::print",
                    location = %view.location.display(),
                    "Opened print view"
                );
                Ok(FallbackOutcome::Presented(view))
            }
            Err(PrintHostError::PopupBlocked) => {
                warn!(
                    target = "lpi_export::export::print",
                    "Print view was blocked; export abandoned"
                );
                Ok(FallbackOutcome::Blocked)
            }
            Err(err) => Err(err),
        }
    }
}

/// Insert the floating print button before the closing `</body>`, or at the
/// end when the document has none.
pub fn inject_print_control(document: &str) -> String {
    let lower = document.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(index) => {
            let mut page = String::with_capacity(document.len() + PRINT_CONTROL.len());
            page.push_str(&document[..index]);
            page.push_str(PRINT_CONTROL);
            page.push_str(&document[index..]);
            page
        }
        None => format!("{document}{PRINT_CONTROL}"),
    }
}
