use lol_html::{RewriteStrSettings, Selector, element, rewrite_str};
use thiserror::Error;
use tracing::debug;

use crate::{
    application::export::styles::{StyleSource, extract_styles},
    config::ExportSettings,
    domain::snapshot::ReportSnapshot,
};

/// Attribute set on the last page block of a snapshot, so the print rules
/// can drop the trailing page break without relying on sibling position.
pub const LAST_PAGE_ATTRIBUTE: &str = "data-lpi-last-page";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("report content not found (tried {})", ids.join(", "))]
    ContentNotFound { ids: Vec<String> },
    #[error("`{selector}` is not a supported selector: {reason}")]
    Selector { selector: String, reason: String },
    #[error("failed to read report markup: {0}")]
    Source(String),
    #[error("failed to rewrite report markup: {0}")]
    Rewrite(String),
}

/// A document the report can be copied out of.
pub trait DomSource {
    /// Serialized copy of the first element carrying `id`, or `None` when the
    /// document has no such element.
    fn outer_html(&self, id: &str) -> Result<Option<String>, SnapshotError>;

    /// Title carried over to the standalone document.
    fn title(&self) -> Option<String> {
        None
    }
}

/// Captures a detached copy of the report subtree.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    primary_id: String,
    fallback_ids: Vec<String>,
    exclude_selectors: Vec<String>,
    page_block_selector: Option<String>,
}

impl SnapshotBuilder {
    pub fn new(
        primary_id: impl Into<String>,
        fallback_ids: Vec<String>,
        exclude_selectors: Vec<String>,
    ) -> Result<Self, SnapshotError> {
        for selector in &exclude_selectors {
            validate_selector(selector)?;
        }

        Ok(Self {
            primary_id: primary_id.into(),
            fallback_ids,
            exclude_selectors,
            page_block_selector: None,
        })
    }

    /// Mark the last element matching `selector` with [`LAST_PAGE_ATTRIBUTE`].
    pub fn with_page_blocks(mut self, selector: impl Into<String>) -> Result<Self, SnapshotError> {
        let selector = selector.into();
        validate_selector(&selector)?;
        self.page_block_selector = Some(selector);
        Ok(self)
    }

    pub fn from_settings(settings: &ExportSettings) -> Result<Self, SnapshotError> {
        Self::new(
            settings.content_id.clone(),
            settings.fallback_content_ids.clone(),
            settings.exclude_selectors.clone(),
        )?
        .with_page_blocks(settings.page_block_selector.clone())
    }

    /// Ids tried when locating the report, primary first.
    pub fn candidate_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_id.as_str()).chain(self.fallback_ids.iter().map(String::as_str))
    }

    pub fn capture(
        &self,
        dom: &dyn DomSource,
        styles: &dyn StyleSource,
    ) -> Result<ReportSnapshot, SnapshotError> {
        let mut located = None;
        for id in self.candidate_ids() {
            if let Some(markup) = dom.outer_html(id)? {
                located = Some((id, markup));
                break;
            }
        }

        let Some((root_id, markup)) = located else {
            return Err(SnapshotError::ContentNotFound {
                ids: self.candidate_ids().map(str::to_string).collect(),
            });
        };

        let markup = self.strip_export_controls(&markup)?;
        let markup = self.mark_last_page_block(markup)?;
        let styles = extract_styles(styles);

        debug!(
            target = "lpi_export::export::snapshot",
            root_id,
            markup_bytes = markup.len(),
            style_bytes = styles.len(),
            "Captured report snapshot"
        );

        Ok(ReportSnapshot::new(root_id, markup, styles))
    }

    /// Remove every element matching an export-control selector, nested
    /// matches included.
    pub fn strip_export_controls(&self, markup: &str) -> Result<String, SnapshotError> {
        if self.exclude_selectors.is_empty() {
            return Ok(markup.to_string());
        }

        let handlers = self
            .exclude_selectors
            .iter()
            .map(|selector| {
                element!(selector.as_str(), |el| {
                    el.remove();
                    Ok(())
                })
            })
            .collect();

        rewrite_str(
            markup,
            RewriteStrSettings {
                element_content_handlers: handlers,
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|err| SnapshotError::Rewrite(err.to_string()))
    }

    /// Tag the last page block in document order, wherever it sits in the
    /// tree.
    pub fn mark_last_page_block(&self, markup: String) -> Result<String, SnapshotError> {
        let Some(selector) = self.page_block_selector.as_deref() else {
            return Ok(markup);
        };

        let mut total = 0usize;
        rewrite_str(
            &markup,
            RewriteStrSettings {
                element_content_handlers: vec![element!(selector, |_| {
                    total += 1;
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|err| SnapshotError::Rewrite(err.to_string()))?;

        if total == 0 {
            return Ok(markup);
        }

        let mut seen = 0usize;
        rewrite_str(
            &markup,
            RewriteStrSettings {
                element_content_handlers: vec![element!(selector, |el| {
                    seen += 1;
                    if seen == total {
                        el.set_attribute(LAST_PAGE_ATTRIBUTE, "")?;
                    }
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|err| SnapshotError::Rewrite(err.to_string()))
    }
}

fn validate_selector(selector: &str) -> Result<(), SnapshotError> {
    selector
        .parse::<Selector>()
        .map(|_| ())
        .map_err(|err| SnapshotError::Selector {
            selector: selector.to_string(),
            reason: err.to_string(),
        })
}
