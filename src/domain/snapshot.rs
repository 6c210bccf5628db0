//! The detached copy of a report taken at export start.

/// Serialized report markup plus the stylesheet text that was reachable when
/// it was captured.
///
/// The markup is an owned string produced from the source document, so
/// stripping export-only controls from it never touches the document the
/// snapshot was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSnapshot {
    /// Id of the element the snapshot was taken from (the primary id or one of
    /// its fallbacks).
    pub root_id: String,
    pub markup: String,
    pub styles: String,
}

impl ReportSnapshot {
    pub fn new(root_id: impl Into<String>, markup: String, styles: String) -> Self {
        Self {
            root_id: root_id.into(),
            markup,
            styles,
        }
    }
}
