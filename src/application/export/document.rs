//! Standalone print document assembly.

use std::fmt::Write as _;

use lpi_render_types::RenderOptions;
use url::Url;

use crate::{
    application::export::snapshot::LAST_PAGE_ATTRIBUTE,
    config::ExportSettings,
    domain::snapshot::ReportSnapshot,
};

const DEFAULT_TITLE: &str = "Reporte LPI";

/// Wraps a snapshot into a self-contained HTML document.
#[derive(Debug, Clone)]
pub struct DocumentTemplate {
    font_stylesheet: Option<Url>,
    page_block_selector: String,
}

impl DocumentTemplate {
    pub fn new(font_stylesheet: Option<Url>, page_block_selector: impl Into<String>) -> Self {
        Self {
            font_stylesheet,
            page_block_selector: page_block_selector.into(),
        }
    }

    pub fn from_settings(settings: &ExportSettings) -> Self {
        Self::new(
            settings.font_stylesheet.clone(),
            settings.page_block_selector.clone(),
        )
    }

    /// Render the document. The output depends only on the arguments.
    pub fn render(
        &self,
        snapshot: &ReportSnapshot,
        options: &RenderOptions,
        title: Option<&str>,
    ) -> String {
        let title = escape_html(title.unwrap_or(DEFAULT_TITLE));
        let mut html = String::with_capacity(snapshot.markup.len() + snapshot.styles.len() + 1024);

        html.push_str("<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n");
        html.push_str("<meta charset=\"UTF-8\">\n");
        html.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        let _ = writeln!(html, "<title>{title}</title>");
        if let Some(font) = &self.font_stylesheet {
            let _ = writeln!(
                html,
                "<link rel=\"stylesheet\" href=\"{}\">",
                escape_html(font.as_str())
            );
        }
        let _ = writeln!(html, "<style>\n{}\n</style>", escape_style(&snapshot.styles));
        let _ = writeln!(html, "<style>\n{}</style>", self.print_overrides(options));
        html.push_str("</head>\n<body>\n");
        html.push_str(&snapshot.markup);
        html.push_str("\n</body>\n</html>\n");
        html
    }

    fn print_overrides(&self, options: &RenderOptions) -> String {
        let margin = &options.margin;
        let selector = &self.page_block_selector;
        let mut css = String::new();

        let _ = writeln!(
            css,
            "@page {{ size: {}; margin: {} {} {} {}; }}",
            options.format.css_size(),
            margin.top,
            margin.right,
            margin.bottom,
            margin.left
        );
        css.push_str(
            "html, body { -webkit-print-color-adjust: exact; print-color-adjust: exact; color-adjust: exact; }\n",
        );
        css.push_str(
            "*, *::before, *::after { -webkit-print-color-adjust: exact; print-color-adjust: exact; }\n",
        );
        let _ = writeln!(
            css,
            "{selector} {{ break-after: page; page-break-after: always; }}"
        );
        let _ = writeln!(
            css,
            "[{LAST_PAGE_ATTRIBUTE}] {{ break-after: auto; page-break-after: auto; }}"
        );
        css
    }
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// `</style` inside rule text would close the element early; CSS treats
/// `\/` as a plain slash, so escaping it keeps the rules intact.
fn escape_style(css: &str) -> String {
    let mut escaped = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(index) = rest.find("</") {
        let (before, after) = rest.split_at(index);
        escaped.push_str(before);
        let tail = &after[2..];
        if tail
            .get(..5)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("style"))
        {
            escaped.push_str("<\\/");
        } else {
            escaped.push_str("</");
        }
        rest = tail;
    }
    escaped.push_str(rest);
    escaped
}
