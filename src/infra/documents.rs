//! HTML documents loaded from disk, exposed as report and style sources.

use std::{
    cell::RefCell,
    path::{Component, Path, PathBuf},
    rc::Rc,
};

use lol_html::{RewriteStrSettings, element, html_content::ContentType, rewrite_str, text};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::application::export::{
    snapshot::{DomSource, SnapshotError},
    styles::{StyleAccessError, StyleSource, split_rules},
};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read document `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse document: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Sheet {
    Inline(String),
    Linked(String),
}

/// A stylesheet after linked sources have been read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoadedSheet {
    Inline(String),
    Linked(Result<String, StyleAccessError>),
}

/// A parsed HTML document with its stylesheets already loaded.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    html: String,
    sheets: Vec<LoadedSheet>,
}

impl HtmlDocument {
    pub async fn open(path: &Path) -> Result<Self, DocumentError> {
        let html = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DocumentError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::parse(html, base_dir).await
    }

    /// Parses `html` and reads every local linked stylesheet relative to
    /// `base_dir`.
    pub async fn parse(
        html: impl Into<String>,
        base_dir: impl Into<PathBuf>,
    ) -> Result<Self, DocumentError> {
        let html = html.into();
        let base_dir = base_dir.into();
        let mut sheets = Vec::new();
        for sheet in collect_sheets(&html)? {
            sheets.push(match sheet {
                Sheet::Inline(css) => LoadedSheet::Inline(css),
                Sheet::Linked(href) => LoadedSheet::Linked(read_linked(&base_dir, &href).await),
            });
        }
        Ok(Self { html, sheets })
    }

    /// Text of the first `<title>` element, if any.
    pub fn document_title(&self) -> Option<String> {
        let title = Rc::new(RefCell::new(None::<String>));
        let result = rewrite_str(
            &self.html,
            RewriteStrSettings {
                element_content_handlers: vec![text!("title", {
                    let title = Rc::clone(&title);
                    move |chunk| {
                        let mut title = title.borrow_mut();
                        title.get_or_insert_with(String::new).push_str(chunk.as_str());
                        Ok(())
                    }
                })],
                ..RewriteStrSettings::default()
            },
        );
        result.ok()?;
        let title = title.borrow().clone();
        title
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

impl StyleSource for HtmlDocument {
    fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    fn sheet_rules(&self, index: usize) -> Result<Vec<String>, StyleAccessError> {
        match self.sheets.get(index) {
            Some(LoadedSheet::Inline(css)) => Ok(split_rules(css)),
            Some(LoadedSheet::Linked(css)) => css.as_deref().map(split_rules).map_err(Clone::clone),
            None => Err(StyleAccessError::Unreadable {
                href: format!("#{index}"),
                reason: "no such stylesheet".to_string(),
            }),
        }
    }
}

impl DomSource for HtmlDocument {
    fn title(&self) -> Option<String> {
        self.document_title()
    }

    fn outer_html(&self, id: &str) -> Result<Option<String>, SnapshotError> {
        if id.is_empty()
            || id
                .chars()
                .any(|ch| ch == '"' || ch == '\\' || ch.is_whitespace() || ch.is_control())
        {
            return Ok(None);
        }

        let marker = Uuid::new_v4().simple().to_string();
        let start = format!("<!--lpi-snapshot-{marker}-start-->");
        let end = format!("<!--lpi-snapshot-{marker}-end-->");
        let selector = format!("[id=\"{id}\"]");

        let mut matched = false;
        let marked = rewrite_str(
            &self.html,
            RewriteStrSettings {
                element_content_handlers: vec![element!(selector, |el| {
                    if !matched {
                        matched = true;
                        el.before(&start, ContentType::Html);
                        el.after(&end, ContentType::Html);
                    }
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|err| SnapshotError::Source(err.to_string()))?;

        let Some(from) = marked.find(&start) else {
            return Ok(None);
        };
        let inner = &marked[from + start.len()..];
        Ok(inner.find(&end).map(|to| inner[..to].to_string()))
    }
}

async fn read_linked(base_dir: &Path, href: &str) -> Result<String, StyleAccessError> {
    let unreadable = |reason: &str| StyleAccessError::Unreadable {
        href: href.to_string(),
        reason: reason.to_string(),
    };

    if href.starts_with("//") {
        return Err(StyleAccessError::CrossOrigin {
            href: href.to_string(),
        });
    }
    if let Ok(url) = Url::parse(href) {
        return match url.scheme() {
            "http" | "https" => Err(StyleAccessError::CrossOrigin {
                href: href.to_string(),
            }),
            other => Err(unreadable(&format!("unsupported scheme `{other}`"))),
        };
    }

    let path_part = href.split(['?', '#']).next().unwrap_or_default();
    let relative = Path::new(path_part);
    if path_part.is_empty()
        || relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir))
    {
        return Err(unreadable("path escapes the document directory"));
    }

    tokio::fs::read_to_string(base_dir.join(relative))
        .await
        .map_err(|err| unreadable(&err.to_string()))
}

fn collect_sheets(html: &str) -> Result<Vec<Sheet>, DocumentError> {
    let sheets = Rc::new(RefCell::new(Vec::new()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("style", {
                    let sheets = Rc::clone(&sheets);
                    move |_| {
                        sheets.borrow_mut().push(Sheet::Inline(String::new()));
                        Ok(())
                    }
                }),
                text!("style", {
                    let sheets = Rc::clone(&sheets);
                    move |chunk| {
                        if let Some(Sheet::Inline(css)) = sheets.borrow_mut().last_mut() {
                            css.push_str(chunk.as_str());
                        }
                        Ok(())
                    }
                }),
                element!("link[rel][href]", {
                    let sheets = Rc::clone(&sheets);
                    move |el| {
                        let is_stylesheet = el.get_attribute("rel").is_some_and(|rel| {
                            rel.split_ascii_whitespace()
                                .any(|token| token.eq_ignore_ascii_case("stylesheet"))
                        });
                        if is_stylesheet && let Some(href) = el.get_attribute("href") {
                            let href = href.trim().to_string();
                            if !href.is_empty() {
                                sheets.borrow_mut().push(Sheet::Linked(href));
                            }
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| DocumentError::Parse(err.to_string()))?;

    let sheets = sheets.borrow().clone();
    Ok(sheets)
}
