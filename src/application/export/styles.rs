//! Style snapshot extraction.
//!
//! A report is exported together with every CSS rule the document can reach.
//! Sheets that refuse enumeration (the CSSOM raises for cross-origin sheets)
//! are skipped one by one; extraction itself never fails.

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StyleAccessError {
    #[error("stylesheet `{href}` is cross-origin")]
    CrossOrigin { href: String },
    #[error("stylesheet `{href}` could not be read: {reason}")]
    Unreadable { href: String, reason: String },
}

/// Ordered stylesheets of a document.
pub trait StyleSource {
    fn sheet_count(&self) -> usize;

    /// Rule texts of the sheet at `index`, in declaration order.
    fn sheet_rules(&self, index: usize) -> Result<Vec<String>, StyleAccessError>;
}

/// Concatenate every reachable rule, sheet order first, rule order second.
///
/// Duplicates and conflicting rules are kept verbatim; the cascade resolves
/// them again once the text is re-injected.
pub fn extract_styles(source: &dyn StyleSource) -> String {
    let mut output = String::new();
    let mut skipped = 0usize;

    for index in 0..source.sheet_count() {
        match source.sheet_rules(index) {
            Ok(rules) => {
                for rule in rules {
                    if !output.is_empty() {
                        output.push('\n');
                    }
                    output.push_str(&rule);
                }
            }
            Err(err) => {
                skipped += 1;
                debug!(
                    target = "lpi_export::export::styles",
                    sheet = index,
                    error = %err,
                    "Skipping inaccessible stylesheet"
                );
            }
        }
    }

    debug!(
        target = "lpi_export::export::styles",
        sheets = source.sheet_count(),
        skipped,
        bytes = output.len(),
        "Collected style snapshot"
    );
    output
}

/// Split raw stylesheet text into its top-level rules.
///
/// Comments are dropped. Braces and semicolons inside strings or nested
/// blocks (`@media`, `@supports`) do not terminate a rule.
pub fn split_rules(css: &str) -> Vec<String> {
    let mut rules = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = css.chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(open) = quote {
            current.push(ch);
            if ch == '\\' {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            } else if ch == open {
                quote = None;
            }
            continue;
        }

        match ch {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for inner in chars.by_ref() {
                    if previous == '*' && inner == '/' {
                        break;
                    }
                    previous = inner;
                }
            }
            '"' | '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            '\\' => {
                current.push(ch);
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '{' => {
                depth += 1;
                current.push(ch);
            }
            '}' => {
                current.push(ch);
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    push_rule(&mut rules, &mut current);
                }
            }
            ';' if depth == 0 => {
                current.push(ch);
                push_rule(&mut rules, &mut current);
            }
            _ => current.push(ch),
        }
    }

    push_rule(&mut rules, &mut current);
    rules
}

fn push_rule(rules: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        rules.push(trimmed.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSheets(Vec<Result<Vec<String>, StyleAccessError>>);

    impl StyleSource for FixedSheets {
        fn sheet_count(&self) -> usize {
            self.0.len()
        }

        fn sheet_rules(&self, index: usize) -> Result<Vec<String>, StyleAccessError> {
            self.0[index].clone()
        }
    }

    fn rules(items: &[&str]) -> Result<Vec<String>, StyleAccessError> {
        Ok(items.iter().map(|item| item.to_string()).collect())
    }

    #[test]
    fn inaccessible_sheet_does_not_stop_later_sheets() {
        let source = FixedSheets(vec![
            rules(&["body { margin: 0; }"]),
            Err(StyleAccessError::CrossOrigin {
                href: "https://cdn.example/theme.css".into(),
            }),
            rules(&[".chart { width: 100%; }", ".chart { width: 90%; }"]),
        ]);

        let styles = extract_styles(&source);
        assert_eq!(
            styles,
            "body { margin: 0; }\n.chart { width: 100%; }\n.chart { width: 90%; }"
        );
    }

    #[test]
    fn every_sheet_failing_yields_empty_text() {
        let source = FixedSheets(vec![
            Err(StyleAccessError::Unreadable {
                href: "missing.css".into(),
                reason: "not found".into(),
            }),
            Err(StyleAccessError::CrossOrigin {
                href: "//fonts.example/x.css".into(),
            }),
        ]);

        assert_eq!(extract_styles(&source), "");
    }

    #[test]
    fn duplicates_are_preserved_in_order() {
        let source = FixedSheets(vec![rules(&["a { color: red; }"]), rules(&["a { color: red; }"])]);
        assert_eq!(
            extract_styles(&source),
            "a { color: red; }\na { color: red; }"
        );
    }

    #[test]
    fn splits_top_level_rules() {
        let css = "@charset \"utf-8\";\nbody { margin: 0 }\n.a, .b { color: red; }";
        assert_eq!(
            split_rules(css),
            vec![
                "@charset \"utf-8\";",
                "body { margin: 0 }",
                ".a, .b { color: red; }"
            ]
        );
    }

    #[test]
    fn keeps_nested_blocks_together() {
        let css = "@media print { .page { break-after: page; } .nav { display: none } } p{}";
        assert_eq!(
            split_rules(css),
            vec![
                "@media print { .page { break-after: page; } .nav { display: none } }",
                "p{}"
            ]
        );
    }

    #[test]
    fn ignores_braces_in_strings_and_comments() {
        let css = "/* } */ .q::before { content: \"}\"; } /* { */ .r { content: '\\'}' }";
        assert_eq!(
            split_rules(css),
            vec![".q::before { content: \"}\"; }", ".r { content: '\\'}' }"]
        );
    }

    #[test]
    fn unterminated_tail_is_kept() {
        assert_eq!(split_rules(".x { color: red"), vec![".x { color: red"]);
        assert!(split_rules("  /* only a comment */ ").is_empty());
    }
}
