use crate::error::{FatalError, ParseError, ParseErrorKind};
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::LazyLock;

static LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"line (\d+),? col(?:umn)? (\d+)").unwrap());

/// Read a configuration file as UTF-8 text.
pub fn read_text(path: &Path) -> Result<String, FatalError> {
    std::fs::read_to_string(path).map_err(|e| FatalError::io(path, e))
}

/// Decode raw YAML text into an untyped document tree.
///
/// Performs YAML deserialization only. Shape checks belong to the schema
/// stage, which also produces the typed [`crate::types::ModeDocument`].
pub fn parse(input: &str) -> Result<Value, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError {
            kind: ParseErrorKind::Empty,
            message: "empty input".to_string(),
            line: None,
            column: None,
        });
    }

    check_multi_document(input)?;

    serde_saphyr::from_str::<Value>(input).map_err(|e| {
        let message = e.to_string();
        let (line, column) = extract_location(&message);
        ParseError {
            kind: ParseErrorKind::Syntax,
            message,
            line,
            column,
        }
    })
}

/// A second document would be dropped silently by most loaders, hiding
/// every mode declared in it.
fn check_multi_document(input: &str) -> Result<(), ParseError> {
    let mut doc_count = 0;
    let mut seen_content = false;
    for (i, line) in input.lines().enumerate() {
        // Document markers start at column 0
        if line.starts_with("---") && line[3..].trim().is_empty() {
            doc_count += 1;
            if doc_count > 1 || seen_content {
                return Err(ParseError {
                    kind: ParseErrorKind::MultiDocument,
                    message: "multi-document YAML is not supported".to_string(),
                    line: Some(i + 1),
                    column: Some(1),
                });
            }
        } else if !line.trim().is_empty() && !line.trim_start().starts_with('#') {
            seen_content = true;
        }
    }
    Ok(())
}

fn extract_location(msg: &str) -> (Option<usize>, Option<usize>) {
    match LOCATION_RE.captures(msg) {
        Some(caps) => (
            caps.get(1).and_then(|m| m.as_str().parse().ok()),
            caps.get(2).and_then(|m| m.as_str().parse().ok()),
        ),
        None => (None, None),
    }
}
