//! Syntax-error diagnostics for loaded schema documents

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::codec::Format;

/// Syntax error in a TOML or YAML document, with source location
#[derive(Debug, Error, Diagnostic)]
#[error("{format} syntax error: {message}")]
#[diagnostic(code(schemantic::codec::syntax))]
pub struct SyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    /// The underlying parser message
    message: String,

    format: Format,
}

impl SyntaxError {
    /// Create a syntax error from a serde_yml error
    pub fn from_yaml_error(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));

        let offset = line_col_to_offset(source, line, column);
        let message = err.to_string();

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help: generate_help(&message),
            message,
            format: Format::Yaml,
        }
    }

    /// Create a syntax error from a toml error
    pub fn from_toml_error(err: &toml::de::Error, source: &str, filename: &str) -> Self {
        let span = err
            .span()
            .map(|range| SourceSpan::from(range.start..range.end.max(range.start + 1)))
            .unwrap_or_else(|| SourceSpan::from(0..1));
        let message = err.message().to_string();

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span,
            help: generate_help(&message),
            message,
            format: Format::Toml,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Byte offset of the error in the source
    pub fn offset(&self) -> usize {
        self.span.offset()
    }
}

/// Convert line/column to byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    let mut current_line = 1;

    for (i, ch) in source.char_indices() {
        if current_line == line {
            let line_start = i;
            let mut col = 1;
            for (j, c) in source[line_start..].char_indices() {
                if col == column {
                    return line_start + j;
                }
                if c == '\n' {
                    break;
                }
                col += 1;
            }
            return line_start + column.saturating_sub(1);
        }
        if ch == '\n' {
            current_line += 1;
        }
        offset = i;
    }

    offset
}

/// Suggest a fix based on the parser message
fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("tab") {
        return Some(
            "YAML requires spaces for indentation, not tabs. Replace tabs with spaces.".to_string(),
        );
    }

    if msg_lower.contains("duplicate key") {
        return Some("Each key can only appear once. Remove or rename the duplicate key.".to_string());
    }

    if msg_lower.contains("expected block end") {
        return Some("Check your indentation - it may be inconsistent.".to_string());
    }

    if msg_lower.contains("mapping values are not allowed") {
        return Some("You may be missing a space after ':' or have incorrect indentation.".to_string());
    }

    if msg_lower.contains("invalid table header") || msg_lower.contains("unclosed table") {
        return Some("Table headers look like [section] or [section.sub].".to_string());
    }

    if msg_lower.contains("invalid string") || msg_lower.contains("invalid basic string") {
        return Some("Quote string values: key = \"value\"".to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_to_offset() {
        let source = "line1\nline2\nline3";
        assert_eq!(line_col_to_offset(source, 1, 1), 0);
        assert_eq!(line_col_to_offset(source, 2, 1), 6);
        assert_eq!(line_col_to_offset(source, 3, 1), 12);
    }

    #[test]
    fn test_help_generation() {
        assert!(generate_help("found tab character").is_some());
        assert!(generate_help("duplicate key").is_some());
        assert!(generate_help("invalid table header").is_some());
        assert!(generate_help("some random error").is_none());
    }

    #[test]
    fn test_from_toml_error_points_into_source() {
        let source = "name = \"x\"\nbroken = \n";
        let err = toml::from_str::<toml::Value>(source).unwrap_err();
        let diagnostic = SyntaxError::from_toml_error(&err, source, "broken.toml");
        assert_eq!(diagnostic.format(), Format::Toml);
        assert!(diagnostic.offset() <= source.len());
        assert!(diagnostic.to_string().starts_with("TOML syntax error"));
    }

    #[test]
    fn test_from_yaml_error() {
        let source = "a: [1, 2\n";
        let err = serde_yml::from_str::<serde_json::Value>(source).unwrap_err();
        let diagnostic = SyntaxError::from_yaml_error(&err, source, "broken.yaml");
        assert_eq!(diagnostic.format(), Format::Yaml);
        assert!(!diagnostic.message().is_empty());
    }
}
