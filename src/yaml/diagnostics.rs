//! YAML error diagnostics with source spans

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// YAML syntax or shape error with source location
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(dce::yaml::syntax))]
pub struct YamlSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    message: String,
}

impl YamlSyntaxError {
    /// Create a diagnostic from a serde_yml error
    pub fn from_serde_error(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));

        let offset = line_col_to_offset(source, line, column);
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error raised while reading a record file
#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("IO error: {0}")]
    #[diagnostic(code(dce::yaml::io))]
    Io(#[from] std::io::Error),
}

/// Convert a 1-based line/column to a byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut line_start = 0;
    for (index, text) in source.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            let within = text
                .char_indices()
                .nth(column.saturating_sub(1))
                .map(|(i, _)| i)
                .unwrap_or(text.len().saturating_sub(1));
            return line_start + within;
        }
        line_start += text.len();
    }
    source.len().saturating_sub(1)
}

/// Suggest a fix for common mistakes in hand-edited record files
fn generate_help(message: &str) -> Option<String> {
    let msg = message.to_lowercase();

    if msg.contains("tab") {
        return Some("YAML indentation must use spaces, not tabs.".to_string());
    }

    if msg.contains("duplicate") {
        return Some("Each key can appear only once per mapping.".to_string());
    }

    if msg.contains("invalid type") && msg.contains("f64") {
        return Some(
            "Costs, quantities and hours are plain numbers: write `unit_cost: 1250.00`, not `$1,250`."
                .to_string(),
        );
    }

    if msg.contains("unknown variant") {
        return Some("Check the spelling of enumerated values such as category or status.".to_string());
    }

    if msg.contains("missing field") {
        return Some("A required field is absent; compare with a record created by `dce`.".to_string());
    }

    if msg.contains("invalid entity prefix") || msg.contains("invalid ulid") {
        return Some("References use full ids such as CMP-01J... copied from `dce cmp list`.".to_string());
    }

    if msg.contains("mapping values are not allowed") {
        return Some("Missing space after ':' or inconsistent indentation.".to_string());
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
        assert_eq!(line_col_to_offset(source, 3, 3), 14);
    }

    #[test]
    fn test_help_generation() {
        assert!(generate_help("invalid type: string \"$100\", expected f64").is_some());
        assert!(generate_help("found tab character").is_some());
        assert!(generate_help("missing field `name`").is_some());
        assert!(generate_help("some random error").is_none());
    }
}
