//! Schema validation with detailed error reporting

use jsonschema::{validator_for, ValidationError as JsonSchemaError, Validator as JsonValidator};
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use thiserror::Error;

use crate::core::EntityPrefix;
use crate::schema::registry::SchemaRegistry;

/// Validation error with source location information
#[derive(Debug, Error, Diagnostic)]
#[error("Schema validation failed: {summary}")]
#[diagnostic(code(dce::schema::validation_error))]
pub struct ValidationError {
    summary: String,

    #[source_code]
    src: NamedSource<String>,

    #[related]
    violations: Vec<SchemaViolation>,
}

/// A single schema violation
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SchemaViolation {
    #[label("{}", self.hint)]
    span: SourceSpan,

    message: String,
    hint: String,

    #[help]
    help: Option<String>,
}

impl SchemaViolation {
    pub fn new(message: String, hint: String, span: SourceSpan, help: Option<String>) -> Self {
        Self {
            span,
            message,
            hint,
            help,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ValidationError {
    pub fn new(filename: &str, source: &str, violations: Vec<SchemaViolation>) -> Self {
        let count = violations.len();
        let summary = if count == 1 {
            "1 error".to_string()
        } else {
            format!("{} errors", count)
        };
        Self {
            summary,
            src: NamedSource::new(filename, source.to_string()),
            violations,
        }
    }

    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[SchemaViolation] {
        &self.violations
    }
}

/// Schema validator with compiled schemas
pub struct Validator {
    /// Compiled JSON schemas by entity prefix
    compiled: HashMap<EntityPrefix, JsonValidator>,
}

impl Validator {
    /// Compile every schema in the registry; a schema that fails to compile
    /// is logged and skipped
    pub fn new(registry: &SchemaRegistry) -> Self {
        let mut compiled = HashMap::new();

        for prefix in registry.prefixes() {
            let Some(schema_str) = registry.get(prefix) else {
                continue;
            };
            let compiled_schema = serde_json::from_str::<JsonValue>(schema_str)
                .map_err(|e| e.to_string())
                .and_then(|json| validator_for(&json).map_err(|e| e.to_string()));
            match compiled_schema {
                Ok(schema) => {
                    compiled.insert(prefix, schema);
                }
                Err(e) => tracing::warn!(%prefix, error = %e, "skipping invalid schema"),
            }
        }

        Self { compiled }
    }

    /// Validate YAML content against the schema for the given entity type,
    /// collecting every violation
    pub fn validate(
        &self,
        content: &str,
        filename: &str,
        prefix: EntityPrefix,
    ) -> Result<(), ValidationError> {
        let yaml_value: serde_yml::Value = match serde_yml::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                let span = find_error_span(content, e.location());
                let violation = SchemaViolation::new(
                    format!("YAML parse error: {}", e),
                    "invalid YAML".to_string(),
                    span,
                    Some("Check YAML syntax - proper indentation, colons, quotes".to_string()),
                );
                return Err(ValidationError::new(filename, content, vec![violation]));
            }
        };

        let json_value: JsonValue = match serde_json::to_value(&yaml_value) {
            Ok(v) => v,
            Err(e) => {
                let violation = SchemaViolation::new(
                    format!("Failed to convert YAML to JSON: {}", e),
                    "conversion error".to_string(),
                    (0, content.len()).into(),
                    None,
                );
                return Err(ValidationError::new(filename, content, vec![violation]));
            }
        };

        let Some(schema) = self.compiled.get(&prefix) else {
            return Ok(());
        };

        let violations: Vec<SchemaViolation> = schema
            .iter_errors(&json_value)
            .map(|e| error_to_violation(content, &e))
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(filename, content, violations))
        }
    }

    /// Whether a schema is loaded for the prefix
    pub fn covers(&self, prefix: EntityPrefix) -> bool {
        self.compiled.contains_key(&prefix)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(&SchemaRegistry::default())
    }
}

fn error_to_violation(content: &str, error: &JsonSchemaError) -> SchemaViolation {
    let path = error.instance_path.to_string();
    let message = format_schema_error(error);
    let hint = format_error_hint(error);
    let help = generate_help_message(error);
    let span = find_path_span(content, &path);

    SchemaViolation::new(message, hint, span, help)
}

fn format_schema_error(error: &JsonSchemaError) -> String {
    let path = if error.instance_path.as_str().is_empty() {
        "document root".to_string()
    } else {
        format!("'{}'", error.instance_path)
    };

    match &error.kind {
        jsonschema::error::ValidationErrorKind::Required { property } => {
            let prop_str = property
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| property.to_string());
            format!("Missing required field: {} at {}", prop_str, path)
        }
        jsonschema::error::ValidationErrorKind::Type { kind } => {
            format!("Wrong type at {}: expected {:?}", path, kind)
        }
        jsonschema::error::ValidationErrorKind::Enum { options } => {
            format!(
                "Invalid value at {}: must be one of: {}",
                path,
                format_enum_options(options)
            )
        }
        jsonschema::error::ValidationErrorKind::Pattern { pattern } => {
            format!("Value at {} doesn't match pattern: {}", path, pattern)
        }
        jsonschema::error::ValidationErrorKind::Minimum { limit } => {
            format!("Value at {} is too small: minimum {}", path, limit)
        }
        jsonschema::error::ValidationErrorKind::ExclusiveMinimum { limit } => {
            format!("Value at {} must be greater than {}", path, limit)
        }
        jsonschema::error::ValidationErrorKind::AdditionalProperties { unexpected } => {
            format!("Unknown field(s) at {}: {}", path, unexpected.join(", "))
        }
        _ => format!("Validation error at {}: {}", path, error),
    }
}

fn format_enum_options(options: &JsonValue) -> String {
    if let Some(arr) = options.as_array() {
        arr.iter()
            .map(|v| v.as_str().map(|s| s.to_string()).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        options.to_string()
    }
}

fn format_error_hint(error: &JsonSchemaError) -> String {
    match &error.kind {
        jsonschema::error::ValidationErrorKind::Required { .. } => "required field missing",
        jsonschema::error::ValidationErrorKind::Type { .. } => "wrong type",
        jsonschema::error::ValidationErrorKind::Enum { .. } => "invalid value",
        jsonschema::error::ValidationErrorKind::Pattern { .. } => "pattern mismatch",
        jsonschema::error::ValidationErrorKind::Minimum { .. }
        | jsonschema::error::ValidationErrorKind::ExclusiveMinimum { .. } => "out of range",
        jsonschema::error::ValidationErrorKind::AdditionalProperties { .. } => "unknown field",
        _ => "validation error",
    }
    .to_string()
}

fn generate_help_message(error: &JsonSchemaError) -> Option<String> {
    match &error.kind {
        jsonschema::error::ValidationErrorKind::Required { property } => {
            let prop_str = property
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| property.to_string());
            Some(format!("Add the '{}' field to your file", prop_str))
        }
        jsonschema::error::ValidationErrorKind::Enum { options } => {
            Some(format!("Valid values: {}", format_enum_options(options)))
        }
        jsonschema::error::ValidationErrorKind::Pattern { pattern } => {
            let prefix = EntityPrefix::all()
                .iter()
                .find(|p| pattern.starts_with(&format!("^{}-", p.as_str())))?;
            Some(format!(
                "ID format: {}-[26 ULID characters], e.g., {}-01HC2JB7SMQX7RS1Y0GFKBHPTD",
                prefix, prefix
            ))
        }
        jsonschema::error::ValidationErrorKind::Minimum { .. }
        | jsonschema::error::ValidationErrorKind::ExclusiveMinimum { .. } => {
            Some("Costs and quantities cannot be negative".to_string())
        }
        jsonschema::error::ValidationErrorKind::AdditionalProperties { unexpected } => {
            if unexpected.len() == 1 {
                Some(format!("Remove the '{}' field or check spelling", unexpected[0]))
            } else {
                Some("Remove unknown fields or check spelling".to_string())
            }
        }
        _ => None,
    }
}

/// Find the span (byte offset, length) for a YAML parse error location
fn find_error_span(content: &str, location: Option<serde_yml::Location>) -> SourceSpan {
    if let Some(loc) = location {
        let line = loc.line().saturating_sub(1);
        let column = loc.column().saturating_sub(1);

        let mut offset = 0;
        for (i, line_content) in content.lines().enumerate() {
            if i == line {
                offset += column;
                break;
            }
            offset += line_content.len() + 1;
        }

        let rest_of_content = &content[offset.min(content.len())..];
        let len = rest_of_content
            .find('\n')
            .unwrap_or(rest_of_content.len())
            .max(1);

        (offset, len).into()
    } else {
        let len = content.find('\n').unwrap_or(content.len()).max(1);
        (0, len).into()
    }
}

/// Find the span for a JSON path (e.g. "/items/0/quantity") in YAML content
fn find_path_span(content: &str, json_path: &str) -> SourceSpan {
    let parts: Vec<&str> = json_path.split('/').filter(|s| !s.is_empty()).collect();

    let first_line = || -> SourceSpan {
        let len = content.find('\n').unwrap_or(content.len()).max(1);
        (0, len).into()
    };

    let Some(search_key) = parts.last() else {
        return first_line();
    };

    // Array index: point at the parent key instead
    if search_key.parse::<usize>().is_ok() && parts.len() >= 2 {
        if let Some(span) = find_key_span(content, parts[parts.len() - 2]) {
            return span;
        }
    }

    find_key_span(content, search_key).unwrap_or_else(first_line)
}

/// Find the first `key:` at the start of a line
fn find_key_span(content: &str, key: &str) -> Option<SourceSpan> {
    let search_pattern = format!("{}:", key);

    let mut offset = 0;
    for line in content.lines() {
        let trimmed = line.trim_start().trim_start_matches("- ");
        if trimmed.starts_with(&search_pattern) {
            let key_start = offset + (line.len() - trimmed.len());
            return Some((key_start, trimmed.len()).into());
        }
        offset += line.len() + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const CMP_ID: &str = "CMP-01HC2JB7SMQX7RS1Y0GFKBHPTD";

    fn validator() -> Validator {
        Validator::default()
    }

    #[test]
    fn test_validator_covers_every_entity() {
        let v = validator();
        for prefix in EntityPrefix::all() {
            assert!(v.covers(*prefix), "no schema compiled for {}", prefix);
        }
    }

    #[test]
    fn test_valid_component() {
        let yaml = format!(
            r#"
id: {CMP_ID}
name: 500 kVA UPS Module
category: power
unit: ea
labor_hours: 16.0
tiers:
  - id: standard
    name: Standard
    unit_cost: 48500.0
  - id: premium
    name: Premium
    unit_cost: 61250.5
owner: alice
created: 2026-01-01T00:00:00Z
"#
        );
        let result = validator().validate(&yaml, "cmp.dce.yaml", EntityPrefix::Cmp);
        assert!(result.is_ok(), "valid component should pass: {:?}", result);
    }

    #[test]
    fn test_missing_required_field() {
        let yaml = format!("id: {CMP_ID}\ncategory: power\n");
        let err = validator()
            .validate(&yaml, "cmp.dce.yaml", EntityPrefix::Cmp)
            .unwrap_err();
        assert!(err.violation_count() >= 3);
        assert!(err.violations().iter().any(|v| v.message().contains("name")));
    }

    #[test]
    fn test_invalid_category() {
        let yaml = format!(
            "id: {CMP_ID}\nname: Pipe\ncategory: plumbing\nowner: alice\ncreated: 2026-01-01T00:00:00Z\n"
        );
        let err = validator()
            .validate(&yaml, "cmp.dce.yaml", EntityPrefix::Cmp)
            .unwrap_err();
        assert!(err.violations().iter().any(|v| v.message().contains("category")));
    }

    #[test]
    fn test_negative_tier_cost_rejected() {
        let yaml = format!(
            r#"
id: {CMP_ID}
name: Rack
tiers:
  - id: standard
    name: Standard
    unit_cost: -5.0
owner: alice
created: 2026-01-01T00:00:00Z
"#
        );
        assert!(validator()
            .validate(&yaml, "cmp.dce.yaml", EntityPrefix::Cmp)
            .is_err());
    }

    #[test]
    fn test_estimate_shape_and_unknown_field() {
        let base = r#"
id: EST-01HC2JB7SMQX7RS1Y0GFKBHPTD
name: Hall A
shape: flat
items: []
total_cost: 0.0
total_labor_hours: 0.0
owner: alice
created: 2026-01-01T00:00:00Z
updated: 2026-01-01T00:00:00Z
"#;
        assert!(validator().validate(base, "e.dce.yaml", EntityPrefix::Est).is_ok());

        let bad_shape = base.replace("shape: flat", "shape: nested");
        assert!(validator().validate(&bad_shape, "e.dce.yaml", EntityPrefix::Est).is_err());

        let extra = format!("{base}margin: 0.2\n");
        let err = validator()
            .validate(&extra, "e.dce.yaml", EntityPrefix::Est)
            .unwrap_err();
        assert!(err.violations().iter().any(|v| v.message().contains("margin")));
    }

    #[test]
    fn test_invalid_id_pattern() {
        let yaml = "id: CMP-invalid\nname: X\nowner: alice\ncreated: 2026-01-01T00:00:00Z\n";
        assert!(validator()
            .validate(yaml, "cmp.dce.yaml", EntityPrefix::Cmp)
            .is_err());
    }

    #[test]
    fn test_yaml_syntax_error() {
        let err = validator()
            .validate("name: [unclosed", "cmp.dce.yaml", EntityPrefix::Cmp)
            .unwrap_err();
        assert_eq!(err.violation_count(), 1);
        assert!(err.violations()[0].message().starts_with("YAML parse error"));
    }

    #[test]
    fn test_find_key_span() {
        let content = "id: CMP-123\nname: \"Test\"\ntiers:\n  - unit_cost: 5\n";
        let span = find_key_span(content, "name").unwrap();
        assert_eq!(span.offset(), 12);
        let span = find_key_span(content, "unit_cost").unwrap();
        assert!(span.offset() > 30);
    }
}
