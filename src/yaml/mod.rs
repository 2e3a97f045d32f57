//! YAML record parsing

pub mod diagnostics;

use serde::de::DeserializeOwned;
use std::path::Path;

pub use diagnostics::{YamlError, YamlSyntaxError};

/// Parse a YAML string, attaching source spans to errors
pub fn parse_yaml<T: DeserializeOwned>(content: &str, filename: &str) -> Result<T, YamlError> {
    serde_yml::from_str(content)
        .map_err(|e| YamlSyntaxError::from_serde_error(&e, content, filename).into())
}

/// Read and parse a YAML file
pub fn parse_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T, YamlError> {
    let content = std::fs::read_to_string(path)?;
    parse_yaml(&content, &path.display().to_string())
}
