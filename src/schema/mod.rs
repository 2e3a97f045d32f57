//! Schema system - embedded JSON schemas and validation

pub mod registry;
pub mod validator;

pub use registry::SchemaRegistry;
pub use validator::{ValidationError, Validator};
