//! DCE: Data-Center Cost Estimator
//!
//! Builds construction cost estimates for data-center projects from a
//! catalog of priced components and assemblies, and tracks actual spend
//! against them. Everything is stored as plain YAML files in a workspace.

pub mod chat;
pub mod cli;
pub mod core;
pub mod cost;
pub mod entities;
pub mod schema;
pub mod yaml;
