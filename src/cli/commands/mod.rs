//! CLI command implementations

pub mod asm;
pub mod chat;
pub mod chg;
pub mod cmp;
pub mod completions;
pub mod config;
pub mod cost;
pub mod dashboard;
pub mod est;
pub mod init;
pub mod proj;
pub mod security;
pub mod session;
pub mod validate;
pub mod variance;
