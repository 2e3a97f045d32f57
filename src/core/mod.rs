//! Core module - fundamental types and utilities

pub mod config;
pub mod entity;
pub mod identity;
pub mod loader;
pub mod security;
pub mod session;
pub mod store;
pub mod workspace;

pub use config::Config;
pub use entity::Entity;
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use session::{Session, SessionError};
pub use store::{Catalog, FileStore, Store, StoreError};
pub use workspace::{Workspace, WorkspaceError};
