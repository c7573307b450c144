//! Infrastructure layer: configuration and storage.
//!
//! Storage is expressed as repository traits (`store`) with two backends
//! sharing the same semantics: `memory` for development and tests, and
//! `postgres` for deployments.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod reports;
pub mod store;

pub use bootstrap::{BootstrapError, seed_admin};
pub use config::{AppConfig, ConfigError};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use store::Store;
