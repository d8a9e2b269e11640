//! HTTP API for managing client records: paged listing, lookup, create,
//! update, delete and income/CPF queries over a pluggable store.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod telemetry;

pub use config::{Config, PagingConfig};
pub use db::{ClientFilter, ClientStore, Database, MemoryStore, StoreError, StoreResult, UpdateOutcome};
pub use error::{ApiError, ApiResult, ErrorKind, StandardError};
pub use models::{Client, ClientPayload, NewClient, Page, PageRequest};
pub use routes::{create_router, AppState};
