mod memory;
mod postgres;
pub mod seed;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::Config;
use crate::models::{Client, ClientPayload, FieldError, NewClient, Page, PageRequest};

pub use memory::MemoryStore;
pub use postgres::Database;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Row selection for paged queries.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFilter {
    All,
    IncomeGreaterThan(f64),
    IncomeEquals(f64),
    CpfContains(String),
}

impl ClientFilter {
    pub fn matches(&self, client: &Client) -> bool {
        match self {
            ClientFilter::All => true,
            ClientFilter::IncomeGreaterThan(threshold) => client.income > *threshold,
            ClientFilter::IncomeEquals(income) => client.income == *income,
            ClientFilter::CpfContains(fragment) => client.cpf.contains(fragment.as_str()),
        }
    }
}

/// Result of merging an update payload into a stored client.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(Client),
    NotFound,
    Rejected(Vec<FieldError>),
}

/// Storage for client records keyed by id.
///
/// Ids are assigned by the store on insert and never reused. `update_with`
/// reads, merges and writes one record as a single step, so concurrent
/// updates of the same id never merge onto a stale copy. A missing id is
/// reported instead of created.
#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn find_page(&self, filter: &ClientFilter, request: &PageRequest) -> StoreResult<Page<Client>>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Client>>;

    async fn find_by_cpf(&self, cpf: &str) -> StoreResult<Option<Client>>;

    async fn insert(&self, client: NewClient) -> StoreResult<Client>;

    async fn update_with(
        &self,
        id: i64,
        payload: ClientPayload,
        now: DateTime<Utc>,
    ) -> StoreResult<UpdateOutcome>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: i64) -> StoreResult<bool>;

    async fn count(&self) -> StoreResult<u64>;
}

/// Build the store selected by the configuration and load the fixture
/// clients when seeding is enabled.
pub async fn init(config: &Config) -> Result<Arc<dyn ClientStore>> {
    let store: Arc<dyn ClientStore> = match config.database_url() {
        Some(url) => {
            let db = Database::new(url, config.db_max_connections).await?;
            db.migrate().await?;
            info!("Using PostgreSQL client store");
            Arc::new(db)
        }
        None => {
            info!("DATABASE_URL not set, using in-memory client store");
            Arc::new(MemoryStore::new())
        }
    };

    if config.seed_fixtures {
        let inserted = seed::seed_if_empty(store.as_ref()).await?;
        info!(inserted, "Fixture clients loaded");
    }

    Ok(store)
}
