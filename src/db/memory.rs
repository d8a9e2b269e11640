use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{ClientFilter, ClientStore, StoreResult, UpdateOutcome};
use crate::models::{Client, ClientPayload, NewClient, Page, PageRequest};

#[derive(Debug, Default)]
struct Inner {
    clients: BTreeMap<i64, Client>,
    last_id: i64,
}

/// Client store held in process memory.
///
/// All mutations take the write lock, so a read-modify-write on one id is
/// never interleaved with another writer. `last_id` only grows, which keeps
/// ids of deleted clients retired.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn find_page(&self, filter: &ClientFilter, request: &PageRequest) -> StoreResult<Page<Client>> {
        let inner = self.inner.read().await;
        let matching = inner
            .clients
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        Ok(Page::from_unsorted(matching, request))
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Client>> {
        Ok(self.inner.read().await.clients.get(&id).cloned())
    }

    async fn find_by_cpf(&self, cpf: &str) -> StoreResult<Option<Client>> {
        let inner = self.inner.read().await;
        Ok(inner.clients.values().find(|c| c.cpf == cpf).cloned())
    }

    async fn insert(&self, client: NewClient) -> StoreResult<Client> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let client = client.with_id(inner.last_id);
        inner.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn update_with(
        &self,
        id: i64,
        payload: ClientPayload,
        now: DateTime<Utc>,
    ) -> StoreResult<UpdateOutcome> {
        let mut inner = self.inner.write().await;
        let Some(stored) = inner.clients.get_mut(&id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        match payload.apply_to(stored, now) {
            Ok(changed) => {
                *stored = changed.clone();
                Ok(UpdateOutcome::Updated(changed))
            }
            Err(errors) => Ok(UpdateOutcome::Rejected(errors)),
        }
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        Ok(self.inner.write().await.clients.remove(&id).is_some())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.inner.read().await.clients.len() as u64)
    }
}
