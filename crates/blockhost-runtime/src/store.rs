//! In-memory config store.
//!
//! Backs the CLI, which loads its server list from a config file, and the
//! integration tests. Records keep their insertion order.

use async_trait::async_trait;
use blockhost_core::{ConfigStorePort, RepositoryError, ServerConfig};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct ServerRecord {
    config: ServerConfig,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
}

/// Config store holding records in memory.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    records: RwLock<Vec<ServerRecord>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_servers(configs: impl IntoIterator<Item = ServerConfig>) -> Self {
        let records = configs
            .into_iter()
            .map(|config| ServerRecord {
                config,
                started_at: None,
                stopped_at: None,
            })
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Insert or replace a configuration. Replacing keeps the record's position and timestamps.
    pub async fn upsert(&self, config: ServerConfig) {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.config.id == config.id) {
            Some(record) => record.config = config,
            None => records.push(ServerRecord {
                config,
                started_at: None,
                stopped_at: None,
            }),
        }
    }

    pub async fn remove(&self, id: &str) -> bool {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.config.id != id);
        records.len() != before
    }

    pub async fn started_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.find(id, |r| r.started_at).await
    }

    pub async fn stopped_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.find(id, |r| r.stopped_at).await
    }

    async fn find<T>(&self, id: &str, f: impl FnOnce(&ServerRecord) -> Option<T>) -> Option<T> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.config.id == id)
            .and_then(f)
    }

    async fn update(
        &self,
        id: &str,
        f: impl FnOnce(&mut ServerRecord),
    ) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.config.id == id)
            .ok_or_else(|| RepositoryError::NotFound(format!("server {id}")))?;
        f(record);
        Ok(())
    }
}

#[async_trait]
impl ConfigStorePort for MemoryConfigStore {
    async fn get(&self, id: &str) -> Result<ServerConfig, RepositoryError> {
        self.find(id, |r| Some(r.config.clone()))
            .await
            .ok_or_else(|| RepositoryError::NotFound(format!("server {id}")))
    }

    async fn list_ids(&self) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .map(|r| r.config.id.clone())
            .collect())
    }

    async fn set_started(&self, id: &str, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.update(id, |r| r.started_at = Some(at)).await
    }

    async fn set_stopped(&self, id: &str, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.update(id, |r| r.stopped_at = Some(at)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockhost_core::LaunchTarget;

    fn config(id: &str) -> ServerConfig {
        ServerConfig::new(id, format!("/srv/{id}"), LaunchTarget::jar("server.jar"))
    }

    #[tokio::test]
    async fn list_ids_keeps_insertion_order() {
        let store = MemoryConfigStore::with_servers([config("b"), config("a")]);
        store.upsert(config("c")).await;
        store.upsert(config("b")).await;
        assert_eq!(store.list_ids().await.unwrap(), vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = MemoryConfigStore::new();
        assert!(matches!(
            store.get("ghost").await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(store.set_started("ghost", Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn records_timestamps() {
        let store = MemoryConfigStore::with_servers([config("alpha")]);
        let now = Utc::now();
        store.set_started("alpha", now).await.unwrap();
        assert_eq!(store.started_at("alpha").await, Some(now));
        assert_eq!(store.stopped_at("alpha").await, None);

        assert!(store.remove("alpha").await);
        assert!(!store.remove("alpha").await);
    }
}
