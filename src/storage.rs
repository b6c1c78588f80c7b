use crate::errors::StoreError;
use crate::models::Product;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::{
    fs,
    sync::{Mutex, broadcast, broadcast::error::TryRecvError},
};
use tracing::{debug, error, warn};

pub const DEFAULT_CATEGORIES: [&str; 2] = ["Informatique", "Accessoires"];

const CHANGE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Products,
    Categories,
}

impl StoreKey {
    pub const ALL: [StoreKey; 2] = [StoreKey::Products, StoreKey::Categories];

    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::Products => "products",
            StoreKey::Categories => "categories",
        }
    }
}

/// Identifies the execution context (tab, sync task) that issued a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChange {
    pub key: StoreKey,
    pub origin: ContextId,
}

enum Backend {
    Disk(PathBuf),
    Memory(Mutex<HashMap<StoreKey, String>>),
}

/// Key-value text store holding one JSON document per key.
pub struct Store {
    backend: Backend,
    changes: broadcast::Sender<StoreChange>,
    next_context: AtomicU64,
}

impl Store {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Arc<Self>, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|source| StoreError::Io {
            target: "data directory",
            source,
        })?;
        Ok(Arc::new(Self::with_backend(Backend::Disk(dir))))
    }

    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self::with_backend(Backend::Memory(Mutex::new(HashMap::new()))))
    }

    fn with_backend(backend: Backend) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            backend,
            changes,
            next_context: AtomicU64::new(1),
        }
    }

    /// Opens a new execution context on this store.
    pub fn context(self: &Arc<Self>) -> StoreHandle {
        let origin = ContextId(self.next_context.fetch_add(1, Ordering::Relaxed));
        StoreHandle {
            store: Arc::clone(self),
            origin,
        }
    }

    async fn read_raw(&self, key: StoreKey) -> Option<String> {
        match &self.backend {
            Backend::Memory(entries) => entries.lock().await.get(&key).cloned(),
            Backend::Disk(dir) => {
                let path = dir.join(format!("{}.json", key.as_str()));
                match fs::read_to_string(&path).await {
                    Ok(text) => Some(text),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
                    Err(err) => {
                        error!("failed to read {}: {err}", path.display());
                        None
                    }
                }
            }
        }
    }

    async fn write_raw(&self, key: StoreKey, text: String, origin: ContextId) -> Result<(), StoreError> {
        match &self.backend {
            Backend::Memory(entries) => {
                entries.lock().await.insert(key, text);
            }
            Backend::Disk(dir) => {
                let path = dir.join(format!("{}.json", key.as_str()));
                let tmp = dir.join(format!("{}.json.{}.tmp", key.as_str(), origin.0));
                let io_err = |source| StoreError::Io {
                    target: key.as_str(),
                    source,
                };
                fs::write(&tmp, text).await.map_err(io_err)?;
                fs::rename(&tmp, &path).await.map_err(io_err)?;
            }
        }
        Ok(())
    }
}

/// A store seen from one execution context.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<Store>,
    origin: ContextId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub products: Vec<Product>,
    pub categories: Vec<String>,
}

impl StoreHandle {
    pub async fn save<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) -> Result<(), StoreError> {
        let text = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
            key: key.as_str(),
            source,
        })?;
        self.store.write_raw(key, text, self.origin).await?;
        debug!(key = key.as_str(), origin = self.origin.0, "stored");
        // No receivers is fine: nobody else is listening yet.
        let _ = self.store.changes.send(StoreChange {
            key,
            origin: self.origin,
        });
        Ok(())
    }

    /// Returns `None` when the key is absent or its value does not parse as `T`.
    pub async fn load<T: DeserializeOwned>(&self, key: StoreKey) -> Option<T> {
        let text = self.store.read_raw(key).await?;
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("ignoring unparseable {}: {err}", key.as_str());
                None
            }
        }
    }

    pub async fn load_snapshot(&self) -> Snapshot {
        let products = self.load(StoreKey::Products).await.unwrap_or_default();
        let categories = self
            .load(StoreKey::Categories)
            .await
            .unwrap_or_else(default_categories);
        Snapshot {
            products,
            categories,
        }
    }

    pub fn subscribe(&self) -> ExternalChanges {
        ExternalChanges {
            rx: self.store.changes.subscribe(),
            origin: self.origin,
        }
    }
}

pub fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|label| label.to_string()).collect()
}

/// Change notifications written by other contexts than the subscriber's.
pub struct ExternalChanges {
    rx: broadcast::Receiver<StoreChange>,
    origin: ContextId,
}

impl ExternalChanges {
    /// Collects pending foreign changes without waiting.
    pub fn drain(&mut self) -> Vec<StoreKey> {
        let mut keys = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(change) if change.origin != self.origin => {
                    if !keys.contains(&change.key) {
                        keys.push(change.key);
                    }
                }
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "change notifications lagged");
                    for key in StoreKey::ALL {
                        if !keys.contains(&key) {
                            keys.push(key);
                        }
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductId;
    use tempfile::TempDir;

    fn sample() -> Product {
        Product {
            id: ProductId(1),
            name: "Écran".into(),
            price: 199.0,
            qty: 4,
            category: "Informatique".into(),
        }
    }

    #[tokio::test]
    async fn snapshot_defaults_on_first_run() {
        let store = Store::in_memory();
        let snapshot = store.context().load_snapshot().await;
        assert!(snapshot.products.is_empty());
        assert_eq!(snapshot.categories, vec!["Informatique", "Accessoires"]);
    }

    #[tokio::test]
    async fn saved_values_load_back() {
        let store = Store::in_memory();
        let handle = store.context();
        handle.save(StoreKey::Products, &vec![sample()]).await.unwrap();
        let loaded: Vec<Product> = handle.load(StoreKey::Products).await.unwrap();
        assert_eq!(loaded, vec![sample()]);
    }

    #[tokio::test]
    async fn corrupted_value_falls_back_to_default() {
        let store = Store::in_memory();
        store
            .write_raw(StoreKey::Categories, "{not json".into(), ContextId(0))
            .await
            .unwrap();
        let snapshot = store.context().load_snapshot().await;
        assert_eq!(snapshot.categories, default_categories());
    }

    #[tokio::test]
    async fn notifications_skip_the_writing_context() {
        let store = Store::in_memory();
        let writer = store.context();
        let reader = store.context();
        let mut own = writer.subscribe();
        let mut other = reader.subscribe();

        writer.save(StoreKey::Categories, &default_categories()).await.unwrap();
        writer.save(StoreKey::Categories, &default_categories()).await.unwrap();

        assert!(own.drain().is_empty());
        assert_eq!(other.drain(), vec![StoreKey::Categories]);
        assert!(other.drain().is_empty());
    }

    #[tokio::test]
    async fn lagged_subscriber_reports_every_key() {
        let store = Store::in_memory();
        let writer = store.context();
        let mut changes = store.context().subscribe();

        for _ in 0..CHANGE_CAPACITY + 5 {
            writer.save(StoreKey::Categories, &default_categories()).await.unwrap();
        }

        let keys = changes.drain();
        assert_eq!(keys.len(), StoreKey::ALL.len());
        assert!(keys.contains(&StoreKey::Products));
        assert!(keys.contains(&StoreKey::Categories));
        assert!(changes.drain().is_empty());
    }

    #[tokio::test]
    async fn disk_backend_round_trips_through_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("data");
        let store = Store::open(&dir).await.unwrap();
        let handle = store.context();
        handle.save(StoreKey::Products, &vec![sample()]).await.unwrap();

        let text = std::fs::read_to_string(dir.join("products.json")).unwrap();
        assert!(text.contains("\"cat\":\"Informatique\""));

        let reopened = Store::open(&dir).await.unwrap();
        assert_eq!(reopened.context().load_snapshot().await.products, vec![sample()]);
    }
}
