use crate::errors::CatalogError;
use crate::inventory::Inventory;
use crate::models::CatalogEntry;
use crate::storage::{StoreHandle, StoreKey, default_categories};
use chrono::Local;
use serde::Serialize;
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{
    sync::{RwLock, watch},
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

pub const DEFAULT_CATALOG_URL: &str = "https://fakestoreapi.com/products";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only source of catalog entries.
pub trait CatalogSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Vec<CatalogEntry>, CatalogError>> + Send;
}

pub struct HttpCatalog {
    client: reqwest::Client,
    url: String,
}

impl HttpCatalog {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!("falling back to default http client: {err}");
                reqwest::Client::new()
            });
        Self {
            client,
            url: url.into(),
        }
    }
}

impl CatalogSource for HttpCatalog {
    async fn fetch(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status));
        }
        let body = response.bytes().await?;
        parse_catalog(&body)
    }
}

/// All-or-nothing: one malformed entry rejects the whole payload.
pub fn parse_catalog(body: &[u8]) -> Result<Vec<CatalogEntry>, CatalogError> {
    serde_json::from_slice(body).map_err(|err| CatalogError::Shape(err.to_string()))
}

/// Case-insensitive substring match on titles; a blank fragment matches nothing.
pub fn autofill_matches(entries: &[CatalogEntry], fragment: &str) -> Vec<CatalogEntry> {
    let needle = fragment.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    entries
        .iter()
        .filter(|entry| entry.title.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    MergeCategories,
    Autofill,
    #[default]
    Both,
}

impl SyncMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "merge" | "categories" => Some(SyncMode::MergeCategories),
            "autofill" => Some(SyncMode::Autofill),
            "both" => Some(SyncMode::Both),
            _ => None,
        }
    }

    fn merges(self) -> bool {
        matches!(self, SyncMode::MergeCategories | SyncMode::Both)
    }

    fn buffers(self) -> bool {
        matches!(self, SyncMode::Autofill | SyncMode::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Online {
        entries: usize,
        added_categories: usize,
        at: String,
    },
    Offline {
        reason: String,
        at: String,
    },
    /// The catalog answered but its categories could not be stored locally.
    StoreFailed {
        reason: String,
        at: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Another fetch was still in flight.
    Skipped,
    Applied {
        entries: usize,
        added_categories: usize,
    },
    Failed,
}

/// What the rest of the app sees of the catalog: autofill buffer and status.
#[derive(Debug, Default)]
pub struct CatalogState {
    suggestions: RwLock<Vec<CatalogEntry>>,
    status: RwLock<SyncStatus>,
}

impl CatalogState {
    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    pub async fn suggest(&self, fragment: &str) -> Vec<CatalogEntry> {
        autofill_matches(&self.suggestions.read().await, fragment)
    }

    #[cfg(test)]
    async fn buffered(&self) -> usize {
        self.suggestions.read().await.len()
    }

    async fn set_status(&self, status: SyncStatus) {
        *self.status.write().await = status;
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CatalogSync<S> {
    source: S,
    store: StoreHandle,
    state: Arc<CatalogState>,
    mode: SyncMode,
    in_flight: AtomicBool,
}

impl<S: CatalogSource> CatalogSync<S> {
    pub fn new(source: S, store: StoreHandle, state: Arc<CatalogState>, mode: SyncMode) -> Self {
        Self {
            source,
            store,
            state,
            mode,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> &Arc<CatalogState> {
        &self.state
    }

    /// Fetches once and applies the result. Failures stay inside: state is left untouched.
    pub async fn sync_once(&self) -> SyncOutcome {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("catalog fetch already in flight");
            return SyncOutcome::Skipped;
        }
        let _guard = InFlight(&self.in_flight);

        self.state.set_status(SyncStatus::Syncing).await;
        let entries = match self.source.fetch().await {
            Ok(entries) => entries,
            Err(err) => {
                warn!("catalog sync failed: {err}");
                self.offline(err.to_string()).await;
                return SyncOutcome::Failed;
            }
        };

        let mut added_categories = 0;
        if self.mode.merges() {
            let categories = self
                .store
                .load(StoreKey::Categories)
                .await
                .unwrap_or_else(default_categories);
            let mut inventory = Inventory {
                products: Vec::new(),
                categories,
            };
            added_categories =
                inventory.merge_categories(entries.iter().map(|entry| entry.category.as_str()));
            if added_categories > 0 {
                if let Err(err) = self.store.save(StoreKey::Categories, &inventory.categories).await {
                    warn!("catalog categories not stored: {err}");
                    self.state
                        .set_status(SyncStatus::StoreFailed {
                            reason: err.to_string(),
                            at: Local::now().to_rfc3339(),
                        })
                        .await;
                    return SyncOutcome::Failed;
                }
                info!(added_categories, "merged catalog categories");
            }
        }

        let count = entries.len();
        if self.mode.buffers() {
            *self.state.suggestions.write().await = entries;
        }
        self.state
            .set_status(SyncStatus::Online {
                entries: count,
                added_categories,
                at: Local::now().to_rfc3339(),
            })
            .await;
        SyncOutcome::Applied {
            entries: count,
            added_categories,
        }
    }

    async fn offline(&self, reason: String) {
        self.state
            .set_status(SyncStatus::Offline {
                reason,
                at: Local::now().to_rfc3339(),
            })
            .await;
    }

    /// Syncs now, then every `every` until cancelled. A tick that comes due while a
    /// fetch is running is dropped rather than queued.
    pub fn spawn(self: Arc<Self>, every: Duration) -> SyncTask {
        let (shutdown, mut stop) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut timer = interval(every);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stop.changed() => break,
                    _ = timer.tick() => {
                        tokio::select! {
                            _ = stop.changed() => break,
                            outcome = self.sync_once() => debug!(?outcome, "catalog sync tick"),
                        }
                    }
                }
            }
            debug!("catalog sync stopped");
        });
        SyncTask { shutdown, handle }
    }
}

/// Handle on the periodic sync loop.
pub struct SyncTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SyncTask {
    /// Stops the loop, abandoning a fetch that is still in flight.
    pub async fn cancel(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.handle.await {
            warn!("catalog sync task ended abnormally: {err}");
        }
    }
}
