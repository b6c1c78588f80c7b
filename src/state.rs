use crate::catalog::{CatalogSync, HttpCatalog};
use crate::session::Session;
use crate::stats::ChartScale;
use crate::storage::{Store, StoreHandle};
use chrono::{DateTime, Duration, Local};
use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

const DEFAULT_TAB: &str = "default";
const MAX_TAB_LEN: usize = 64;

pub struct TabSession {
    pub session: Session,
    pub last_seen: DateTime<Local>,
}

pub type Sessions = HashMap<String, TabSession>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub reader: StoreHandle,
    pub catalog: Arc<CatalogSync<HttpCatalog>>,
    pub sessions: Arc<Mutex<Sessions>>,
    pub chart_scale: ChartScale,
}

impl AppState {
    pub fn new(store: Arc<Store>, catalog: Arc<CatalogSync<HttpCatalog>>, chart_scale: ChartScale) -> Self {
        Self {
            reader: store.context(),
            store,
            catalog,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            chart_scale,
        }
    }

    /// The tab's session, opened on first use and caught up with writes from other tabs.
    pub async fn session<'a>(&self, sessions: &'a mut Sessions, tab: &str) -> &'a mut Session {
        let now = Local::now();
        if !sessions.contains_key(tab) {
            evict_idle(sessions, now);
        }

        let slot = match sessions.entry(tab.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                info!(tab, "tab session opened");
                let session = Session::open(self.store.context(), self.chart_scale).await;
                entry.insert(TabSession {
                    session,
                    last_seen: now,
                })
            }
        };
        slot.last_seen = now;
        slot.session.sync_external().await;
        &mut slot.session
    }
}

fn session_idle() -> Duration {
    Duration::minutes(30)
}

/// Drops sessions not seen for longer than the idle limit.
fn evict_idle(sessions: &mut Sessions, now: DateTime<Local>) {
    let before = sessions.len();
    sessions.retain(|_, slot| now - slot.last_seen < session_idle());
    if sessions.len() < before {
        debug!(evicted = before - sessions.len(), "idle tab sessions dropped");
    }
}

/// Tab ids come from the page; anything odd lands on the shared default tab.
pub fn tab_id(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(tab)
            if !tab.is_empty()
                && tab.len() <= MAX_TAB_LEN
                && tab.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
        {
            tab.to_string()
        }
        _ => DEFAULT_TAB.to_string(),
    }
}
