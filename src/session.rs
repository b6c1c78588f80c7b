use crate::errors::StoreError;
use crate::inventory::{Inventory, Upsert};
use crate::models::{
    CatalogEntry, CategoryList, Dashboard, Product, ProductDetail, ProductForm, ProductId,
    ProductRow,
};
use crate::nav::{Navigator, Transition, View};
use crate::stats::{ChartScale, build_dashboard};
use crate::storage::{ExternalChanges, StoreHandle, StoreKey};
use crate::view::{self, BARS_CANVAS, ChartBoard, DISTRIBUTION_CANVAS, ListQuery};
use chrono::Local;
use tracing::{debug, info};

/// One execution context (a browser tab): its own copy of the inventory, the
/// active view and the charts last drawn from it.
pub struct Session {
    store: StoreHandle,
    changes: ExternalChanges,
    inventory: Inventory,
    navigator: Navigator,
    charts: ChartBoard,
    scale: ChartScale,
    dashboard: Dashboard,
}

impl Session {
    pub async fn open(store: StoreHandle, scale: ChartScale) -> Self {
        let changes = store.subscribe();
        let inventory = Inventory::from(store.load_snapshot().await);
        let dashboard = build_dashboard(&inventory.products, scale);
        let mut session = Self {
            store,
            changes,
            inventory,
            navigator: Navigator::default(),
            charts: ChartBoard::default(),
            scale,
            dashboard,
        };
        session.render_dashboard();
        session
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn charts(&self) -> &ChartBoard {
        &self.charts
    }

    pub fn active_view(&self) -> View {
        self.navigator.active()
    }

    /// Reloads both collections from the store and redraws the dashboard.
    pub async fn refresh(&mut self) {
        self.inventory = self.store.load_snapshot().await.into();
        self.render_dashboard();
    }

    /// Refreshes if another context wrote since the last call.
    pub async fn sync_external(&mut self) -> bool {
        let keys = self.changes.drain();
        if keys.is_empty() {
            return false;
        }
        debug!(?keys, "store changed elsewhere");
        self.refresh().await;
        true
    }

    fn render_dashboard(&mut self) {
        self.dashboard = build_dashboard(&self.inventory.products, self.scale);
        self.charts
            .draw(DISTRIBUTION_CANVAS, self.dashboard.distribution.clone());
        self.charts.draw(BARS_CANVAS, self.dashboard.bars.clone());
    }

    /// Persists one collection, then refreshes whether or not the write succeeded.
    async fn write_through(&mut self, key: StoreKey) -> Result<(), StoreError> {
        let result = match key {
            StoreKey::Products => self.store.save(key, &self.inventory.products).await,
            StoreKey::Categories => self.store.save(key, &self.inventory.categories).await,
        };
        self.refresh().await;
        result
    }

    pub async fn save_product(&mut self, form: &ProductForm) -> Result<Upsert, StoreError> {
        let outcome = self
            .inventory
            .upsert_product(form, Local::now().timestamp_millis());
        debug!(?outcome, "product saved");
        self.write_through(StoreKey::Products).await?;
        Ok(outcome)
    }

    /// Removes the product once `confirm` agrees. Unknown ids and refusals change nothing.
    pub async fn delete_product(
        &mut self,
        id: ProductId,
        confirm: impl FnOnce(&Product) -> bool,
    ) -> Result<Option<Product>, StoreError> {
        let Some(product) = self.inventory.product(id) else {
            return Ok(None);
        };
        if !confirm(product) {
            return Ok(None);
        }
        let removed = self.inventory.remove_product(id);
        info!(%id, "product deleted");
        self.write_through(StoreKey::Products).await?;
        Ok(removed)
    }

    pub async fn add_category(&mut self, name: &str) -> Result<bool, StoreError> {
        if !self.inventory.add_category(name) {
            return Ok(false);
        }
        self.write_through(StoreKey::Categories).await?;
        Ok(true)
    }

    /// Products keep their label when their category is deleted.
    pub async fn delete_category(
        &mut self,
        index: usize,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<Option<String>, StoreError> {
        let Some(label) = self.inventory.categories.get(index) else {
            return Ok(None);
        };
        if !confirm(label) {
            return Ok(None);
        }
        let removed = self.inventory.remove_category_at(index);
        info!(index, ?removed, "category deleted");
        self.write_through(StoreKey::Categories).await?;
        Ok(removed)
    }

    /// Prefilled form for `id`; switches to the products view.
    pub fn edit_product(&mut self, id: ProductId) -> Option<ProductForm> {
        let form = ProductForm::from(self.inventory.product(id)?);
        self.navigate(View::Products);
        Some(form)
    }

    pub fn product_detail(&self, id: ProductId) -> Option<ProductDetail> {
        view::product_detail(&self.inventory, id)
    }

    /// Draft for a chosen catalog entry. A category not known yet is added and stored.
    pub async fn apply_suggestion(&mut self, entry: &CatalogEntry) -> Result<ProductForm, StoreError> {
        let category = entry.category.trim().to_string();
        if self.inventory.add_category(&category) {
            self.write_through(StoreKey::Categories).await?;
        }
        Ok(ProductForm {
            id: None,
            name: entry.title.clone(),
            price: entry.price.to_string(),
            qty: String::new(),
            category,
        })
    }

    pub fn navigate(&mut self, view: View) -> Transition {
        let transition = self.navigator.show(view);
        if transition.recompute_dashboard {
            self.render_dashboard();
        }
        transition
    }

    pub fn product_rows(&self, query: &ListQuery) -> Vec<ProductRow> {
        view::product_rows(&self.inventory.products, query)
    }

    pub fn category_list(&self) -> CategoryList {
        view::category_list(&self.inventory)
    }
}
