use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/view", get(handlers::get_view))
        .route("/api/products", post(handlers::save_product))
        .route(
            "/api/products/:id",
            get(handlers::product_detail).delete(handlers::delete_product),
        )
        .route("/api/products/:id/edit", get(handlers::edit_product))
        .route("/api/categories", post(handlers::add_category))
        .route("/api/categories/:index", delete(handlers::delete_category))
        .route("/api/navigate", post(handlers::navigate))
        .route("/api/catalog/suggest", get(handlers::suggest))
        .route("/api/catalog/select", post(handlers::select_suggestion))
        .route("/api/catalog/status", get(handlers::catalog_status))
        .route("/api/catalog/sync", post(handlers::sync_catalog))
        .with_state(state)
}
