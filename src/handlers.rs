use crate::catalog::{SyncOutcome, SyncStatus};
use crate::errors::AppError;
use crate::models::{
    ActionResponse, CatalogEntry, CategoryRequest, ConfirmQuery, EditResponse, ProductDetail,
    ProductForm, ProductId, SuggestQuery, TabQuery, ViewQuery, ViewResponse,
};
use crate::nav::View;
use crate::session::Session;
use crate::state::{AppState, tab_id};
use crate::stats::build_dashboard;
use crate::ui::render_index;
use crate::view::ListQuery;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::Html,
};
use serde::Serialize;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.reader.load_snapshot().await;
    let dashboard = build_dashboard(&snapshot.products, state.chart_scale);
    Html(render_index(&dashboard))
}

pub async fn get_view(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Json<ViewResponse> {
    let tab = tab_id(query.tab.as_deref());
    let list = ListQuery {
        filter: query.filter,
        sort_by_name: query.sort,
    };
    let mut sessions = state.sessions.lock().await;
    let session = state.session(&mut sessions, &tab).await;
    Json(build_view(&state, session, tab, &list).await)
}

pub async fn save_product(
    State(state): State<AppState>,
    Query(query): Query<TabQuery>,
    Json(form): Json<ProductForm>,
) -> Result<Json<ActionResponse>, AppError> {
    let tab = tab_id(query.tab.as_deref());
    let mut sessions = state.sessions.lock().await;
    let session = state.session(&mut sessions, &tab).await;
    session.save_product(&form).await?;
    Ok(Json(action(&state, session, tab, true).await))
}

pub async fn product_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<TabQuery>,
) -> Result<Json<ProductDetail>, AppError> {
    let tab = tab_id(query.tab.as_deref());
    let id = ProductId(id);
    let mut sessions = state.sessions.lock().await;
    let session = state.session(&mut sessions, &tab).await;
    let detail = session
        .product_detail(id)
        .ok_or_else(|| AppError::not_found(format!("no product {id}")))?;
    session.navigate(View::ProductDetail { id });
    Ok(Json(detail))
}

pub async fn edit_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<TabQuery>,
) -> Result<Json<EditResponse>, AppError> {
    let tab = tab_id(query.tab.as_deref());
    let id = ProductId(id);
    let mut sessions = state.sessions.lock().await;
    let session = state.session(&mut sessions, &tab).await;
    let form = session
        .edit_product(id)
        .ok_or_else(|| AppError::not_found(format!("no product {id}")))?;
    let view = build_view(&state, session, tab, &ListQuery::default()).await;
    Ok(Json(EditResponse { form, view }))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<ConfirmQuery>,
) -> Result<Json<ActionResponse>, AppError> {
    let tab = tab_id(query.tab.as_deref());
    let mut sessions = state.sessions.lock().await;
    let session = state.session(&mut sessions, &tab).await;
    let removed = session
        .delete_product(ProductId(id), |_| query.confirmed)
        .await?;
    Ok(Json(action(&state, session, tab, removed.is_some()).await))
}

pub async fn add_category(
    State(state): State<AppState>,
    Query(query): Query<TabQuery>,
    Json(payload): Json<CategoryRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let tab = tab_id(query.tab.as_deref());
    let mut sessions = state.sessions.lock().await;
    let session = state.session(&mut sessions, &tab).await;
    let added = session.add_category(&payload.name).await?;
    Ok(Json(action(&state, session, tab, added).await))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Query(query): Query<ConfirmQuery>,
) -> Result<Json<ActionResponse>, AppError> {
    let tab = tab_id(query.tab.as_deref());
    let mut sessions = state.sessions.lock().await;
    let session = state.session(&mut sessions, &tab).await;
    let removed = session.delete_category(index, |_| query.confirmed).await?;
    Ok(Json(action(&state, session, tab, removed.is_some()).await))
}

pub async fn navigate(
    State(state): State<AppState>,
    Query(query): Query<TabQuery>,
    Json(view): Json<View>,
) -> Result<Json<ViewResponse>, AppError> {
    let tab = tab_id(query.tab.as_deref());
    let mut sessions = state.sessions.lock().await;
    let session = state.session(&mut sessions, &tab).await;
    if let View::ProductDetail { id } = view {
        if session.inventory().product(id).is_none() {
            return Err(AppError::not_found(format!("no product {id}")));
        }
    }
    session.navigate(view);
    Ok(Json(build_view(&state, session, tab, &ListQuery::default()).await))
}

pub async fn suggest(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> Json<Vec<CatalogEntry>> {
    Json(state.catalog.state().suggest(&query.q).await)
}

pub async fn select_suggestion(
    State(state): State<AppState>,
    Query(query): Query<TabQuery>,
    Json(entry): Json<CatalogEntry>,
) -> Result<Json<EditResponse>, AppError> {
    let tab = tab_id(query.tab.as_deref());
    let mut sessions = state.sessions.lock().await;
    let session = state.session(&mut sessions, &tab).await;
    let form = session.apply_suggestion(&entry).await?;
    let view = build_view(&state, session, tab, &ListQuery::default()).await;
    Ok(Json(EditResponse { form, view }))
}

pub async fn catalog_status(State(state): State<AppState>) -> Json<SyncStatus> {
    Json(state.catalog.state().status().await)
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub outcome: SyncOutcome,
    pub status: SyncStatus,
}

pub async fn sync_catalog(State(state): State<AppState>) -> Json<SyncResponse> {
    let outcome = state.catalog.sync_once().await;
    let status = state.catalog.state().status().await;
    Json(SyncResponse { outcome, status })
}

async fn action(state: &AppState, session: &Session, tab: String, applied: bool) -> ActionResponse {
    ActionResponse {
        applied,
        view: build_view(state, session, tab, &ListQuery::default()).await,
    }
}

async fn build_view(state: &AppState, session: &Session, tab: String, list: &ListQuery) -> ViewResponse {
    ViewResponse {
        tab,
        active: session.active_view(),
        dashboard: session.dashboard().clone(),
        charts: session.charts().frames(),
        products: session.product_rows(list),
        categories: session.category_list(),
        catalog: state.catalog.state().status().await,
    }
}
