//! Catalog HTTP Routes
//!
//! Paginated catalogs, parcel detail, classification, statistics and CSV
//! export over any store implementation.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::TryStreamExt;
use tracing::error;

use super::errors::{ApiError, ApiResult};
use crate::config::CatalogConfig;
use crate::exclusion::{ExclusionResolver, ExclusionSummary};
use crate::export::export_csv;
use crate::model::{AddressPointRecord, ParcelRecord, Record};
use crate::query::{
    CatalogExecutor, CohortCounts, FilterOptions, Page, PageRequest, ParcelDetail, SortSpec,
};
use crate::spatial::{ParcelClassification, SpatialClassifier};
use crate::store::{ExclusionStore, SpatialStore};

// ==================
// Shared State
// ==================

/// Every capability the routes need from a store
pub trait CatalogBackend: SpatialStore + ExclusionStore + 'static {}

impl<T: SpatialStore + ExclusionStore + 'static> CatalogBackend for T {}

/// Catalog state shared across handlers
pub struct CatalogState<S: CatalogBackend> {
    pub store: S,
    pub settings: CatalogConfig,
}

impl<S: CatalogBackend> CatalogState<S> {
    pub fn new(store: S, settings: CatalogConfig) -> Self {
        Self { store, settings }
    }
}

type SharedState<S> = Arc<CatalogState<S>>;

/// Create catalog routes
pub fn catalog_routes<S: CatalogBackend>(state: SharedState<S>) -> Router {
    Router::new()
        .route("/cohort-counts", get(cohort_counts_handler::<S>))
        .route("/non-land-reasons", get(non_land_reasons_handler::<S>))
        .route("/parcels", get(list_parcels_handler::<S>))
        .route("/parcels/:id", get(parcel_detail_handler::<S>))
        .route("/parcels/:id/uprns", get(parcel_uprns_handler::<S>))
        .route("/uprns", get(list_uprns_handler::<S>))
        .route("/export/parcels.csv", get(export_parcels_handler::<S>))
        .route("/export/uprns.csv", get(export_uprns_handler::<S>))
        .with_state(state)
}

fn parse_parcel_id(raw: &str) -> ApiResult<i64> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::InvalidPathParam(format!("parcel id must be an integer, got '{}'", raw)))
}

async fn paginate<S: CatalogBackend, R: Record>(
    state: &CatalogState<S>,
    query: &HashMap<String, String>,
) -> ApiResult<Page<R>> {
    let param = |key: &str| query.get(key).map(String::as_str);

    let filters = FilterOptions::parse(query)?;
    let sort = SortSpec::resolve(R::CATALOG, param("sort_by"), param("sort_dir"));
    let request = PageRequest::normalize(
        param("page"),
        param("page_size"),
        state.settings.default_page_size,
        state.settings.max_page_size,
    );

    Ok(CatalogExecutor::new(&state.store)
        .paginate::<R>(&filters, sort, request)
        .await?)
}

fn csv_response<S: CatalogBackend, R: Record>(
    state: &CatalogState<S>,
    query: &HashMap<String, String>,
) -> ApiResult<Response> {
    let filters = FilterOptions::parse(query)?;
    let catalog = R::CATALOG;

    // An error item aborts the body mid-stream, so clients see a failed
    // transfer instead of a short file
    let chunks = export_csv::<S, R>(&state.store, &filters, state.settings.export_batch_size)
        .inspect_err(move |e| error!(catalog = catalog.name(), error = %e, "export aborted"));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.csv\"", catalog.name()),
            ),
        ],
        Body::from_stream(chunks),
    )
        .into_response())
}

// ==================
// Handlers
// ==================

async fn cohort_counts_handler<S: CatalogBackend>(
    State(state): State<SharedState<S>>,
) -> ApiResult<Json<CohortCounts>> {
    let counts = CatalogExecutor::new(&state.store).cohort_counts().await?;
    Ok(Json(counts))
}

async fn non_land_reasons_handler<S: CatalogBackend>(
    State(state): State<SharedState<S>>,
) -> ApiResult<Json<ExclusionSummary>> {
    let summary = ExclusionResolver::new(&state.store, state.settings.export_batch_size)
        .summarize()
        .await?;
    Ok(Json(summary))
}

async fn list_parcels_handler<S: CatalogBackend>(
    State(state): State<SharedState<S>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<Page<ParcelRecord>>> {
    Ok(Json(paginate::<S, ParcelRecord>(&state, &query).await?))
}

async fn list_uprns_handler<S: CatalogBackend>(
    State(state): State<SharedState<S>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<Page<AddressPointRecord>>> {
    Ok(Json(paginate::<S, AddressPointRecord>(&state, &query).await?))
}

async fn parcel_detail_handler<S: CatalogBackend>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ParcelDetail>> {
    let parcel_id = parse_parcel_id(&id)?;
    let detail = CatalogExecutor::new(&state.store)
        .parcel_detail(parcel_id)
        .await?;
    Ok(Json(detail))
}

async fn parcel_uprns_handler<S: CatalogBackend>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ParcelClassification>> {
    let parcel_id = parse_parcel_id(&id)?;
    let classification = SpatialClassifier::new(&state.store, state.settings.erosion_margin)
        .classify(parcel_id)
        .await?;
    Ok(Json(classification))
}

async fn export_parcels_handler<S: CatalogBackend>(
    State(state): State<SharedState<S>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    csv_response::<S, ParcelRecord>(&state, &query)
}

async fn export_uprns_handler<S: CatalogBackend>(
    State(state): State<SharedState<S>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    csv_response::<S, AddressPointRecord>(&state, &query)
}
