use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::header::CACHE_CONTROL,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

use crate::{
    application::properties::PropertyStore,
    cache::{CacheState, MetricsReporter, PropertyReader, response_cache_layer},
    domain::entities::PropertyRecord,
};

use super::{
    api::{build_api_router, error::ApiError},
    db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub reader: Arc<PropertyReader>,
    pub reporter: Arc<MetricsReporter>,
    pub store: Arc<PropertyStore>,
    pub cache: Option<CacheState>,
}

pub fn build_router(state: HttpState) -> Router {
    let cached_routes = Router::new().route("/properties/", get(list_properties));

    let cached_routes = if let Some(cache_state) = state.cache.clone() {
        cached_routes.layer(middleware::from_fn_with_state(
            cache_state,
            response_cache_layer,
        ))
    } else {
        cached_routes
    };

    let uncached_routes = Router::new()
        .route("/properties/cache-metrics", get(cache_metrics))
        .route("/_health/db", get(public_health));

    cached_routes
        .merge(uncached_routes)
        .merge(build_api_router())
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// Listing entry: the four public fields of a record, nothing else.
#[derive(Debug, Serialize)]
struct PropertySummary<'a> {
    title: &'a str,
    description: &'a str,
    price: &'a str,
    location: &'a str,
}

impl<'a> From<&'a PropertyRecord> for PropertySummary<'a> {
    fn from(record: &'a PropertyRecord) -> Self {
        Self {
            title: &record.title,
            description: &record.description,
            price: &record.price,
            location: &record.location,
        }
    }
}

#[derive(Debug, Serialize)]
struct PropertyListing<'a> {
    properties: Vec<PropertySummary<'a>>,
}

async fn list_properties(State(state): State<HttpState>) -> Result<Response, ApiError> {
    let records = state.reader.get_all_records().await?;
    let listing = PropertyListing {
        properties: records.iter().map(PropertySummary::from).collect(),
    };
    Ok(Json(listing).into_response())
}

async fn cache_metrics(State(state): State<HttpState>) -> Result<Response, ApiError> {
    let metrics = state.reporter.get_cache_metrics().await?;
    Ok(([(CACHE_CONTROL, "no-store")], Json(metrics)).into_response())
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.store.health_check().await)
}
