//! Response cache middleware.
//!
//! Serves repeated GETs of the listing route from [`ResponseStore`] for the
//! configured window, independently of the aggregate cache underneath.

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header::CONTENT_LENGTH},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::BytesMut;
use futures::{StreamExt, stream};
use metrics::counter;
use tracing::{debug, instrument, warn};

use super::{
    CacheConfig,
    keys::L1Key,
    store::{CachedResponse, ResponseStore},
};

pub(crate) const METRIC_RESPONSE_HIT_TOTAL: &str = "properties_cache_response_hit_total";
pub(crate) const METRIC_RESPONSE_MISS_TOTAL: &str = "properties_cache_response_miss_total";

const X_CACHE: &str = "x-cache";

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub responses: Arc<ResponseStore>,
}

impl CacheState {
    pub fn new(config: CacheConfig) -> Self {
        let responses = Arc::new(ResponseStore::new(&config));
        Self { config, responses }
    }
}

/// Middleware for response caching.
///
/// Only GET requests answered with 200 OK are stored. Bodies larger than the
/// configured limit are passed through untouched, including streamed bodies
/// whose length is only discovered while reading.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enable_response_cache || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = L1Key::response(request.uri().path(), request.uri().query().unwrap_or(""));

    if let Some(cached) = cache.responses.get(&key) {
        counter!(METRIC_RESPONSE_HIT_TOTAL).increment(1);
        debug!(cache = "response", outcome = "hit", "serving cached response");
        return build_response(cached, "HIT");
    }

    counter!(METRIC_RESPONSE_MISS_TOTAL).increment(1);
    debug!(
        cache = "response",
        outcome = "miss",
        "cache miss, executing handler"
    );

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let limit = cache.config.response_body_limit_bytes;
    if declared_length(&response).is_some_and(|length| length > limit) {
        debug!(cache = "response", limit, "body over limit, not caching");
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let mut remaining = body.into_data_stream();
    let mut chunks = Vec::new();
    let mut collected = 0usize;
    while let Some(chunk) = remaining.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                warn!(cache = "response", error = %err, "failed to collect response body");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        collected += chunk.len();
        chunks.push(chunk);

        if collected > limit {
            debug!(cache = "response", limit, "streamed body over limit, not caching");
            let replay =
                stream::iter(chunks.into_iter().map(Ok::<_, axum::Error>)).chain(remaining);
            return Response::from_parts(parts, Body::from_stream(replay));
        }
    }

    let mut buffer = BytesMut::with_capacity(collected);
    for chunk in chunks {
        buffer.extend_from_slice(&chunk);
    }
    let bytes = buffer.freeze();

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };
    if let Some(evicted) = cache.responses.set(key, cached) {
        debug!(cache = "response", evicted = ?evicted, "evicted cached response");
    }

    parts
        .headers
        .insert(X_CACHE, HeaderValue::from_static("MISS"));
    Response::from_parts(parts, Body::from(bytes))
}

/// Body length from `Content-Length`, or from the body's own size hint.
fn declared_length(response: &Response) -> Option<usize> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .or_else(|| {
            let hint = response.body().size_hint();
            hint.upper()
                .filter(|upper| *upper == hint.lower())
                .and_then(|exact| usize::try_from(exact).ok())
        })
}

/// Build a response from cached data.
fn build_response(cached: CachedResponse, outcome: &'static str) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .header(X_CACHE, outcome)
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{Router, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn counting_router(config: CacheConfig, calls: Arc<AtomicUsize>) -> Router {
        let state = CacheState::new(config);
        Router::new()
            .route(
                "/properties/",
                get(move || {
                    let calls = calls.clone();
                    async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        format!("{{\"call\":{n}}}")
                    }
                })
                .post(|| async { StatusCode::CREATED }),
            )
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .layer(middleware::from_fn_with_state(state, response_cache_layer))
    }

    async fn send(router: &Router, method: Method, uri: &str) -> Response {
        router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response")
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    #[tokio::test]
    async fn second_get_is_served_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = counting_router(CacheConfig::default(), calls.clone());

        let first = send(&router, Method::GET, "/properties/").await;
        assert_eq!(first.headers()[X_CACHE], "MISS");
        assert_eq!(body_text(first).await, "{\"call\":0}");

        let second = send(&router, Method::GET, "/properties/").await;
        assert_eq!(second.headers()[X_CACHE], "HIT");
        assert_eq!(body_text(second).await, "{\"call\":0}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn query_strings_are_cached_separately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = counting_router(CacheConfig::default(), calls.clone());

        send(&router, Method::GET, "/properties/").await;
        send(&router, Method::GET, "/properties/?page=2").await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_get_and_non_ok_pass_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = counting_router(CacheConfig::default(), calls);

        let created = send(&router, Method::POST, "/properties/").await;
        assert_eq!(created.status(), StatusCode::CREATED);
        assert!(created.headers().get(X_CACHE).is_none());

        send(&router, Method::GET, "/missing").await;
        let missing = send(&router, Method::GET, "/missing").await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert!(missing.headers().get(X_CACHE).is_none());
    }

    #[tokio::test]
    async fn disabled_cache_always_runs_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = CacheConfig {
            enable_response_cache: false,
            ..Default::default()
        };
        let router = counting_router(config, calls.clone());

        send(&router, Method::GET, "/properties/").await;
        send(&router, Method::GET, "/properties/").await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn oversized_bodies_are_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = CacheConfig {
            response_body_limit_bytes: 4,
            ..Default::default()
        };
        let router = counting_router(config, calls.clone());

        let first = send(&router, Method::GET, "/properties/").await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(body_text(first).await, "{\"call\":0}");
        send(&router, Method::GET, "/properties/").await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn oversized_streamed_bodies_pass_through_uncached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = CacheConfig {
            response_body_limit_bytes: 4,
            ..Default::default()
        };
        let state = CacheState::new(config);
        let router = Router::new()
            .route(
                "/properties/",
                get({
                    let calls = calls.clone();
                    move || {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            let chunks: [Result<&'static [u8], std::io::Error>; 2] =
                                [Ok(b"{\"pro"), Ok(b"perties\":[]}")];
                            Body::from_stream(futures::stream::iter(chunks))
                        }
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(state.clone(), response_cache_layer));

        let first = send(&router, Method::GET, "/properties/").await;
        assert_eq!(first.status(), StatusCode::OK);
        assert!(first.headers().get(X_CACHE).is_none());
        assert_eq!(body_text(first).await, "{\"properties\":[]}");

        let second = send(&router, Method::GET, "/properties/").await;
        assert_eq!(body_text(second).await, "{\"properties\":[]}");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(state.responses.is_empty());
    }
}
