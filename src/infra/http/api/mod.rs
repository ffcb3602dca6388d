pub mod error;
pub mod handlers;

use axum::{
    Router,
    routing::{get, post},
};

use crate::infra::http::HttpState;

/// Write routes. They run outside the response cache; invalidation of the
/// aggregate entry happens inside the store before each handler returns.
pub fn build_api_router() -> Router<HttpState> {
    Router::new()
        .route("/properties/", post(handlers::create_property))
        .route(
            "/properties/{id}",
            get(handlers::get_property)
                .put(handlers::update_property)
                .delete(handlers::delete_property),
        )
}
