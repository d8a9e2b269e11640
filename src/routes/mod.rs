//! Route table for the client resource.

pub mod clients;
pub mod extract;

use std::sync::Arc;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::PagingConfig;
use crate::db::ClientStore;
use crate::error::ApiError;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ClientStore>,
    pub paging: PagingConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn ClientStore>, paging: PagingConfig) -> Self {
        Self { store, paging }
    }
}

/// Build the router. Collection paths answer with and without a trailing slash.
pub fn create_router(state: AppState) -> Router {
    let collection = get(clients::list_clients).post(clients::create_client);

    Router::new()
        .route("/clients", collection.clone())
        .route("/clients/", collection)
        .route(
            "/clients/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route("/clients/incomeGreaterThan", get(clients::income_greater_than))
        .route("/clients/incomeGreaterThan/", get(clients::income_greater_than))
        .route("/clients/income", get(clients::income_equals))
        .route("/clients/income/", get(clients::income_equals))
        .route("/clients/cpf", get(clients::find_by_cpf))
        .route("/clients/cpf/", get(clients::find_by_cpf))
        .route("/clients/cpfLike", get(clients::cpf_like))
        .route("/clients/cpfLike/", get(clients::cpf_like))
        .fallback(route_not_found)
        .layer(middleware::from_fn(attach_error_path))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found(request: Request) -> ApiError {
    ApiError::not_found(format!("No route for {} {}", request.method(), request.uri().path()))
}

/// Re-render error bodies with the path of the request that failed.
async fn attach_error_path(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    let failure = response.extensions().get::<ApiError>().cloned();
    match failure {
        Some(err) => err.into_response_at(&path),
        None => response,
    }
}
