use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{get, post},
};

use super::{auth, categories, export, products};
use crate::cache::{CacheStore, LockManager};
use crate::service::{CategoryService, ProductService};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub locks: LockManager,
    pub products: ProductService,
    pub categories: CategoryService,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            locks: LockManager::new(Arc::clone(&cache)),
            products: ProductService::new(Arc::clone(&store)),
            categories: CategoryService::new(Arc::clone(&store), cache),
            store,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/login", post(auth::login))
        .route(
            "/api/product",
            post(products::store_product).get(products::list_products),
        )
        .route("/api/product/delete-bulk", post(products::delete_bulk))
        .route("/api/product/download/report", get(export::download_report))
        .route(
            "/api/product/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/api/category", get(categories::list_categories))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
