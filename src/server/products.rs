use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::cache::{WRITE_LOCK_TTL, write_lock_key};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{DeleteBulkRequest, ListProductsParams, ProductPayload};
use crate::server::response::{
    ApiError, ApiResponse, HandlerError, PaginatedResponse, StoreOptionExt, StoreResultExt,
    ValidationError,
};
use crate::server::validation::{
    validate_bulk_ids, validate_category_filter, validate_product_payload,
};
use crate::service::Cursor;

const BUSY_MESSAGE: &str = "Please wait, your request is being processed.";

pub async fn store_product(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProductPayload>,
) -> impl IntoResponse {
    let draft = validate_product_payload(state.store.as_ref(), &payload)?;

    // One in-flight write per user; contention is retryable, not an error.
    // The guard is released on every exit path, after the transaction inside
    // the store call has committed or rolled back.
    let _guard = state
        .locks
        .acquire(&write_lock_key(auth.user.id), WRITE_LOCK_TTL)
        .ok_or_else(|| ApiError::too_many_requests(BUSY_MESSAGE))?;

    let product = state
        .products
        .store(&draft)
        .api_err("Failed to store product")?;

    Ok::<_, HandlerError>((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

pub async fn list_products(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListProductsParams>,
) -> impl IntoResponse {
    validate_category_filter(state.store.as_ref(), params.category.as_deref())?;

    let cursor = match &params.cursor {
        Some(token) => Some(
            Cursor::decode(token)
                .ok_or_else(|| ValidationError::single("cursor", "The cursor is invalid."))?,
        ),
        None => None,
    };

    let page = state
        .products
        .get_page(params.category.as_deref(), cursor)
        .api_err("Failed to list products")?;

    Ok::<_, HandlerError>(Json(PaginatedResponse::new(
        page.items,
        page.next_cursor,
        page.prev_cursor,
    )))
}

pub async fn get_product(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let product = state
        .products
        .get(id)
        .api_err("Failed to get product")?
        .or_not_found("Product not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(product)))
}

pub async fn update_product(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<ProductPayload>,
) -> impl IntoResponse {
    let draft = validate_product_payload(state.store.as_ref(), &payload)?;

    let _guard = state
        .locks
        .acquire(&write_lock_key(auth.user.id), WRITE_LOCK_TTL)
        .ok_or_else(|| ApiError::too_many_requests(BUSY_MESSAGE))?;

    let product = match state.products.update(id, &draft) {
        Ok(product) => product,
        Err(Error::NotFound) => return Err(ApiError::not_found("Product not found").into()),
        Err(e) => {
            tracing::error!("Failed to update product: {e}");
            return Err(ApiError::internal("Failed to update product").into());
        }
    };

    Ok::<_, HandlerError>(Json(ApiResponse::success(product)))
}

pub async fn delete_product(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    // Idempotent: deleting an absent or already-deleted product is a no-op
    state
        .products
        .delete(id)
        .api_err("Failed to delete product")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn delete_bulk(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteBulkRequest>,
) -> impl IntoResponse {
    validate_bulk_ids(state.store.as_ref(), &req.ids)?;

    state
        .products
        .delete_bulk(&req.ids)
        .api_err("Failed to delete products")?;

    Ok::<_, HandlerError>(StatusCode::NO_CONTENT)
}
