use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

pub async fn list_categories(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let categories = state
        .categories
        .get_all()
        .api_err("Failed to list categories")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(categories)))
}
