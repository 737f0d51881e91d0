use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::TokenGenerator;
use crate::server::AppState;
use crate::server::dto::{LoginRequest, LoginResponse};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::types::Token;

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let generator = TokenGenerator::new();

    // Same response for unknown email and wrong password
    let user = store
        .get_user_by_email(&req.email)
        .api_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials."))?;

    let verified = generator
        .verify(&req.password, &user.password_hash)
        .api_err("Failed to verify credentials")?;
    if !verified {
        return Err(ApiError::unauthorized("Invalid credentials."));
    }

    let (raw_token, lookup, hash) = generator.generate().api_err("Failed to issue token")?;
    let token = Token {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        user_id: user.id,
        created_at: Utc::now(),
        expires_at: None,
        last_used_at: None,
    };
    store.create_token(&token).api_err("Failed to issue token")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(LoginResponse { token: raw_token })))
}
