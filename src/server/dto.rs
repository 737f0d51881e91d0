use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Create/update payload. Fields arrive as loose JSON values so validation
/// can report per-field errors instead of a serde type error for the body.
#[derive(Debug, Default, Deserialize)]
pub struct ProductPayload {
    #[serde(default)]
    pub name: Option<serde_json::Value>,
    #[serde(default)]
    pub category_id: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<serde_json::Value>,
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    #[serde(default)]
    pub stock: Option<serde_json::Value>,
    #[serde(default)]
    pub enabled: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListProductsParams {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteBulkRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
}
