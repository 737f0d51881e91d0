use std::sync::Arc;

use axum::{
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::response::{ApiError, StoreResultExt};

/// Streams the active product set as a CSV download:
/// id, name, price, creation date.
pub async fn download_report(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let rows = state
        .products
        .export_rows()
        .api_err("Failed to export products")?;

    let mut csv = String::from("ID,Name,Price,Created At\n");
    for row in rows {
        csv.push_str(&format!(
            "{},{},{},{}\n",
            row.id,
            csv_field(&row.name),
            row.price,
            row.created_at.format("%Y-%m-%d"),
        ));
    }

    let filename = format!("products_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));

    Ok::<_, ApiError>((
        [
            (CONTENT_TYPE, "text/csv".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    ))
}

/// Quotes a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
