mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Product reads never return soft-deleted rows; product writes run inside a
/// single transaction per call.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, email: &str, password_hash: &str) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn delete_user_tokens(&self, user_id: i64) -> Result<usize>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Category operations
    fn upsert_category(&self, name: &str) -> Result<Category>;
    fn get_category(&self, id: i64) -> Result<Option<Category>>;
    fn get_category_by_name(&self, name: &str) -> Result<Option<Category>>;
    fn list_categories(&self) -> Result<Vec<Category>>;

    // Product operations
    /// Natural-key upsert: returns the active row matching every draft field
    /// if one exists, otherwise inserts a new row. One transaction.
    fn upsert_product(&self, draft: &ProductDraft) -> Result<Product>;
    fn get_product(&self, id: i64) -> Result<Option<Product>>;
    /// Keyset page ordered by id. `after`/`before` bound the page by row id;
    /// `before` walks backwards (results still come back ascending).
    fn list_products(
        &self,
        category: Option<&str>,
        after: Option<i64>,
        before: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Product>>;
    fn list_all_products(&self, category: Option<&str>) -> Result<Vec<Product>>;
    /// Full-field replace of an active row. `Error::NotFound` if no active
    /// row has this id. One transaction; bumps `updated_at`.
    fn update_product(&self, id: i64, draft: &ProductDraft) -> Result<Product>;
    fn soft_delete_product(&self, id: i64) -> Result<bool>;
    fn soft_delete_products(&self, ids: &[i64]) -> Result<usize>;
    /// Which of the given ids reference an active product. For bulk-delete
    /// request validation.
    fn filter_existing_product_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;
    fn list_product_export_rows(&self) -> Result<Vec<ProductExportRow>>;
}
