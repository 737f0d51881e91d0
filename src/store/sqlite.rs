use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

const PRODUCT_COLUMNS: &str =
    "p.id, p.name, p.category_id, p.description, p.price, p.stock, p.enabled, \
     p.created_at, p.updated_at";

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        category_id: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        stock: row.get(5)?,
        enabled: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
        category: None,
    })
}

fn product_with_category_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    let mut product = product_from_row(row)?;
    product.category = Some(CategoryRef {
        id: row.get(9)?,
        name: row.get(10)?,
    });
    Ok(product)
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
        updated_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        let conn = self.conn();
        let now = format_datetime(&Utc::now());
        conn.execute(
            "INSERT INTO users (email, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![email, password_hash, now],
        )?;
        let id = conn.last_insert_rowid();

        conn.query_row(
            "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )
        .map_err(Error::from)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.conn()
            .query_row(
                "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                "SELECT id, email, password_hash, created_at, updated_at
                 FROM users WHERE email = ?1",
                params![email],
                user_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
                token.last_used_at.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        self.conn()
            .query_row(
                "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at
                 FROM tokens WHERE token_lookup = ?1",
                params![lookup],
                |row| {
                    Ok(Token {
                        id: row.get(0)?,
                        token_hash: row.get(1)?,
                        token_lookup: row.get(2)?,
                        user_id: row.get(3)?,
                        created_at: parse_datetime(&row.get::<_, String>(4)?),
                        expires_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
                        last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                    })
                },
            )
            .optional()
            .map_err(Error::from)
    }

    fn delete_user_tokens(&self, user_id: i64) -> Result<usize> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE user_id = ?1", params![user_id])?;
        Ok(rows)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Category operations

    fn upsert_category(&self, name: &str) -> Result<Category> {
        let conn = self.conn();
        let now = format_datetime(&Utc::now());
        conn.execute(
            "INSERT INTO categories (name, created_at, updated_at) VALUES (?1, ?2, ?2)
             ON CONFLICT(name) DO NOTHING",
            params![name, now],
        )?;

        conn.query_row(
            "SELECT id, name, created_at, updated_at FROM categories WHERE name = ?1",
            params![name],
            category_from_row,
        )
        .map_err(Error::from)
    }

    fn get_category(&self, id: i64) -> Result<Option<Category>> {
        self.conn()
            .query_row(
                "SELECT id, name, created_at, updated_at FROM categories WHERE id = ?1",
                params![id],
                category_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        self.conn()
            .query_row(
                "SELECT id, name, created_at, updated_at FROM categories WHERE name = ?1",
                params![name],
                category_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, name, created_at, updated_at FROM categories ORDER BY id")?;
        let rows = stmt.query_map([], category_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Product operations

    fn upsert_product(&self, draft: &ProductDraft) -> Result<Product> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        // Match on every draft field; an identical active row wins over a
        // fresh insert. `IS` rather than `=` so a NULL description matches.
        let existing = tx
            .query_row(
                &format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products p
                     WHERE p.deleted_at IS NULL
                       AND p.name = ?1 AND p.category_id = ?2 AND p.description IS ?3
                       AND p.price = ?4 AND p.stock = ?5 AND p.enabled = ?6"
                ),
                params![
                    draft.name,
                    draft.category_id,
                    draft.description,
                    draft.price,
                    draft.stock,
                    draft.enabled,
                ],
                product_from_row,
            )
            .optional()?;

        let product = match existing {
            Some(product) => product,
            None => {
                let now = format_datetime(&Utc::now());
                tx.execute(
                    "INSERT INTO products (name, category_id, description, price, stock, enabled, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                    params![
                        draft.name,
                        draft.category_id,
                        draft.description,
                        draft.price,
                        draft.stock,
                        draft.enabled,
                        now,
                    ],
                )?;
                let id = tx.last_insert_rowid();
                tx.query_row(
                    &format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ?1"),
                    params![id],
                    product_from_row,
                )?
            }
        };

        tx.commit()?;
        Ok(product)
    }

    fn get_product(&self, id: i64) -> Result<Option<Product>> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {PRODUCT_COLUMNS}, c.id, c.name FROM products p
                     JOIN categories c ON c.id = p.category_id
                     WHERE p.id = ?1 AND p.deleted_at IS NULL"
                ),
                params![id],
                product_with_category_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_products(
        &self,
        category: Option<&str>,
        after: Option<i64>,
        before: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Product>> {
        let conn = self.conn();

        let mut sql = format!(
            "SELECT {PRODUCT_COLUMNS}, c.id, c.name FROM products p
             JOIN categories c ON c.id = p.category_id
             WHERE p.deleted_at IS NULL"
        );
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(name) = category {
            values.push(Box::new(name.to_string()));
            sql.push_str(&format!(" AND c.name = ?{}", values.len()));
        }

        let backwards = before.is_some();
        if let Some(id) = before {
            values.push(Box::new(id));
            sql.push_str(&format!(" AND p.id < ?{} ORDER BY p.id DESC", values.len()));
        } else {
            if let Some(id) = after {
                values.push(Box::new(id));
                sql.push_str(&format!(" AND p.id > ?{}", values.len()));
            }
            sql.push_str(" ORDER BY p.id");
        }
        values.push(Box::new(limit));
        sql.push_str(&format!(" LIMIT ?{}", values.len()));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(values.iter().map(|v| v.as_ref())),
            product_with_category_from_row,
        )?;

        let mut products = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        if backwards {
            products.reverse();
        }
        Ok(products)
    }

    fn list_all_products(&self, category: Option<&str>) -> Result<Vec<Product>> {
        self.list_products(category, None, None, i64::MAX)
    }

    fn update_product(&self, id: i64, draft: &ProductDraft) -> Result<Product> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE products
             SET name = ?1, category_id = ?2, description = ?3, price = ?4,
                 stock = ?5, enabled = ?6, updated_at = ?7
             WHERE id = ?8 AND deleted_at IS NULL",
            params![
                draft.name,
                draft.category_id,
                draft.description,
                draft.price,
                draft.stock,
                draft.enabled,
                format_datetime(&Utc::now()),
                id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }

        let product = tx.query_row(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ?1"),
            params![id],
            product_from_row,
        )?;

        tx.commit()?;
        Ok(product)
    }

    fn soft_delete_product(&self, id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE products SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(rows > 0)
    }

    fn soft_delete_products(&self, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = (2..=ids.len() + 1)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE products SET deleted_at = ?1
             WHERE id IN ({placeholders}) AND deleted_at IS NULL"
        );

        let mut values: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(format_datetime(&Utc::now()))];
        for id in ids {
            values.push(Box::new(*id));
        }

        let rows = self
            .conn()
            .execute(&sql, params_from_iter(values.iter().map(|v| v.as_ref())))?;
        Ok(rows)
    }

    fn filter_existing_product_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn();
        let placeholders = (1..=ids.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id FROM products WHERE id IN ({placeholders}) AND deleted_at IS NULL"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| row.get(0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_product_export_rows(&self) -> Result<Vec<ProductExportRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, price, created_at FROM products
             WHERE deleted_at IS NULL ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ProductExportRow {
                id: row.get(0)?,
                name: row.get(1)?,
                price: row.get(2)?,
                created_at: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (dir, store)
    }

    fn draft(name: &str, category_id: i64) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            category_id,
            description: None,
            price: 4.5,
            stock: 2,
            enabled: true,
        }
    }

    #[test]
    fn upsert_product_inserts_then_matches() {
        let (_dir, store) = test_store();
        let food = store.upsert_category("food").unwrap();

        let first = store.upsert_product(&draft("Nasi Lemak", food.id)).unwrap();
        let second = store.upsert_product(&draft("Nasi Lemak", food.id)).unwrap();
        assert_eq!(first.id, second.id);

        // Any differing field produces a new row
        let mut changed = draft("Nasi Lemak", food.id);
        changed.price = 5.0;
        let third = store.upsert_product(&changed).unwrap();
        assert_ne!(first.id, third.id);
    }

    #[test]
    fn upsert_product_null_description_matches() {
        let (_dir, store) = test_store();
        let food = store.upsert_category("food").unwrap();

        let first = store.upsert_product(&draft("Teh Tarik", food.id)).unwrap();
        let second = store.upsert_product(&draft("Teh Tarik", food.id)).unwrap();
        assert_eq!(first.id, second.id);

        let mut described = draft("Teh Tarik", food.id);
        described.description = Some("pulled tea".to_string());
        let third = store.upsert_product(&described).unwrap();
        assert_ne!(first.id, third.id);
    }

    #[test]
    fn get_product_joins_category() {
        let (_dir, store) = test_store();
        let food = store.upsert_category("food").unwrap();
        let created = store.upsert_product(&draft("Nasi Lemak", food.id)).unwrap();
        assert!(created.category.is_none());

        let fetched = store.get_product(created.id).unwrap().unwrap();
        let category = fetched.category.unwrap();
        assert_eq!(category.id, food.id);
        assert_eq!(category.name, "food");
    }

    #[test]
    fn update_product_replaces_fields_and_bumps_updated_at() {
        let (_dir, store) = test_store();
        let food = store.upsert_category("food").unwrap();
        let drink = store.upsert_category("drink").unwrap();
        let created = store.upsert_product(&draft("Nasi Lemak", food.id)).unwrap();

        let mut replacement = draft("Nasi Lemak Special", drink.id);
        replacement.description = Some("with extra sambal".to_string());
        replacement.stock = 9;
        let updated = store.update_product(created.id, &replacement).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Nasi Lemak Special");
        assert_eq!(updated.category_id, drink.id);
        assert_eq!(updated.stock, 9);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn update_missing_product_is_not_found() {
        let (_dir, store) = test_store();
        let food = store.upsert_category("food").unwrap();
        let err = store.update_product(999, &draft("ghost", food.id)).unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn soft_delete_hides_row_but_keeps_it() {
        let (_dir, store) = test_store();
        let food = store.upsert_category("food").unwrap();
        let created = store.upsert_product(&draft("Nasi Lemak", food.id)).unwrap();

        assert!(store.soft_delete_product(created.id).unwrap());
        assert!(store.get_product(created.id).unwrap().is_none());
        // Idempotent: already-deleted row matches zero rows
        assert!(!store.soft_delete_product(created.id).unwrap());

        // The row is still physically present, with deleted_at set
        let deleted_at: Option<String> = store
            .connection()
            .query_row(
                "SELECT deleted_at FROM products WHERE id = ?1",
                params![created.id],
                |row| row.get(0),
            )
            .unwrap();
        assert!(deleted_at.is_some());
    }

    #[test]
    fn soft_delete_bulk_is_idempotent_and_partial() {
        let (_dir, store) = test_store();
        let food = store.upsert_category("food").unwrap();
        let a = store.upsert_product(&draft("a", food.id)).unwrap();
        let b = store.upsert_product(&draft("b", food.id)).unwrap();

        // 999 does not exist; not an error
        let rows = store.soft_delete_products(&[a.id, b.id, 999]).unwrap();
        assert_eq!(rows, 2);
        assert_eq!(store.soft_delete_products(&[a.id, b.id]).unwrap(), 0);
        assert!(store.get_product(a.id).unwrap().is_none());
        assert!(store.get_product(b.id).unwrap().is_none());
    }

    #[test]
    fn list_products_filters_by_category_name() {
        let (_dir, store) = test_store();
        let food = store.upsert_category("food").unwrap();
        let drink = store.upsert_category("drink").unwrap();
        store.upsert_product(&draft("Nasi Lemak", food.id)).unwrap();
        store.upsert_product(&draft("Teh Tarik", drink.id)).unwrap();

        let all = store.list_all_products(None).unwrap();
        assert_eq!(all.len(), 2);

        let food_only = store.list_all_products(Some("food")).unwrap();
        assert_eq!(food_only.len(), 1);
        assert_eq!(food_only[0].name, "Nasi Lemak");

        assert!(store.list_all_products(Some("desert")).unwrap().is_empty());
    }

    #[test]
    fn list_products_keyset_pages() {
        let (_dir, store) = test_store();
        let food = store.upsert_category("food").unwrap();
        for i in 0..15 {
            store.upsert_product(&draft(&format!("p{i}"), food.id)).unwrap();
        }

        let first = store.list_products(None, None, None, 10).unwrap();
        assert_eq!(first.len(), 10);

        let last_id = first.last().unwrap().id;
        let second = store.list_products(None, Some(last_id), None, 10).unwrap();
        assert_eq!(second.len(), 5);

        let back = store
            .list_products(None, None, Some(second[0].id), 10)
            .unwrap();
        assert_eq!(back.len(), 10);
        assert_eq!(back.last().unwrap().id, last_id);
    }

    #[test]
    fn filter_existing_product_ids_skips_deleted() {
        let (_dir, store) = test_store();
        let food = store.upsert_category("food").unwrap();
        let a = store.upsert_product(&draft("a", food.id)).unwrap();
        let b = store.upsert_product(&draft("b", food.id)).unwrap();
        store.soft_delete_product(b.id).unwrap();

        let existing = store
            .filter_existing_product_ids(&[a.id, b.id, 999])
            .unwrap();
        assert_eq!(existing, vec![a.id]);
    }

    #[test]
    fn export_rows_exclude_deleted() {
        let (_dir, store) = test_store();
        let food = store.upsert_category("food").unwrap();
        let a = store.upsert_product(&draft("a", food.id)).unwrap();
        let b = store.upsert_product(&draft("b", food.id)).unwrap();
        store.soft_delete_product(a.id).unwrap();

        let rows = store.list_product_export_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, b.id);
    }

    #[test]
    fn upsert_category_is_stable_by_name() {
        let (_dir, store) = test_store();
        let first = store.upsert_category("food").unwrap();
        let second = store.upsert_category("food").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_categories().unwrap().len(), 1);
    }
}
