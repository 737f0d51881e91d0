use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::Result;
use crate::store::Store;
use crate::types::{Product, ProductDraft, ProductExportRow};

pub const PAGE_SIZE: usize = 10;

/// Opaque paging position. Encodes a direction and the id of the boundary
/// row, so pages stay stable while rows are inserted concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    After(i64),
    Before(i64),
}

impl Cursor {
    #[must_use]
    pub fn encode(&self) -> String {
        let raw = match self {
            Cursor::After(id) => format!("after:{id}"),
            Cursor::Before(id) => format!("before:{id}"),
        };
        STANDARD.encode(raw)
    }

    #[must_use]
    pub fn decode(token: &str) -> Option<Self> {
        let raw = STANDARD.decode(token).ok()?;
        let raw = String::from_utf8(raw).ok()?;
        let (direction, id) = raw.split_once(':')?;
        let id = id.parse().ok()?;

        match direction {
            "after" => Some(Cursor::After(id)),
            "before" => Some(Cursor::Before(id)),
            _ => None,
        }
    }
}

/// One page of products with opaque forward/backward cursors. No total count.
#[derive(Debug)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub next_cursor: Option<String>,
    pub prev_cursor: Option<String>,
}

/// All product read/write orchestration against the store.
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn Store>,
}

impl ProductService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Natural-key upsert: an identical active row is returned as-is,
    /// otherwise a new row is inserted. The returned product carries no
    /// joined category.
    pub fn store(&self, draft: &ProductDraft) -> Result<Product> {
        self.store.upsert_product(draft)
    }

    pub fn get(&self, id: i64) -> Result<Option<Product>> {
        self.store.get_product(id)
    }

    /// A cursor page of size [`PAGE_SIZE`], optionally filtered to products
    /// whose category name equals `category` exactly.
    pub fn get_page(&self, category: Option<&str>, cursor: Option<Cursor>) -> Result<ProductPage> {
        let limit = PAGE_SIZE as i64 + 1;

        match cursor {
            None => {
                let mut items = self.store.list_products(category, None, None, limit)?;
                let next_cursor = clip_forward(&mut items);
                Ok(ProductPage {
                    items,
                    next_cursor,
                    prev_cursor: None,
                })
            }
            Some(Cursor::After(id)) => {
                let mut items = self.store.list_products(category, Some(id), None, limit)?;
                let next_cursor = clip_forward(&mut items);
                let prev_cursor = items.first().map(|p| Cursor::Before(p.id).encode());
                Ok(ProductPage {
                    items,
                    next_cursor,
                    prev_cursor,
                })
            }
            Some(Cursor::Before(id)) => {
                let mut items = self.store.list_products(category, None, Some(id), limit)?;
                let prev_cursor = if items.len() > PAGE_SIZE {
                    // The extra row at the front proves an earlier page exists
                    items.remove(0);
                    items.first().map(|p| Cursor::Before(p.id).encode())
                } else {
                    None
                };
                let next_cursor = items.last().map(|p| Cursor::After(p.id).encode());
                Ok(ProductPage {
                    items,
                    next_cursor,
                    prev_cursor,
                })
            }
        }
    }

    /// The full active set, ordered by id.
    pub fn get_all(&self, category: Option<&str>) -> Result<Vec<Product>> {
        self.store.list_all_products(category)
    }

    /// Full-field replace. `Error::NotFound` if the id matches no active row.
    pub fn update(&self, id: i64, draft: &ProductDraft) -> Result<Product> {
        self.store.update_product(id, draft)
    }

    /// Soft delete; matching zero rows is not an error.
    pub fn delete(&self, id: i64) -> Result<()> {
        self.store.soft_delete_product(id)?;
        Ok(())
    }

    /// Soft delete every id in the set; ids without an active row are skipped.
    pub fn delete_bulk(&self, ids: &[i64]) -> Result<()> {
        self.store.soft_delete_products(ids)?;
        Ok(())
    }

    pub fn export_rows(&self) -> Result<Vec<ProductExportRow>> {
        self.store.list_product_export_rows()
    }
}

/// Trims a limit+1 fetch down to a page and returns the forward cursor if the
/// extra row was present.
fn clip_forward(items: &mut Vec<Product>) -> Option<String> {
    if items.len() > PAGE_SIZE {
        items.truncate(PAGE_SIZE);
        items.last().map(|p| Cursor::After(p.id).encode())
    } else {
        None
    }
}
