mod categories;
mod products;

pub use categories::{CATEGORY_CACHE_KEY, CATEGORY_CACHE_TTL, CategoryService};
pub use products::{Cursor, PAGE_SIZE, ProductPage, ProductService};
