mod auth;
mod categories;
pub mod dto;
mod export;
mod products;
pub mod response;
mod router;
pub mod validation;

pub use router::{AppState, create_router};
