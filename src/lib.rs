//! # Stockroom
//!
//! A product catalog server, usable both as a standalone binary and as a
//! library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! stockroom = "0.1"
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use stockroom::cache::MemoryCache;
//! use stockroom::server::{AppState, create_router};
//! use stockroom::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/stockroom.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     Arc::new(MemoryCache::new()),
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod server;
pub mod service;
pub mod store;
pub mod types;
