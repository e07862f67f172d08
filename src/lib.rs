//! Fetches a JSON article feed, caches it in SQLite and serves it back
//! through `content://` addresses.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod models;

pub use error::{AppError, Result};
