// src/lib.rs
pub mod auth;
pub mod db;
pub mod error;
pub mod handlers;
pub mod journal;
pub mod ledger;
pub mod market;
pub mod models;
pub mod portfolio;
pub mod valuation;

// Re-export commonly used items
pub use db::DatabasePool;
pub use error::AppError;
pub use models::*;
