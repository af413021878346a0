//! Database layer
//!
//! This module provides database abstraction for blogkit.
//! It supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The database driver is selected based on configuration.
//!
//! # Architecture
//!
//! The database layer uses a trait-based abstraction (`DatabasePool`) that
//! allows the application to work with either SQLite or MySQL without
//! knowing the specific backend. Criteria queries are compiled to SQL with
//! `?` placeholders, which both drivers accept, and their values are bound
//! through the helpers in [`params`].
//!
//! # Usage
//!
//! ```ignore
//! use blogkit::config::DatabaseConfig;
//! use blogkit::db::{create_pool, migrations};
//!
//! let config = DatabaseConfig::default();
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod params;
pub mod pool;
pub mod repositories;

pub use params::SqlValue;
pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
