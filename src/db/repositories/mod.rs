//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity; the
//! blog, entry and tag repositories also answer criteria queries through
//! [`CriteriaRepository`].

pub mod blog;
pub mod entry;
pub mod tag;
pub mod user;

pub use blog::{BlogRepository, SqlxBlogRepository};
pub use entry::{EntryRepository, SqlxEntryRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{mysql::MySqlRow, sqlite::SqliteRow, MySqlPool, Row, SqlitePool};

use crate::criteria::{CompiledQuery, Predicate};
use crate::db::params::{bind_mysql, bind_sqlite};
use crate::models::{PageRequest, SortOrder};

/// Read access by predicate.
///
/// Implemented by every repository whose entity has a criteria schema.
/// The predicate must have been built from that schema.
#[async_trait]
pub trait CriteriaRepository<E>: Send + Sync {
    /// Matching rows ordered by `sort` and then id, limited to `page`
    /// when one is given
    async fn find_matching(
        &self,
        predicate: &Predicate,
        sort: &[SortOrder],
        page: Option<&PageRequest>,
    ) -> Result<Vec<E>>;

    /// Number of matching rows
    async fn count_matching(&self, predicate: &Predicate) -> Result<i64>;
}

pub(crate) async fn fetch_all_sqlite(pool: &SqlitePool, query: &CompiledQuery) -> Result<Vec<SqliteRow>> {
    bind_sqlite(sqlx::query(&query.sql), &query.params)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to run criteria query: {}", query.sql))
}

pub(crate) async fn fetch_all_mysql(pool: &MySqlPool, query: &CompiledQuery) -> Result<Vec<MySqlRow>> {
    bind_mysql(sqlx::query(&query.sql), &query.params)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to run criteria query: {}", query.sql))
}

pub(crate) async fn count_sqlite(pool: &SqlitePool, query: &CompiledQuery) -> Result<i64> {
    let row = bind_sqlite(sqlx::query(&query.sql), &query.params)
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to run criteria count: {}", query.sql))?;
    row.try_get::<i64, _>(0)
        .context("Failed to decode criteria count")
}

pub(crate) async fn count_mysql(pool: &MySqlPool, query: &CompiledQuery) -> Result<i64> {
    let row = bind_mysql(sqlx::query(&query.sql), &query.params)
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to run criteria count: {}", query.sql))?;
    row.try_get::<i64, _>(0)
        .context("Failed to decode criteria count")
}

/// `?, ?, ?` for `n` values
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
