//! User repository
//!
//! Read-only access to users and their authorities.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL
//!
//! Users are only ever created by the seed migration.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Authority, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const USER_COLUMNS: &str =
    "id, login, email, first_name, last_name, activated, lang_key, created_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get user by ID, authorities included
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by login, authorities included
    async fn get_by_login(&self, login: &str) -> Result<Option<User>>;

    /// Get user by email, authorities included
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Authority names granted to a user, sorted
    async fn get_authorities(&self, user_id: i64) -> Result<Vec<String>>;

    /// Get authority by name
    async fn get_authority(&self, name: &str) -> Result<Option<Authority>>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }

    async fn find_one(&self, column: &str, value: UserKey<'_>) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let user = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_user_sqlite(self.pool.sqlite_pool()?, &sql, value).await?
            }
            DatabaseDriver::Mysql => find_user_mysql(self.pool.mysql_pool()?, &sql, value).await?,
        };

        match user {
            Some(mut user) => {
                user.authorities = self.get_authorities(user.id).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}

/// Lookup value for a single-user query
#[derive(Clone, Copy)]
enum UserKey<'a> {
    Id(i64),
    Text(&'a str),
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        self.find_one("id", UserKey::Id(id)).await
    }

    async fn get_by_login(&self, login: &str) -> Result<Option<User>> {
        self.find_one("login", UserKey::Text(login)).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email", UserKey::Text(email)).await
    }

    async fn get_authorities(&self, user_id: i64) -> Result<Vec<String>> {
        let sql = "SELECT authority_name FROM user_authority WHERE user_id = ? ORDER BY authority_name";
        let names = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query_scalar::<_, String>(sql)
                .bind(user_id)
                .fetch_all(self.pool.sqlite_pool()?)
                .await
                .context("Failed to get user authorities")?,
            DatabaseDriver::Mysql => sqlx::query_scalar::<_, String>(sql)
                .bind(user_id)
                .fetch_all(self.pool.mysql_pool()?)
                .await
                .context("Failed to get user authorities")?,
        };
        Ok(names)
    }

    async fn get_authority(&self, name: &str) -> Result<Option<Authority>> {
        let sql = "SELECT name FROM authorities WHERE name = ?";
        let found = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query_scalar::<_, String>(sql)
                .bind(name)
                .fetch_optional(self.pool.sqlite_pool()?)
                .await
                .context("Failed to get authority")?,
            DatabaseDriver::Mysql => sqlx::query_scalar::<_, String>(sql)
                .bind(name)
                .fetch_optional(self.pool.mysql_pool()?)
                .await
                .context("Failed to get authority")?,
        };
        Ok(found.map(|name| Authority { name }))
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn find_user_sqlite(pool: &SqlitePool, sql: &str, key: UserKey<'_>) -> Result<Option<User>> {
    let query = sqlx::query(sql);
    let query = match key {
        UserKey::Id(id) => query.bind(id),
        UserKey::Text(text) => query.bind(text),
    };
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        login: row.try_get("login")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        activated: row.try_get("activated")?,
        lang_key: row.try_get("lang_key")?,
        created_at: row.try_get("created_at")?,
        authorities: Vec::new(),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn find_user_mysql(pool: &MySqlPool, sql: &str, key: UserKey<'_>) -> Result<Option<User>> {
    let query = sqlx::query(sql);
    let query = match key {
        UserKey::Id(id) => query.bind(id),
        UserKey::Text(text) => query.bind(text),
    };
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        login: row.try_get("login")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        activated: row.try_get("activated")?,
        lang_key: row.try_get("lang_key")?,
        created_at: row.try_get("created_at")?,
        authorities: Vec::new(),
    })
}
