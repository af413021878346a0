//! Blog repository
//!
//! Database operations for blogs. Reads join the owning user so that a
//! loaded `Blog` carries the owner's login.

use crate::config::DatabaseDriver;
use crate::criteria::predicate::ColumnRef;
use crate::criteria::{CriteriaSql, FilterValue, Predicate, BLOG_SCHEMA};
use crate::db::DynDatabasePool;
use crate::models::{Blog, PageRequest, SortOrder, UserRef};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

use super::{count_mysql, count_sqlite, fetch_all_mysql, fetch_all_sqlite, CriteriaRepository};

const BLOG_COLUMNS: &str = "bl.id, bl.name, bl.handle, bl.user_id, owner.login AS user_login";
const OWNER_JOIN: &str = "LEFT JOIN users owner ON owner.id = bl.user_id";

/// Blog repository trait
#[async_trait]
pub trait BlogRepository: Send + Sync {
    /// Insert a blog; its `id` is ignored and assigned by the database
    async fn create(&self, blog: &Blog) -> Result<Blog>;

    /// Overwrite every column of an existing blog
    async fn update(&self, blog: &Blog) -> Result<()>;

    /// Get blog by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Blog>>;

    /// Delete a blog. Missing ids are ignored.
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based blog repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxBlogRepository {
    pool: DynDatabasePool,
}

impl SqlxBlogRepository {
    /// Create a new SQLx blog repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BlogRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BlogRepository for SqlxBlogRepository {
    async fn create(&self, blog: &Blog) -> Result<Blog> {
        let sql = "INSERT INTO blogs (name, handle, user_id) VALUES (?, ?, ?)";
        let user_id = blog.user.as_ref().map(|u| u.id);

        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&blog.name)
                .bind(&blog.handle)
                .bind(user_id)
                .execute(self.pool.sqlite_pool()?)
                .await
                .context("Failed to create blog")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&blog.name)
                .bind(&blog.handle)
                .bind(user_id)
                .execute(self.pool.mysql_pool()?)
                .await
                .context("Failed to create blog")?
                .last_insert_id() as i64,
        };

        Ok(Blog { id, ..blog.clone() })
    }

    async fn update(&self, blog: &Blog) -> Result<()> {
        let sql = "UPDATE blogs SET name = ?, handle = ?, user_id = ? WHERE id = ?";
        let user_id = blog.user.as_ref().map(|u| u.id);

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&blog.name)
                    .bind(&blog.handle)
                    .bind(user_id)
                    .bind(blog.id)
                    .execute(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to update blog")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&blog.name)
                    .bind(&blog.handle)
                    .bind(user_id)
                    .bind(blog.id)
                    .execute(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to update blog")?;
            }
        }
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Blog>> {
        let predicate = Predicate::Equals {
            column: ColumnRef {
                alias: BLOG_SCHEMA.alias,
                column: "id",
            },
            value: FilterValue::Long(id),
        };
        let mut blogs = self.find_matching(&predicate, &[], None).await?;
        Ok(blogs.pop())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM blogs WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to delete blog")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM blogs WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to delete blog")?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CriteriaRepository<Blog> for SqlxBlogRepository {
    async fn find_matching(
        &self,
        predicate: &Predicate,
        sort: &[SortOrder],
        page: Option<&PageRequest>,
    ) -> Result<Vec<Blog>> {
        let query = CriteriaSql::compile(&BLOG_SCHEMA, predicate, self.pool.driver().into())
            .select(BLOG_COLUMNS, OWNER_JOIN, sort, page);

        match self.pool.driver() {
            DatabaseDriver::Sqlite => fetch_all_sqlite(self.pool.sqlite_pool()?, &query)
                .await?
                .iter()
                .map(row_to_blog_sqlite)
                .collect(),
            DatabaseDriver::Mysql => fetch_all_mysql(self.pool.mysql_pool()?, &query)
                .await?
                .iter()
                .map(row_to_blog_mysql)
                .collect(),
        }
    }

    async fn count_matching(&self, predicate: &Predicate) -> Result<i64> {
        let query =
            CriteriaSql::compile(&BLOG_SCHEMA, predicate, self.pool.driver().into()).count();

        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_sqlite(self.pool.sqlite_pool()?, &query).await,
            DatabaseDriver::Mysql => count_mysql(self.pool.mysql_pool()?, &query).await,
        }
    }
}

fn owner(user_id: Option<i64>, login: Option<String>) -> Option<UserRef> {
    match (user_id, login) {
        (Some(id), Some(login)) => Some(UserRef { id, login }),
        _ => None,
    }
}

fn row_to_blog_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Blog> {
    Ok(Blog {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        handle: row.try_get("handle")?,
        user: owner(row.try_get("user_id")?, row.try_get("user_login")?),
    })
}

fn row_to_blog_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Blog> {
    Ok(Blog {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        handle: row.try_get("handle")?,
        user: owner(row.try_get("user_id")?, row.try_get("user_login")?),
    })
}
