//! Tag repository
//!
//! Database operations for tags.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing it, plus criteria queries, for SQLite
//!   and MySQL

use crate::config::DatabaseDriver;
use crate::criteria::predicate::ColumnRef;
use crate::criteria::{CriteriaSql, FilterValue, Predicate, TAG_SCHEMA};
use crate::db::DynDatabasePool;
use crate::models::{PageRequest, SortOrder, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::{count_mysql, count_sqlite, fetch_all_mysql, fetch_all_sqlite, CriteriaRepository};

const TAG_COLUMNS: &str = "tg.id, tg.name, tg.image, tg.image_content_type";

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Insert a tag; its `id` is ignored and assigned by the database
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Overwrite every column of an existing tag
    async fn update(&self, tag: &Tag) -> Result<()>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get the tags among `ids` that exist, ordered by id
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>>;

    /// Delete a tag and its entry links. Missing ids are ignored.
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }

    fn id_column() -> ColumnRef {
        ColumnRef {
            alias: TAG_SCHEMA.alias,
            column: "id",
        }
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_tag_sqlite(self.pool.sqlite_pool()?, tag).await,
            DatabaseDriver::Mysql => create_tag_mysql(self.pool.mysql_pool()?, tag).await,
        }
    }

    async fn update(&self, tag: &Tag) -> Result<()> {
        let sql = "UPDATE tags SET name = ?, image = ?, image_content_type = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&tag.name)
                    .bind(tag.image.as_deref())
                    .bind(tag.image_content_type.as_deref())
                    .bind(tag.id)
                    .execute(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to update tag")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&tag.name)
                    .bind(tag.image.as_deref())
                    .bind(tag.image_content_type.as_deref())
                    .bind(tag.id)
                    .execute(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to update tag")?;
            }
        }
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let predicate = Predicate::Equals {
            column: Self::id_column(),
            value: FilterValue::Long(id),
        };
        let mut tags = self.find_matching(&predicate, &[], None).await?;
        Ok(tags.pop())
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let predicate = Predicate::In {
            column: Self::id_column(),
            values: ids.iter().copied().map(FilterValue::Long).collect(),
            negated: false,
        };
        self.find_matching(&predicate, &[], None).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        // entry_tags rows go with it (ON DELETE CASCADE)
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM tags WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.sqlite_pool()?)
                    .await
                    .context("Failed to delete tag")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM tags WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.mysql_pool()?)
                    .await
                    .context("Failed to delete tag")?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CriteriaRepository<Tag> for SqlxTagRepository {
    async fn find_matching(
        &self,
        predicate: &Predicate,
        sort: &[SortOrder],
        page: Option<&PageRequest>,
    ) -> Result<Vec<Tag>> {
        let query = CriteriaSql::compile(&TAG_SCHEMA, predicate, self.pool.driver().into())
            .select(TAG_COLUMNS, "", sort, page);

        match self.pool.driver() {
            DatabaseDriver::Sqlite => fetch_all_sqlite(self.pool.sqlite_pool()?, &query)
                .await?
                .iter()
                .map(row_to_tag_sqlite)
                .collect(),
            DatabaseDriver::Mysql => fetch_all_mysql(self.pool.mysql_pool()?, &query)
                .await?
                .iter()
                .map(row_to_tag_mysql)
                .collect(),
        }
    }

    async fn count_matching(&self, predicate: &Predicate) -> Result<i64> {
        let query =
            CriteriaSql::compile(&TAG_SCHEMA, predicate, self.pool.driver().into()).count();

        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_sqlite(self.pool.sqlite_pool()?, &query).await,
            DatabaseDriver::Mysql => count_mysql(self.pool.mysql_pool()?, &query).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    let result = sqlx::query(
        r#"
        INSERT INTO tags (name, image, image_content_type)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&tag.name)
    .bind(tag.image.as_deref())
    .bind(tag.image_content_type.as_deref())
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        ..tag.clone()
    })
}

pub(crate) fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        image: row.try_get("image")?,
        image_content_type: row.try_get("image_content_type")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, tag: &Tag) -> Result<Tag> {
    let result = sqlx::query(
        r#"
        INSERT INTO tags (name, image, image_content_type)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&tag.name)
    .bind(tag.image.as_deref())
    .bind(tag.image_content_type.as_deref())
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_id() as i64,
        ..tag.clone()
    })
}

pub(crate) fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        image: row.try_get("image")?,
        image_content_type: row.try_get("image_content_type")?,
    })
}
