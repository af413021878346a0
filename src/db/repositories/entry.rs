//! Entry repository
//!
//! Database operations for blog entries and their tag links.
//!
//! Writes that touch both `entries` and `entry_tags` run in a single
//! transaction. Reads load the entries first and then the tags of every
//! returned entry in one batch query.

use crate::config::DatabaseDriver;
use crate::criteria::predicate::ColumnRef;
use crate::criteria::{CriteriaSql, FilterValue, Predicate, ENTRY_SCHEMA};
use crate::db::DynDatabasePool;
use crate::models::{BlogRef, Entry, PageRequest, SortOrder, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

use super::tag::{row_to_tag_mysql, row_to_tag_sqlite};
use super::{
    count_mysql, count_sqlite, fetch_all_mysql, fetch_all_sqlite, placeholders,
    CriteriaRepository,
};

const ENTRY_COLUMNS: &str = "e.id, e.title, e.content, e.date, e.blog_id, eb.name AS blog_name";
const BLOG_NAME_JOIN: &str = "LEFT JOIN blogs eb ON eb.id = e.blog_id";

/// Entry repository trait
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Insert an entry and link its tags; the `id` is assigned by the database
    async fn create(&self, entry: &Entry) -> Result<Entry>;

    /// Overwrite an existing entry and replace its tag links
    async fn update(&self, entry: &Entry) -> Result<()>;

    /// Get entry by ID, tags included
    async fn get_by_id(&self, id: i64) -> Result<Option<Entry>>;

    /// Tags linked to an entry, ordered by id
    async fn get_tags(&self, entry_id: i64) -> Result<Vec<Tag>>;

    /// Delete an entry and its tag links. Missing ids are ignored.
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based entry repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxEntryRepository {
    pool: DynDatabasePool,
}

impl SqlxEntryRepository {
    /// Create a new SQLx entry repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EntryRepository> {
        Arc::new(Self::new(pool))
    }

    async fn load_tags(&self, entry_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>> {
        if entry_ids.is_empty() {
            return Ok(HashMap::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => load_tags_sqlite(self.pool.sqlite_pool()?, entry_ids).await,
            DatabaseDriver::Mysql => load_tags_mysql(self.pool.mysql_pool()?, entry_ids).await,
        }
    }
}

#[async_trait]
impl EntryRepository for SqlxEntryRepository {
    async fn create(&self, entry: &Entry) -> Result<Entry> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => create_entry_sqlite(self.pool.sqlite_pool()?, entry).await?,
            DatabaseDriver::Mysql => create_entry_mysql(self.pool.mysql_pool()?, entry).await?,
        };
        Ok(Entry {
            id,
            ..entry.clone()
        })
    }

    async fn update(&self, entry: &Entry) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_entry_sqlite(self.pool.sqlite_pool()?, entry).await,
            DatabaseDriver::Mysql => update_entry_mysql(self.pool.mysql_pool()?, entry).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Entry>> {
        let predicate = Predicate::Equals {
            column: ColumnRef {
                alias: ENTRY_SCHEMA.alias,
                column: "id",
            },
            value: FilterValue::Long(id),
        };
        let mut entries = self.find_matching(&predicate, &[], None).await?;
        Ok(entries.pop())
    }

    async fn get_tags(&self, entry_id: i64) -> Result<Vec<Tag>> {
        let mut tags = self.load_tags(&[entry_id]).await?;
        Ok(tags.remove(&entry_id).unwrap_or_default())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_entry_sqlite(self.pool.sqlite_pool()?, id).await,
            DatabaseDriver::Mysql => delete_entry_mysql(self.pool.mysql_pool()?, id).await,
        }
    }
}

#[async_trait]
impl CriteriaRepository<Entry> for SqlxEntryRepository {
    async fn find_matching(
        &self,
        predicate: &Predicate,
        sort: &[SortOrder],
        page: Option<&PageRequest>,
    ) -> Result<Vec<Entry>> {
        let query = CriteriaSql::compile(&ENTRY_SCHEMA, predicate, self.pool.driver().into())
            .select(ENTRY_COLUMNS, BLOG_NAME_JOIN, sort, page);

        let mut entries: Vec<Entry> = match self.pool.driver() {
            DatabaseDriver::Sqlite => fetch_all_sqlite(self.pool.sqlite_pool()?, &query)
                .await?
                .iter()
                .map(row_to_entry_sqlite)
                .collect::<Result<_>>()?,
            DatabaseDriver::Mysql => fetch_all_mysql(self.pool.mysql_pool()?, &query)
                .await?
                .iter()
                .map(row_to_entry_mysql)
                .collect::<Result<_>>()?,
        };

        let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        let mut tags = self.load_tags(&ids).await?;
        for entry in &mut entries {
            entry.tags = tags.remove(&entry.id).unwrap_or_default();
        }

        Ok(entries)
    }

    async fn count_matching(&self, predicate: &Predicate) -> Result<i64> {
        let query =
            CriteriaSql::compile(&ENTRY_SCHEMA, predicate, self.pool.driver().into()).count();

        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_sqlite(self.pool.sqlite_pool()?, &query).await,
            DatabaseDriver::Mysql => count_mysql(self.pool.mysql_pool()?, &query).await,
        }
    }
}

fn tags_sql(count: usize) -> String {
    format!(
        r#"
        SELECT et.entry_id, tg.id, tg.name, tg.image, tg.image_content_type
        FROM entry_tags et
        JOIN tags tg ON tg.id = et.tag_id
        WHERE et.entry_id IN ({})
        ORDER BY tg.id
        "#,
        placeholders(count)
    )
}

/// Tag ids of an entry, without duplicates
fn tag_ids(entry: &Entry) -> Vec<i64> {
    let mut ids: Vec<i64> = entry.tags.iter().map(|t| t.id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_entry_sqlite(pool: &SqlitePool, entry: &Entry) -> Result<i64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query(
        r#"
        INSERT INTO entries (title, content, date, blog_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&entry.title)
    .bind(entry.content.as_deref())
    .bind(entry.date)
    .bind(entry.blog.id)
    .execute(&mut *tx)
    .await
    .context("Failed to create entry")?
    .last_insert_rowid();

    for tag_id in tag_ids(entry) {
        sqlx::query("INSERT INTO entry_tags (entry_id, tag_id) VALUES (?, ?)")
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link entry tag")?;
    }

    tx.commit().await.context("Failed to commit entry")?;
    Ok(id)
}

async fn update_entry_sqlite(pool: &SqlitePool, entry: &Entry) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        UPDATE entries SET title = ?, content = ?, date = ?, blog_id = ?
        WHERE id = ?
        "#,
    )
    .bind(&entry.title)
    .bind(entry.content.as_deref())
    .bind(entry.date)
    .bind(entry.blog.id)
    .bind(entry.id)
    .execute(&mut *tx)
    .await
    .context("Failed to update entry")?;

    sqlx::query("DELETE FROM entry_tags WHERE entry_id = ?")
        .bind(entry.id)
        .execute(&mut *tx)
        .await
        .context("Failed to unlink entry tags")?;

    for tag_id in tag_ids(entry) {
        sqlx::query("INSERT INTO entry_tags (entry_id, tag_id) VALUES (?, ?)")
            .bind(entry.id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link entry tag")?;
    }

    tx.commit().await.context("Failed to commit entry")?;
    Ok(())
}

async fn delete_entry_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM entry_tags WHERE entry_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to unlink entry tags")?;
    sqlx::query("DELETE FROM entries WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete entry")?;

    tx.commit().await.context("Failed to commit entry delete")?;
    Ok(())
}

async fn load_tags_sqlite(pool: &SqlitePool, entry_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>> {
    let sql = tags_sql(entry_ids.len());
    let mut query = sqlx::query(&sql);
    for id in entry_ids {
        query = query.bind(*id);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to load entry tags")?;

    let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in &rows {
        let entry_id: i64 = row.try_get("entry_id")?;
        tags.entry(entry_id).or_default().push(row_to_tag_sqlite(row)?);
    }
    Ok(tags)
}

fn row_to_entry_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Entry> {
    Ok(Entry {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        date: row.try_get("date")?,
        blog: BlogRef {
            id: row.try_get("blog_id")?,
            name: row
                .try_get::<Option<String>, _>("blog_name")?
                .unwrap_or_default(),
        },
        tags: Vec::new(),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_entry_mysql(pool: &MySqlPool, entry: &Entry) -> Result<i64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query(
        r#"
        INSERT INTO entries (title, content, date, blog_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&entry.title)
    .bind(entry.content.as_deref())
    .bind(entry.date)
    .bind(entry.blog.id)
    .execute(&mut *tx)
    .await
    .context("Failed to create entry")?
    .last_insert_id() as i64;

    for tag_id in tag_ids(entry) {
        sqlx::query("INSERT INTO entry_tags (entry_id, tag_id) VALUES (?, ?)")
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link entry tag")?;
    }

    tx.commit().await.context("Failed to commit entry")?;
    Ok(id)
}

async fn update_entry_mysql(pool: &MySqlPool, entry: &Entry) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        UPDATE entries SET title = ?, content = ?, date = ?, blog_id = ?
        WHERE id = ?
        "#,
    )
    .bind(&entry.title)
    .bind(entry.content.as_deref())
    .bind(entry.date)
    .bind(entry.blog.id)
    .bind(entry.id)
    .execute(&mut *tx)
    .await
    .context("Failed to update entry")?;

    sqlx::query("DELETE FROM entry_tags WHERE entry_id = ?")
        .bind(entry.id)
        .execute(&mut *tx)
        .await
        .context("Failed to unlink entry tags")?;

    for tag_id in tag_ids(entry) {
        sqlx::query("INSERT INTO entry_tags (entry_id, tag_id) VALUES (?, ?)")
            .bind(entry.id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link entry tag")?;
    }

    tx.commit().await.context("Failed to commit entry")?;
    Ok(())
}

async fn delete_entry_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM entry_tags WHERE entry_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to unlink entry tags")?;
    sqlx::query("DELETE FROM entries WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete entry")?;

    tx.commit().await.context("Failed to commit entry delete")?;
    Ok(())
}

async fn load_tags_mysql(pool: &MySqlPool, entry_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>> {
    let sql = tags_sql(entry_ids.len());
    let mut query = sqlx::query(&sql);
    for id in entry_ids {
        query = query.bind(*id);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to load entry tags")?;

    let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in &rows {
        let entry_id: i64 = row.try_get("entry_id")?;
        tags.entry(entry_id).or_default().push(row_to_tag_mysql(row)?);
    }
    Ok(tags)
}

fn row_to_entry_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Entry> {
    Ok(Entry {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        date: row.try_get("date")?,
        blog: BlogRef {
            id: row.try_get("blog_id")?,
            name: row
                .try_get::<Option<String>, _>("blog_name")?
                .unwrap_or_default(),
        },
        tags: Vec::new(),
    })
}
