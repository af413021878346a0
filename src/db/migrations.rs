//! Database migrations module
//!
//! This module provides code-based database migrations for blogkit.
//! All migrations are embedded directly in Rust code as SQL strings, supporting
//! both SQLite and MySQL databases for single-binary deployment.
//!
//! # Usage
//!
//! ```ignore
//! use blogkit::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```
//!
//! # Architecture
//!
//! Each migration is defined as a `Migration` struct containing:
//! - `version`: Unique version number for ordering
//! - `name`: Human-readable migration name
//! - `up_sqlite`: SQL for SQLite database
//! - `up_mysql`: SQL for MySQL database

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    /// Migration version number
    pub version: i64,
    /// Migration name/description
    pub name: String,
    /// When the migration was applied
    pub applied_at: DateTime<Utc>,
}

/// All migrations for blogkit.
/// These are embedded in the binary for single-binary deployment.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                login VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(254) UNIQUE,
                first_name VARCHAR(50),
                last_name VARCHAR(50),
                activated BOOLEAN NOT NULL DEFAULT 0,
                lang_key VARCHAR(10),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                login VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(254) UNIQUE,
                first_name VARCHAR(50),
                last_name VARCHAR(50),
                activated BOOLEAN NOT NULL DEFAULT FALSE,
                lang_key VARCHAR(10),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_users_email ON users(email);
        "#,
    },
    Migration {
        version: 2,
        name: "create_authorities",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS authorities (
                name VARCHAR(50) PRIMARY KEY
            );
            CREATE TABLE IF NOT EXISTS user_authority (
                user_id INTEGER NOT NULL,
                authority_name VARCHAR(50) NOT NULL,
                PRIMARY KEY (user_id, authority_name),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (authority_name) REFERENCES authorities(name) ON DELETE CASCADE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS authorities (
                name VARCHAR(50) PRIMARY KEY
            );
            CREATE TABLE IF NOT EXISTS user_authority (
                user_id BIGINT NOT NULL,
                authority_name VARCHAR(50) NOT NULL,
                PRIMARY KEY (user_id, authority_name),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (authority_name) REFERENCES authorities(name) ON DELETE CASCADE
            );
        "#,
    },
    // Built-in accounts and roles
    Migration {
        version: 3,
        name: "seed_users",
        up_sqlite: r#"
            INSERT INTO authorities (name) VALUES ('ROLE_ADMIN'), ('ROLE_USER');
            INSERT INTO users (id, login, email, first_name, last_name, activated, lang_key) VALUES
                (1, 'system', 'system@localhost', 'System', 'System', 1, 'en'),
                (2, 'anonymoususer', 'anonymous@localhost', 'Anonymous', 'User', 1, 'en'),
                (3, 'admin', 'admin@localhost', 'Administrator', 'Administrator', 1, 'en'),
                (4, 'user', 'user@localhost', 'User', 'User', 1, 'en');
            INSERT INTO user_authority (user_id, authority_name) VALUES
                (1, 'ROLE_ADMIN'), (1, 'ROLE_USER'),
                (3, 'ROLE_ADMIN'), (3, 'ROLE_USER'),
                (4, 'ROLE_USER');
        "#,
        up_mysql: r#"
            INSERT INTO authorities (name) VALUES ('ROLE_ADMIN'), ('ROLE_USER');
            INSERT INTO users (id, login, email, first_name, last_name, activated, lang_key) VALUES
                (1, 'system', 'system@localhost', 'System', 'System', TRUE, 'en'),
                (2, 'anonymoususer', 'anonymous@localhost', 'Anonymous', 'User', TRUE, 'en'),
                (3, 'admin', 'admin@localhost', 'Administrator', 'Administrator', TRUE, 'en'),
                (4, 'user', 'user@localhost', 'User', 'User', TRUE, 'en');
            INSERT INTO user_authority (user_id, authority_name) VALUES
                (1, 'ROLE_ADMIN'), (1, 'ROLE_USER'),
                (3, 'ROLE_ADMIN'), (3, 'ROLE_USER'),
                (4, 'ROLE_USER');
        "#,
    },
    Migration {
        version: 4,
        name: "create_blogs",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS blogs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL,
                handle VARCHAR(255) NOT NULL,
                user_id INTEGER,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_blogs_user_id ON blogs(user_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS blogs (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL,
                handle VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL,
                user_id BIGINT,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_blogs_user_id ON blogs(user_id);
        "#,
    },
    Migration {
        version: 5,
        name: "create_tags",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL,
                image BLOB,
                image_content_type VARCHAR(255)
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS tags (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL,
                image LONGBLOB,
                image_content_type VARCHAR(255)
            );
        "#,
    },
    // Entries and their many-to-many link to tags.
    // Entries block deleting their blog; link rows follow either side.
    Migration {
        version: 6,
        name: "create_entries",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                content TEXT,
                date TIMESTAMP NOT NULL,
                blog_id INTEGER NOT NULL,
                FOREIGN KEY (blog_id) REFERENCES blogs(id)
            );
            CREATE INDEX IF NOT EXISTS idx_entries_blog_id ON entries(blog_id);
            CREATE INDEX IF NOT EXISTS idx_entries_date ON entries(date);
            CREATE TABLE IF NOT EXISTS entry_tags (
                entry_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                PRIMARY KEY (entry_id, tag_id),
                FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_entry_tags_tag_id ON entry_tags(tag_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS entries (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL,
                content LONGTEXT,
                date DATETIME(6) NOT NULL,
                blog_id BIGINT NOT NULL,
                FOREIGN KEY (blog_id) REFERENCES blogs(id)
            );
            CREATE INDEX idx_entries_blog_id ON entries(blog_id);
            CREATE INDEX idx_entries_date ON entries(date);
            CREATE TABLE IF NOT EXISTS entry_tags (
                entry_id BIGINT NOT NULL,
                tag_id BIGINT NOT NULL,
                PRIMARY KEY (entry_id, tag_id),
                FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_entry_tags_tag_id ON entry_tags(tag_id);
        "#,
    },
];

/// Run all pending migrations
///
/// This function:
/// 1. Creates the migrations tracking table if it doesn't exist
/// 2. Checks which migrations have already been applied
/// 3. Runs any pending migrations in order
///
/// # Arguments
///
/// * `pool` - Database connection pool
///
/// # Returns
///
/// Number of migrations applied
///
/// # Errors
///
/// Returns an error if any migration fails to apply
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    // Create migrations table
    create_migrations_table(pool).await?;

    // Get applied migrations
    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

/// Get list of already applied migrations
async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => get_applied_migrations_sqlite(pool.sqlite_pool()?).await,
        DatabaseDriver::Mysql => get_applied_migrations_mysql(pool.mysql_pool()?).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows =
        sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
            .fetch_all(pool)
            .await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(MigrationRecord {
            version: row.try_get("version")?,
            name: row.try_get("name")?,
            applied_at: row.try_get("applied_at")?,
        });
    }

    Ok(records)
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows =
        sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
            .fetch_all(pool)
            .await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(MigrationRecord {
            version: row.try_get("version")?,
            name: row.try_get("name")?,
            applied_at: row.try_get("applied_at")?,
        });
    }

    Ok(records)
}

/// Apply a single migration
async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => {
            apply_migration_sqlite(pool.sqlite_pool()?, migration).await
        }
        DatabaseDriver::Mysql => {
            apply_migration_mysql(pool.mysql_pool()?, migration).await
        }
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    // Execute migration SQL (may contain multiple statements)
    for statement in split_sql_statements(migration.up_sqlite) {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
        }
    }

    // Record the migration
    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    // Execute migration SQL (may contain multiple statements)
    for statement in split_sql_statements(migration.up_mysql) {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
        }
    }

    // Record the migration
    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    if sql.chars().count() > 100 {
        format!("{}...", sql.chars().take(100).collect::<String>())
    } else {
        sql.to_string()
    }
}

/// Split SQL into individual statements, handling comments properly
fn split_sql_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut current_start = 0;
    let mut in_statement = false;

    for (i, c) in sql.char_indices() {
        match c {
            ';' => {
                if in_statement {
                    let stmt = sql[current_start..i].trim();
                    if !stmt.is_empty() && !is_comment_only(stmt) {
                        statements.push(stmt);
                    }
                    in_statement = false;
                }
                current_start = i + 1;
            }
            _ if !c.is_whitespace() && !in_statement => {
                current_start = i;
                in_statement = true;
            }
            _ => {}
        }
    }

    // Handle last statement without trailing semicolon
    if in_statement {
        let stmt = sql[current_start..].trim();
        if !stmt.is_empty() && !is_comment_only(stmt) {
            statements.push(stmt);
        }
    }

    statements
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    for line in s.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with("--") {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> (DynDatabasePool, SqlitePool) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap().clone();
        (pool, sqlite)
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        // Running again should apply 0 migrations
        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_seeded_users_and_authorities() {
        let (_pool, sqlite) = migrated_pool().await;

        let logins: Vec<String> = sqlx::query("SELECT login FROM users ORDER BY id")
            .fetch_all(&sqlite)
            .await
            .unwrap()
            .iter()
            .map(|r| r.get("login"))
            .collect();
        assert_eq!(logins, vec!["system", "anonymoususer", "admin", "user"]);

        let admin_roles: i64 = sqlx::query(
            "SELECT COUNT(*) FROM user_authority WHERE user_id = 3",
        )
        .fetch_one(&sqlite)
        .await
        .unwrap()
        .get(0);
        assert_eq!(admin_roles, 2);
    }

    #[tokio::test]
    async fn test_entry_requires_existing_blog() {
        let (_pool, sqlite) = migrated_pool().await;

        let result = sqlx::query(
            "INSERT INTO entries (title, date, blog_id) VALUES ('t', '1970-01-01T00:00:00+00:00', 999)",
        )
        .execute(&sqlite)
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_entry_title_and_date_not_null() {
        let (_pool, sqlite) = migrated_pool().await;
        sqlx::query("INSERT INTO blogs (id, name, handle) VALUES (1, 'blog', 'bl')")
            .execute(&sqlite)
            .await
            .unwrap();

        let no_title = sqlx::query(
            "INSERT INTO entries (date, blog_id) VALUES ('1970-01-01T00:00:00+00:00', 1)",
        )
        .execute(&sqlite)
        .await;
        assert!(no_title.is_err());

        let no_date = sqlx::query("INSERT INTO entries (title, blog_id) VALUES ('t', 1)")
            .execute(&sqlite)
            .await;
        assert!(no_date.is_err());
    }

    #[tokio::test]
    async fn test_deleting_tag_removes_links() {
        let (_pool, sqlite) = migrated_pool().await;
        for sql in [
            "INSERT INTO blogs (id, name, handle) VALUES (1, 'blog', 'bl')",
            "INSERT INTO entries (id, title, date, blog_id) VALUES (1, 't', '1970-01-01T00:00:00+00:00', 1)",
            "INSERT INTO tags (id, name) VALUES (1, 'rust')",
            "INSERT INTO entry_tags (entry_id, tag_id) VALUES (1, 1)",
            "DELETE FROM tags WHERE id = 1",
        ] {
            sqlx::query(sql).execute(&sqlite).await.unwrap();
        }

        let links: i64 = sqlx::query("SELECT COUNT(*) FROM entry_tags")
            .fetch_one(&sqlite)
            .await
            .unwrap()
            .get(0);
        assert_eq!(links, 0);
    }

    #[test]
    fn test_mysql_filter_columns_compare_binary() {
        let columns = [
            ("create_blogs", "name VARCHAR(255)"),
            ("create_blogs", "handle VARCHAR(255)"),
            ("create_tags", "name VARCHAR(255)"),
            ("create_entries", "title VARCHAR(255)"),
        ];
        for (migration, column) in columns {
            let sql = MIGRATIONS
                .iter()
                .find(|m| m.name == migration)
                .map(|m| m.up_mysql)
                .unwrap();
            let line = sql.lines().find(|l| l.trim().starts_with(column)).unwrap();
            assert!(line.contains("COLLATE utf8mb4_bin"), "{}: {}", migration, line);
        }
    }

    #[test]
    fn test_truncate_sql_on_char_boundary() {
        let short = "SELECT 1";
        assert_eq!(truncate_sql(short), short);

        let sql = format!("SELECT '{}'", "é".repeat(120));
        let truncated = truncate_sql(&sql);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 103);
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);

        let sql_with_comments = "-- Comment\nCREATE TABLE a (id INT);";
        let statements = split_sql_statements(sql_with_comments);
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- This is a comment"));
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("CREATE TABLE test"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }
}
