use rusqlite::Connection;

use crate::error::{AppError, Result};

use super::contract::tables;

pub const DATABASE_NAME: &str = "xyzreader.db";
pub const DATABASE_VERSION: i64 = 1;

pub const CREATE_ITEMS: &str = r#"
CREATE TABLE items (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    server_id TEXT,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    body TEXT NOT NULL,
    thumb_url TEXT NOT NULL,
    photo_url TEXT NOT NULL,
    aspect_ratio REAL NOT NULL DEFAULT 1.5,
    published_date INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_items_published_date ON items(published_date DESC);
"#;

pub fn on_create(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_ITEMS)?;
    Ok(())
}

/// Drops the items table and creates it again. Every stored row is lost:
/// there is no migration chain, any version bump takes this path.
pub fn migrate_destructive(conn: &Connection, old_version: i64, new_version: i64) -> Result<()> {
    tracing::warn!(
        "Upgrading database from version {} to {}, existing items are discarded",
        old_version,
        new_version
    );
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", tables::ITEMS))?;
    on_create(conn)
}

pub fn user_version(conn: &Connection) -> Result<i64> {
    let version = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

/// Brings the schema to `version`, creating or wiping the table as needed.
pub fn open_helper(conn: &mut Connection, version: i64) -> Result<()> {
    let current = user_version(conn)?;
    if current == version {
        return Ok(());
    }
    if current > version {
        return Err(AppError::Schema(format!(
            "Cannot downgrade database from version {} to {}",
            current, version
        )));
    }

    let tx = conn.transaction()?;
    if current == 0 {
        on_create(&tx)?;
    } else {
        migrate_destructive(&tx, current, version)?;
    }
    tx.pragma_update(None, "user_version", version)?;
    tx.commit()?;
    Ok(())
}
