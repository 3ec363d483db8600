use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::domain::{Note, NoteId, DEFAULT_NOTE_TITLE};

/// Persistence boundary for notes.
///
/// A lookup that matches nothing is `Ok(None)`; `Err` is reserved for store
/// faults such as a lost connection or a constraint violation.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// All notes, most recently updated first.
    async fn list_notes(&self) -> Result<Vec<Note>>;

    async fn find_note(&self, note_id: &NoteId) -> Result<Option<Note>>;

    /// Inserts a note with the default title and empty content.
    async fn create_note(&self) -> Result<Note>;

    /// Overwrites title and content in full and bumps `updated_at`.
    /// Returns `None` without writing when no note has `note_id`.
    async fn update_note(
        &self,
        note_id: &NoteId,
        title: &str,
        content: &str,
    ) -> Result<Option<Note>>;

    async fn health_check(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl NoteStore for Storage {
    async fn list_notes(&self) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT id, title, content, created_at, updated_at
             FROM notes
             ORDER BY updated_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(note_from_row).collect()
    }

    async fn find_note(&self, note_id: &NoteId) -> Result<Option<Note>> {
        let row = sqlx::query(
            "SELECT id, title, content, created_at, updated_at FROM notes WHERE id = ?",
        )
        .bind(note_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(note_from_row).transpose()
    }

    async fn create_note(&self) -> Result<Note> {
        let note_id = NoteId::generate();
        let now = Utc::now().timestamp_micros();
        let row = sqlx::query(
            "INSERT INTO notes (id, title, content, created_at, updated_at)
             VALUES (?, ?, '', ?, ?)
             RETURNING id, title, content, created_at, updated_at",
        )
        .bind(note_id.as_str())
        .bind(DEFAULT_NOTE_TITLE)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        debug!(note_id = %note_id, "inserted note");
        note_from_row(&row)
    }

    async fn update_note(
        &self,
        note_id: &NoteId,
        title: &str,
        content: &str,
    ) -> Result<Option<Note>> {
        let row = sqlx::query(
            "UPDATE notes SET title = ?, content = ?, updated_at = ?
             WHERE id = ?
             RETURNING id, title, content, created_at, updated_at",
        )
        .bind(title)
        .bind(content)
        .bind(Utc::now().timestamp_micros())
        .bind(note_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(note_from_row).transpose()
    }

    async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }
}

fn note_from_row(row: &SqliteRow) -> Result<Note> {
    Ok(Note {
        id: NoteId(row.try_get("id")?),
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        created_at: timestamp_from_micros(row.try_get("created_at")?)?,
        updated_at: timestamp_from_micros(row.try_get("updated_at")?)?,
    })
}

fn timestamp_from_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| anyhow!("stored timestamp {micros} is out of range"))
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
