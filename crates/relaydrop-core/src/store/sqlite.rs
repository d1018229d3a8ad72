//! SQLite-backed job table (sqlx). `save` replaces every row in one transaction.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

use crate::job::{Job, JobStatus};

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&uri)
            .await?;
        let store = SqliteStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    #[cfg(test)]
    pub(crate) async fn open_memory() -> Result<Self> {
        // Single connection: each in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = SqliteStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        // `seq` preserves submission order across full rewrites.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                seq INTEGER NOT NULL,
                source_url TEXT NOT NULL,
                status TEXT NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                result_link TEXT,
                error TEXT,
                created_at INTEGER NOT NULL,
                notify_email TEXT,
                file_name TEXT NOT NULL DEFAULT ''
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Rows that fail to decode make the whole load come back empty (logged).
    pub async fn load(&self) -> Result<Vec<Job>> {
        let rows = sqlx::query(
            r#"
            SELECT id, source_url, status, progress, result_link, error,
                   created_at, notify_email, file_name
            FROM jobs
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match decode_row(&row) {
                Ok(job) => out.push(job),
                Err(e) => {
                    tracing::warn!("ignoring malformed job table: {}", e);
                    return Ok(Vec::new());
                }
            }
        }
        Ok(out)
    }

    pub async fn save(&self, jobs: &[Job]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM jobs").execute(&mut *tx).await?;
        for (seq, job) in jobs.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO jobs (
                    id, seq, source_url, status, progress, result_link,
                    error, created_at, notify_email, file_name
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&job.id)
            .bind(seq as i64)
            .bind(&job.source_url)
            .bind(job.status.as_str())
            .bind(i64::from(job.progress))
            .bind(&job.result_link)
            .bind(&job.error)
            .bind(job.created_at)
            .bind(&job.notify_email)
            .bind(&job.file_name)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn decode_row(row: &sqlx::sqlite::SqliteRow) -> Result<Job, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let progress: i64 = row.try_get("progress")?;
    Ok(Job {
        id: row.try_get("id")?,
        source_url: row.try_get("source_url")?,
        status: JobStatus::parse(&status),
        progress: progress.clamp(0, 100) as u8,
        result_link: row.try_get("result_link")?,
        error: row.try_get("error")?,
        created_at: row.try_get("created_at")?,
        notify_email: row.try_get("notify_email")?,
        file_name: row.try_get("file_name")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_table_loads_empty() {
        let store = SqliteStore::open_memory().await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_replaces_all_rows_in_order() {
        let store = SqliteStore::open_memory().await.unwrap();
        let a = Job::new("http://example.com/a", Some("me@example.com".into()));
        let mut b = Job::new("http://example.com/b", None);
        b.begin_download();
        b.set_progress(42);
        store.save(&[a.clone(), b.clone()]).await.unwrap();
        assert_eq!(store.load().await.unwrap(), vec![a.clone(), b.clone()]);

        store.save(&[b.clone()]).await.unwrap();
        assert_eq!(store.load().await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state dir").join("jobs.db");
        let store = SqliteStore::open_at(&path).await.unwrap();
        store
            .save(&[Job::new("http://example.com/x", None)])
            .await
            .unwrap();
        assert!(path.exists());
        let reopened = SqliteStore::open_at(&path).await.unwrap();
        assert_eq!(reopened.load().await.unwrap().len(), 1);
    }
}
