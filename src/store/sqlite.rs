//! SQLite-based store implementation.

use super::{DialogContext, DialogStore, ManifestStore, UpsertResult};
use crate::dialogue::{DialogueLine, MediaItem};
use crate::error::{EarshotError, Result};
use crate::search::DialogDocument;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS manifest (
        source_path TEXT PRIMARY KEY,
        source_mod_time TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS dialog (
        id TEXT PRIMARY KEY,
        media_id TEXT NOT NULL,
        pos INTEGER NOT NULL,
        start_timestamp INTEGER NOT NULL,
        end_timestamp INTEGER NOT NULL,
        content TEXT NOT NULL,
        media_file_name TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_dialog_media_pos ON dialog(media_id, pos);
"#;

const LINE_COLUMNS: &str = "pos, start_timestamp, end_timestamp, content, media_file_name";

/// SQLite-backed manifest and dialogue store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| EarshotError::Storage(format!("Failed to acquire lock: {}", e)))
    }

    /// Total number of stored dialogue lines.
    pub fn dialog_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM dialog", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Media IDs with their line counts, sorted by media ID.
    pub fn list_media(&self) -> Result<Vec<(String, usize)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT media_id, COUNT(*) FROM dialog GROUP BY media_id ORDER BY media_id",
        )?;
        let rows = stmt.query_map([], |row| {
            let count: i64 = row.get(1)?;
            Ok((row.get(0)?, count as usize))
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn format_mod_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_mod_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn millis_to_duration(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}

fn line_from_row(row: &Row<'_>) -> rusqlite::Result<DialogueLine> {
    Ok(DialogueLine {
        pos: row.get(0)?,
        start_timestamp: millis_to_duration(row.get(1)?),
        end_timestamp: millis_to_duration(row.get(2)?),
        content: row.get(3)?,
        media_file_name: row.get(4)?,
    })
}

#[async_trait]
impl ManifestStore for SqliteStore {
    #[instrument(skip(self))]
    async fn manifest_add(&self, source_path: &Path, mod_time: DateTime<Utc>) -> Result<UpsertResult> {
        let conn = self.lock()?;
        let key = source_path.to_string_lossy().into_owned();

        let previous: Option<String> = conn
            .query_row(
                "SELECT source_mod_time FROM manifest WHERE source_path = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        let previous = previous.and_then(|s| parse_mod_time(&s));

        if previous == Some(mod_time) {
            return Ok(UpsertResult::Noop);
        }

        conn.execute(
            "INSERT OR REPLACE INTO manifest (source_path, source_mod_time) VALUES (?1, ?2)",
            params![key, format_mod_time(mod_time)],
        )?;

        let result = match previous {
            Some(prev) if mod_time > prev => UpsertResult::Updated,
            _ => UpsertResult::Created,
        };
        debug!("Manifest {:?} for {}", result, key);
        Ok(result)
    }

    async fn get_manifest(&self) -> Result<HashMap<PathBuf, DateTime<Utc>>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT source_path, source_mod_time FROM manifest")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut manifest = HashMap::new();
        for row in rows {
            let (path, raw) = row?;
            match parse_mod_time(&raw) {
                Some(t) => {
                    manifest.insert(PathBuf::from(path), t);
                }
                None => warn!("Ignoring manifest entry {} with bad time '{}'", path, raw),
            }
        }
        Ok(manifest)
    }
}

#[async_trait]
impl DialogStore for SqliteStore {
    #[instrument(skip(self, item), fields(media_id = %item.media_id()))]
    async fn import_media(&self, item: &MediaItem) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let media_id = item.media_id();

        let removed = tx.execute("DELETE FROM dialog WHERE media_id = ?1", params![media_id])?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO dialog
                (id, media_id, pos, start_timestamp, end_timestamp, content, media_file_name)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;

            for line in &item.dialogue {
                let doc = DialogDocument::from_line(&item.info, line);
                stmt.execute(params![
                    doc.id,
                    doc.media_id,
                    doc.pos,
                    doc.start_timestamp,
                    doc.end_timestamp,
                    doc.content,
                    doc.media_file_name,
                ])?;
            }
        }

        tx.commit()?;
        info!(
            "Stored {} lines for {} (replaced {})",
            item.dialogue.len(),
            media_id,
            removed
        );
        Ok(item.dialogue.len())
    }

    async fn get_dialog_range(&self, media_id: &str, start: i32, end: i32) -> Result<Vec<DialogueLine>> {
        if start > end {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM dialog WHERE media_id = ?1 AND pos BETWEEN ?2 AND ?3 ORDER BY pos",
            LINE_COLUMNS
        ))?;
        let lines = stmt
            .query_map(params![media_id, start, end], line_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Range {}..={} of {} has {} lines", start, end, media_id, lines.len());
        Ok(lines)
    }

    async fn get_dialog_context(&self, media_id: &str, start: i32, end: i32) -> Result<DialogContext> {
        let conn = self.lock()?;

        let before = conn
            .query_row(
                &format!(
                    "SELECT {} FROM dialog WHERE media_id = ?1 AND pos < ?2 ORDER BY pos DESC LIMIT 1",
                    LINE_COLUMNS
                ),
                params![media_id, start],
                line_from_row,
            )
            .optional()?;

        let after = conn
            .query_row(
                &format!(
                    "SELECT {} FROM dialog WHERE media_id = ?1 AND pos > ?2 ORDER BY pos ASC LIMIT 1",
                    LINE_COLUMNS
                ),
                params![media_id, end],
                line_from_row,
            )
            .optional()?;

        Ok(DialogContext {
            before: before.into_iter().collect(),
            after: after.into_iter().collect(),
        })
    }

    async fn media_line_count(&self, media_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM dialog WHERE media_id = ?1",
            params![media_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::MediaInfo;

    fn episode(media: &str, lines: usize) -> MediaItem {
        let info = MediaInfo::new(media, 1, 1, &format!("{}-S01E01.mp3", media));
        let dialogue = (0..lines)
            .map(|i| DialogueLine {
                pos: i as i32,
                start_timestamp: Duration::from_millis(i as u64 * 1000),
                end_timestamp: Duration::from_millis(i as u64 * 1000 + 900),
                content: format!("line {}", i),
                media_file_name: info.media_file_name.clone(),
            })
            .collect();
        MediaItem::new(info, dialogue)
    }

    fn time(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_manifest_add() {
        let store = SqliteStore::in_memory().unwrap();
        let path = Path::new("/media/ep-S01E01.srt");
        let t1 = time("2024-01-01T10:00:00.123456789Z");
        let t2 = time("2024-02-01T10:00:00Z");

        assert_eq!(store.manifest_add(path, t1).await.unwrap(), UpsertResult::Created);
        assert_eq!(store.manifest_add(path, t1).await.unwrap(), UpsertResult::Noop);
        assert_eq!(store.manifest_add(path, t2).await.unwrap(), UpsertResult::Updated);
        // Going backwards still persists, but is not an update.
        assert_eq!(store.manifest_add(path, t1).await.unwrap(), UpsertResult::Created);

        let manifest = store.get_manifest().await.unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[Path::new("/media/ep-S01E01.srt")], t1);
    }

    #[tokio::test]
    async fn test_manifest_noop_leaves_state_unchanged() {
        let store = SqliteStore::in_memory().unwrap();
        let path = Path::new("a.srt");
        let t = time("2024-01-01T00:00:00Z");
        store.manifest_add(path, t).await.unwrap();
        let before = store.get_manifest().await.unwrap();

        assert_eq!(store.manifest_add(path, t).await.unwrap(), UpsertResult::Noop);
        assert_eq!(store.get_manifest().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_dialog_range_and_context() {
        let store = SqliteStore::in_memory().unwrap();
        store.import_media(&episode("ep", 10)).await.unwrap();
        let media_id = "ep-S01E01";

        let one = store.get_dialog_range(media_id, 2, 2).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].pos, 2);
        assert_eq!(one[0].start_timestamp, Duration::from_millis(2000));

        let ctx = store.get_dialog_context(media_id, 2, 4).await.unwrap();
        assert_eq!(ctx.before.iter().map(|l| l.pos).collect::<Vec<_>>(), vec![1]);
        assert_eq!(ctx.after.iter().map(|l| l.pos).collect::<Vec<_>>(), vec![5]);

        let edges = store.get_dialog_context(media_id, 0, 9).await.unwrap();
        assert_eq!(edges, DialogContext::default());

        assert!(store.get_dialog_range(media_id, 5, 3).await.unwrap().is_empty());
        assert!(store.get_dialog_range("missing", 0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reimport_replaces_lines() {
        let store = SqliteStore::in_memory().unwrap();
        store.import_media(&episode("ep", 10)).await.unwrap();
        store.import_media(&episode("other", 3)).await.unwrap();

        let mut edited = episode("ep", 4);
        edited.dialogue[3].content = "edited".to_string();
        store.import_media(&edited).await.unwrap();

        assert_eq!(store.media_line_count("ep-S01E01").await.unwrap(), 4);
        assert_eq!(store.media_line_count("other-S01E01").await.unwrap(), 3);
        let line = store.get_dialog_range("ep-S01E01", 3, 3).await.unwrap();
        assert_eq!(line[0].content, "edited");
        assert_eq!(
            store.list_media().unwrap(),
            vec![("ep-S01E01".to_string(), 4), ("other-S01E01".to_string(), 3)]
        );
        assert_eq!(store.dialog_count().unwrap(), 7);
    }

    #[tokio::test]
    async fn test_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dialog.db");
        {
            let store = SqliteStore::new(&path).unwrap();
            store.import_media(&episode("ep", 2)).await.unwrap();
        }
        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.media_line_count("ep-S01E01").await.unwrap(), 2);
    }
}
