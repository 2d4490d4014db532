//! SQLite story store: dedup by id, sent bookkeeping and aggregate stats.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::models::Story;

pub const DEFAULT_DATABASE_PATH: &str = "data/stories.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS stories (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    source TEXT NOT NULL,
    source_url TEXT NOT NULL,
    published_date TEXT NOT NULL,
    collected_date TEXT NOT NULL,
    category TEXT,
    impact_score REAL,
    summary TEXT,
    tags TEXT,
    is_processed INTEGER DEFAULT 0,
    is_sent INTEGER DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_impact_sent ON stories(impact_score, is_sent);
CREATE INDEX IF NOT EXISTS idx_collected_date ON stories(collected_date DESC);
";

/// Aggregate counters reported after every cycle and on `GET /stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryStats {
    pub total_stories: u64,
    pub sent_alerts: u64,
    pub pending_alerts: u64,
    /// Mean of scores above zero, two decimals.
    pub avg_impact: f64,
}

#[derive(Clone)]
pub struct StoryDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl StoryDatabase {
    /// Open (or create) the database file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating db directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening story db at {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory story db")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).context("creating story schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against this database on the blocking pool. Async callers go
    /// through here; rusqlite never runs on a runtime worker.
    pub async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&StoryDatabase) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .context("story db task failed")?
    }

    /// Insert a story unless its id is already known. Returns true if inserted.
    pub fn save_story(&self, story: &Story) -> Result<bool> {
        let id = story
            .id
            .as_deref()
            .context("cannot save a story without an id")?;
        let tags = story
            .tags
            .as_ref()
            .filter(|t| !t.is_empty())
            .map(serde_json::to_string)
            .transpose()
            .context("encoding tags")?;

        let conn = self.conn.lock();
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO stories (
                    id, title, description, source, source_url,
                    published_date, collected_date, category, impact_score,
                    summary, tags, is_processed, is_sent
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    id,
                    story.title,
                    story.description,
                    story.source,
                    story.source_url,
                    story.published_date.to_rfc3339(),
                    story.collected_date.to_rfc3339(),
                    story.category,
                    story.impact_score,
                    story.summary,
                    tags,
                    story.is_processed,
                    story.is_sent,
                ],
            )
            .with_context(|| format!("inserting story {id}"))?;
        Ok(inserted == 1)
    }

    /// Save a batch; returns how many were new.
    pub fn save_stories(&self, stories: &[Story]) -> Result<usize> {
        let mut new_count = 0;
        for story in stories {
            if self.save_story(story)? {
                new_count += 1;
            }
        }
        Ok(new_count)
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let found = conn
            .query_row("SELECT 1 FROM stories WHERE id = ?1", params![id], |_| Ok(()))
            .optional()
            .context("looking up story id")?;
        Ok(found.is_some())
    }

    pub fn mark_as_sent(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("UPDATE stories SET is_sent = 1 WHERE id = ?1", params![id])
            .with_context(|| format!("marking story {id} as sent"))?;
        Ok(())
    }

    pub fn get_story(&self, id: &str) -> Result<Option<Story>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, title, description, source, source_url, published_date,
                    collected_date, category, impact_score, summary, tags,
                    is_processed, is_sent
             FROM stories WHERE id = ?1",
            params![id],
            row_to_story,
        )
        .optional()
        .with_context(|| format!("loading story {id}"))
    }

    pub fn stats(&self) -> Result<StoryStats> {
        let conn = self.conn.lock();
        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM stories", [], |r| r.get(0))
            .context("counting stories")?;
        let sent: i64 = conn
            .query_row("SELECT COUNT(*) FROM stories WHERE is_sent = 1", [], |r| {
                r.get(0)
            })
            .context("counting sent stories")?;
        let avg: Option<f64> = conn
            .query_row(
                "SELECT AVG(impact_score) FROM stories WHERE impact_score > 0",
                [],
                |r| r.get(0),
            )
            .context("averaging impact")?;

        let total = total.max(0) as u64;
        let sent = sent.max(0) as u64;
        Ok(StoryStats {
            total_stories: total,
            sent_alerts: sent,
            pending_alerts: total.saturating_sub(sent),
            avg_impact: (avg.unwrap_or(0.0) * 100.0).round() / 100.0,
        })
    }
}

fn parse_ts(raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_story(row: &rusqlite::Row<'_>) -> rusqlite::Result<Story> {
    let tags: Option<String> = row.get(10)?;
    Ok(Story {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        source: row.get(3)?,
        source_url: row.get(4)?,
        published_date: parse_ts(row.get(5)?)?,
        collected_date: parse_ts(row.get(6)?)?,
        category: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        impact_score: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
        summary: row.get(9)?,
        tags: tags.and_then(|t| serde_json::from_str(&t).ok()),
        is_processed: row.get(11)?,
        is_sent: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(id: &str, score: f64) -> Story {
        let mut s = Story::new(id, "Title", "Desc", "Src", "https://x", Utc::now());
        s.impact_score = score;
        s.is_processed = true;
        s
    }

    #[test]
    fn duplicate_ids_are_ignored() {
        let db = StoryDatabase::open_in_memory().unwrap();
        assert!(db.save_story(&story("a", 6.0)).unwrap());
        assert!(!db.save_story(&story("a", 9.0)).unwrap());
        assert_eq!(db.get_story("a").unwrap().unwrap().impact_score, 6.0);
    }

    #[test]
    fn stats_average_ignores_zero_scores() {
        let db = StoryDatabase::open_in_memory().unwrap();
        let n = db
            .save_stories(&[story("a", 6.0), story("b", 7.5), story("c", 0.0)])
            .unwrap();
        assert_eq!(n, 3);
        db.mark_as_sent("a").unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_stories, 3);
        assert_eq!(stats.sent_alerts, 1);
        assert_eq!(stats.pending_alerts, 2);
        assert_eq!(stats.avg_impact, 6.75);
    }

    #[tokio::test]
    async fn blocking_work_leaves_the_runtime_thread() {
        let db = StoryDatabase::open_in_memory().unwrap();
        let runtime_thread = std::thread::current().id();

        let (worker, inserted) = db
            .blocking(|db| {
                let inserted = db.save_story(&story("a", 6.0))?;
                Ok((std::thread::current().id(), inserted))
            })
            .await
            .unwrap();

        assert_ne!(worker, runtime_thread);
        assert!(inserted);
        assert!(db.contains("a").unwrap());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn other_tasks_progress_while_db_is_busy() {
        let db = StoryDatabase::open_in_memory().unwrap();
        let ticks = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let counter = ticks.clone();
        let ticker = tokio::spawn(async move {
            for _ in 0..5 {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        });

        db.blocking(|db| {
            std::thread::sleep(std::time::Duration::from_millis(300));
            db.stats()
        })
        .await
        .unwrap();

        // the single runtime thread kept polling the ticker meanwhile
        assert_eq!(ticks.load(std::sync::atomic::Ordering::SeqCst), 5);
        ticker.await.unwrap();
    }

    #[test]
    fn story_without_id_is_rejected() {
        let db = StoryDatabase::open_in_memory().unwrap();
        let mut s = story("a", 6.0);
        s.id = None;
        assert!(db.save_story(&s).is_err());
    }
}
