//! Durable card store on SQLite.
//!
//! One row per card. The optimistic version check happens inside a single
//! `UPDATE ... WHERE id = ? AND version = ?`, so two writers racing on the
//! same card can never both succeed.
//!
//! rusqlite is blocking, so every operation runs on tokio's blocking pool
//! with the connection moved in behind an `Arc<Mutex<_>>`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{CardStore, Result, StoreError, SwapOutcome};
use crate::flashcards::{Card, CardContent};

const DATE_FORMAT: &str = "%Y-%m-%d";

const CARD_COLUMNS: &str = "id, owner_id, collection_id, content, ease_factor, review_count, \
     next_review_date, last_reviewed_at, created_at, version";

/// Card store persisted in a SQLite database file
pub struct SqliteCardStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl SqliteCardStore {
    /// Open (or create) the store at the given path.
    pub fn open(db_path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        Self::init(conn, Some(db_path.to_path_buf()))
    }

    /// Private in-memory database, used by tests
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                collection_id TEXT NOT NULL,
                content TEXT NOT NULL,
                difficulty_level INTEGER NOT NULL DEFAULT 1,
                ease_factor REAL NOT NULL DEFAULT 2.5,
                review_count INTEGER NOT NULL DEFAULT 0,
                next_review_date TEXT NOT NULL,
                last_reviewed_at TEXT,
                created_at TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_cards_owner_due ON cards(owner_id, next_review_date);
            CREATE INDEX IF NOT EXISTS idx_cards_collection ON cards(owner_id, collection_id);
            "#,
        )?;

        log::debug!("Opened card store at {:?}", db_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {}", e)))?
    }
}

/// Raw column values of one `cards` row
struct CardRow {
    id: String,
    owner_id: String,
    collection_id: String,
    content: String,
    ease_factor: f64,
    review_count: i64,
    next_review_date: String,
    last_reviewed_at: Option<String>,
    created_at: String,
    version: i64,
}

impl CardRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            collection_id: row.get(2)?,
            content: row.get(3)?,
            ease_factor: row.get(4)?,
            review_count: row.get(5)?,
            next_review_date: row.get(6)?,
            last_reviewed_at: row.get(7)?,
            created_at: row.get(8)?,
            version: row.get(9)?,
        })
    }

    fn corrupt(&self, reason: impl Into<String>) -> StoreError {
        StoreError::Corrupt {
            id: self.id.clone(),
            reason: reason.into(),
        }
    }

    fn parse_uuid(&self, value: &str) -> Result<Uuid> {
        Uuid::parse_str(value).map_err(|e| self.corrupt(format!("bad uuid {}: {}", value, e)))
    }

    fn parse_timestamp(&self, value: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| self.corrupt(format!("bad timestamp {}: {}", value, e)))
    }

    fn into_card(self) -> Result<Card> {
        let content: CardContent = serde_json::from_str(&self.content)?;
        let next_review_date = NaiveDate::parse_from_str(&self.next_review_date, DATE_FORMAT)
            .map_err(|e| self.corrupt(format!("bad date {}: {}", self.next_review_date, e)))?;
        let last_reviewed_at = match &self.last_reviewed_at {
            Some(value) => Some(self.parse_timestamp(value)?),
            None => None,
        };
        let review_count = u32::try_from(self.review_count)
            .map_err(|_| self.corrupt(format!("negative review count {}", self.review_count)))?;
        let version = u64::try_from(self.version)
            .map_err(|_| self.corrupt(format!("negative version {}", self.version)))?;

        Ok(Card {
            id: self.parse_uuid(&self.id)?,
            owner_id: self.parse_uuid(&self.owner_id)?,
            collection_id: self.parse_uuid(&self.collection_id)?,
            created_at: self.parse_timestamp(&self.created_at)?,
            content,
            ease_factor: self.ease_factor,
            review_count,
            next_review_date,
            last_reviewed_at,
            version,
        })
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn collect_cards(rows: Vec<CardRow>) -> Result<Vec<Card>> {
    rows.into_iter().map(CardRow::into_card).collect()
}

#[async_trait]
impl CardStore for SqliteCardStore {
    async fn insert(&self, card: &Card) -> Result<()> {
        let content = serde_json::to_string(&card.content)?;
        let card = card.clone();

        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO cards (id, owner_id, collection_id, content, \
                 difficulty_level, ease_factor, review_count, next_review_date, \
                 last_reviewed_at, created_at, version) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    card.id.to_string(),
                    card.owner_id.to_string(),
                    card.collection_id.to_string(),
                    content,
                    card.difficulty_level(),
                    card.ease_factor,
                    card.review_count,
                    format_date(card.next_review_date),
                    card.last_reviewed_at.map(format_timestamp),
                    format_timestamp(card.created_at),
                    card.version as i64,
                ],
            )?;

            if inserted == 0 {
                return Err(StoreError::AlreadyExists(card.id));
            }
            Ok(())
        })
        .await
    }

    async fn get(&self, card_id: Uuid) -> Result<Card> {
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS),
                    params![card_id.to_string()],
                    CardRow::from_row,
                )
                .optional()?;

            match row {
                Some(row) => row.into_card(),
                None => Err(StoreError::NotFound(card_id)),
            }
        })
        .await
    }

    async fn compare_and_swap(
        &self,
        card_id: Uuid,
        expected_version: u64,
        card: &Card,
    ) -> Result<SwapOutcome> {
        let content = serde_json::to_string(&card.content)?;
        let new_version = expected_version + 1;
        let mut stored = card.clone();
        stored.id = card_id;
        stored.version = new_version;

        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE cards SET content = ?1, difficulty_level = ?2, ease_factor = ?3, \
                 review_count = ?4, next_review_date = ?5, last_reviewed_at = ?6, version = ?7 \
                 WHERE id = ?8 AND version = ?9",
                params![
                    content,
                    stored.difficulty_level(),
                    stored.ease_factor,
                    stored.review_count,
                    format_date(stored.next_review_date),
                    stored.last_reviewed_at.map(format_timestamp),
                    new_version as i64,
                    card_id.to_string(),
                    expected_version as i64,
                ],
            )?;

            if changed == 1 {
                return Ok(SwapOutcome::Swapped(stored));
            }

            // Nothing matched: either the version moved on or the row is gone
            let current: Option<i64> = conn
                .query_row(
                    "SELECT version FROM cards WHERE id = ?1",
                    params![card_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;

            match current {
                Some(version) => Ok(SwapOutcome::Conflict {
                    current_version: version.max(0) as u64,
                }),
                None => Err(StoreError::NotFound(card_id)),
            }
        })
        .await
    }

    async fn delete(&self, card_id: Uuid) -> Result<bool> {
        self.with_conn(move |conn| {
            let removed =
                conn.execute("DELETE FROM cards WHERE id = ?1", params![card_id.to_string()])?;
            Ok(removed > 0)
        })
        .await
    }

    async fn query_due(&self, owner_id: Uuid, today: NaiveDate, limit: usize) -> Result<Vec<Card>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM cards \
                 WHERE owner_id = ?1 AND next_review_date <= ?2 \
                 ORDER BY next_review_date ASC, difficulty_level DESC, ease_factor ASC, \
                 created_at ASC, id ASC \
                 LIMIT ?3",
                CARD_COLUMNS
            ))?;

            let rows = stmt
                .query_map(
                    params![owner_id.to_string(), format_date(today), limit as i64],
                    CardRow::from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            collect_cards(rows)
        })
        .await
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Card>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM cards WHERE owner_id = ?1",
                CARD_COLUMNS
            ))?;

            let rows = stmt
                .query_map(params![owner_id.to_string()], CardRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            collect_cards(rows)
        })
        .await
    }

    async fn list_by_collection(
        &self,
        owner_id: Uuid,
        collection_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Card>, usize)> {
        self.with_conn(move |conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM cards WHERE owner_id = ?1 AND collection_id = ?2",
                params![owner_id.to_string(), collection_id.to_string()],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM cards WHERE owner_id = ?1 AND collection_id = ?2 \
                 ORDER BY created_at DESC, id ASC LIMIT ?3 OFFSET ?4",
                CARD_COLUMNS
            ))?;

            let rows = stmt
                .query_map(
                    params![
                        owner_id.to_string(),
                        collection_id.to_string(),
                        limit as i64,
                        offset as i64
                    ],
                    CardRow::from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok((collect_cards(rows)?, total.max(0) as usize))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn new_card(owner_id: Uuid, due_offset: i64, difficulty: u8) -> Card {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap();
        let mut card = Card::new(
            owner_id,
            Uuid::new_v4(),
            CardContent::new("What is SM-2?", "A spaced repetition algorithm")
                .with_topic("Memory")
                .with_difficulty(difficulty),
            now,
        );
        card.next_review_date = today() + Duration::days(due_offset);
        card
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let mut card = new_card(Uuid::new_v4(), 0, 3);
        card.last_reviewed_at = Some(Utc.with_ymd_and_hms(2026, 5, 31, 7, 15, 0).unwrap());
        store.insert(&card).await.unwrap();

        let loaded = store.get(card.id).await.unwrap();
        assert_eq!(loaded, card);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        assert!(matches!(store.get(Uuid::new_v4()).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_compare_and_swap_detects_conflict() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let card = new_card(Uuid::new_v4(), 0, 1);
        store.insert(&card).await.unwrap();

        let mut first = card.clone();
        first.review_count = 1;
        first.ease_factor = 2.6;
        let outcome = store.compare_and_swap(card.id, card.version, &first).await.unwrap();
        assert!(matches!(outcome, SwapOutcome::Swapped(ref c) if c.version == 2));

        let mut second = card.clone();
        second.review_count = 1;
        second.ease_factor = 1.7;
        let outcome = store.compare_and_swap(card.id, card.version, &second).await.unwrap();
        assert_eq!(outcome, SwapOutcome::Conflict { current_version: 2 });

        let stored = store.get(card.id).await.unwrap();
        assert_eq!(stored.ease_factor, 2.6);
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_compare_and_swap_missing_row() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let card = new_card(Uuid::new_v4(), 0, 1);
        let result = store.compare_and_swap(card.id, 1, &card).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_query_due_order_matches_policy() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let overdue = new_card(owner, -2, 1);
        let today_easy = new_card(owner, 0, 1);
        let today_hard = new_card(owner, 0, 5);
        let future = new_card(owner, 1, 5);

        for card in [&future, &today_easy, &overdue, &today_hard] {
            store.insert(card).await.unwrap();
        }

        let due = store.query_due(owner, today(), 20).await.unwrap();
        let ids: Vec<_> = due.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![overdue.id, today_hard.id, today_easy.id]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("cards.db");
        let card = new_card(Uuid::new_v4(), 0, 2);

        {
            let store = SqliteCardStore::open(&path).unwrap();
            store.insert(&card).await.unwrap();
            assert!(!store.delete(Uuid::new_v4()).await.unwrap());
        }

        let reopened = SqliteCardStore::open(&path).unwrap();
        assert_eq!(reopened.db_path(), Some(path.as_path()));
        assert_eq!(reopened.get(card.id).await.unwrap(), card);
        assert_eq!(reopened.list_by_owner(card.owner_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_by_collection_pages() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let collection = Uuid::new_v4();
        let base = Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap();

        for i in 0..5 {
            let card = Card::new(
                owner,
                collection,
                CardContent::new(format!("q{}", i), "a"),
                base + Duration::minutes(i),
            );
            store.insert(&card).await.unwrap();
        }
        store.insert(&new_card(owner, 0, 1)).await.unwrap();

        let (page, total) = store.list_by_collection(owner, collection, 0, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].content.front, "q4");
        assert_eq!(page[1].content.front, "q3");

        let (middle, _) = store.list_by_collection(owner, collection, 2, 2).await.unwrap();
        let fronts: Vec<_> = middle.iter().map(|c| c.content.front.as_str()).collect();
        assert_eq!(fronts, vec!["q2", "q1"]);

        let (last, _) = store.list_by_collection(owner, collection, 4, 2).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].content.front, "q0");

        let (empty, total) = store
            .list_by_collection(Uuid::new_v4(), collection, 0, 2)
            .await
            .unwrap();
        assert!(empty.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_swaps_from_many_tasks() {
        let store = Arc::new(SqliteCardStore::open_in_memory().unwrap());
        let card = new_card(Uuid::new_v4(), 0, 1);
        store.insert(&card).await.unwrap();

        // Every task swaps against version 1; exactly one may win
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let mut update = card.clone();
                update.review_count = i + 1;
                tokio::spawn(async move { store.compare_and_swap(update.id, 1, &update).await })
            })
            .collect();

        let mut swapped = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                SwapOutcome::Swapped(_) => swapped += 1,
                SwapOutcome::Conflict { current_version } => assert_eq!(current_version, 2),
            }
        }
        assert_eq!(swapped, 1);
        assert_eq!(store.get(card.id).await.unwrap().version, 2);
    }
}
