use crate::error::StoreError;
use crate::models::{HistoryEntry, HistorySnapshot, Item, ItemId, Mode, TallyState, Vote};
use crate::store::VoteStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use sqlx::{migrate::MigrateDatabase, sqlite::{SqlitePool, SqlitePoolOptions}, Row, Sqlite};
use tokio::sync::Mutex;

const MODE_KEY: &str = "mode";

pub struct Database {
    pool: SqlitePool,
    // Every mutation takes this, so finalize_round's read-then-clear cannot
    // interleave with a vote from another request.
    write_lock: Mutex<()>,
}

impl Database {
    pub async fn connect(db_url: &str, item_count: u32, default_mode: Mode) -> Result<Self, StoreError> {
        let in_memory = db_url.contains(":memory:");

        // Create database if it doesn't exist
        if !in_memory && !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database at {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        // An in-memory database lives and dies with its one connection
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;
        Self::seed(&pool, item_count, default_mode).await?;

        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vote_items (
                id INTEGER PRIMARY KEY,
                label TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                user_id TEXT NOT NULL,
                item_id INTEGER NOT NULL,
                user_name TEXT NOT NULL,
                voted_at TEXT NOT NULL,
                PRIMARY KEY (user_id, item_id),
                FOREIGN KEY (item_id) REFERENCES vote_items(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vote_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL,
                result_data TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    // Fill an empty item table and record the starting mode. Existing data is
    // left untouched.
    async fn seed(pool: &SqlitePool, item_count: u32, default_mode: Mode) -> Result<(), StoreError> {
        let existing: i64 = sqlx::query("SELECT COUNT(*) AS n FROM vote_items")
            .fetch_one(pool)
            .await?
            .get("n");

        if existing == 0 {
            info!("Seeding {} vote items", item_count);
            for position in 1..=i64::from(item_count) {
                sqlx::query("INSERT INTO vote_items (id, label) VALUES (?, ?)")
                    .bind(position)
                    .bind(format!("Item {}", position))
                    .execute(pool)
                    .await?;
            }
        }

        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(MODE_KEY)
            .bind(default_mode.as_str())
            .execute(pool)
            .await?;

        Ok(())
    }

    async fn item_exists(&self, item_id: ItemId) -> Result<bool, StoreError> {
        Ok(sqlx::query("SELECT 1 FROM vote_items WHERE id = ?")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?
            .is_some())
    }

    async fn current_mode(&self) -> Result<Mode, StoreError> {
        let stored: Option<String> = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(MODE_KEY)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.get("value"));

        match stored {
            Some(value) => value.parse().map_err(StoreError::Invalid),
            None => {
                warn!("No mode stored, assuming {}", Mode::default());
                Ok(Mode::default())
            }
        }
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Invalid(format!("Failed to parse created_at: {}", e)))
}

#[async_trait]
impl VoteStore for Database {
    async fn fetch_state(&self) -> Result<TallyState, StoreError> {
        let items = sqlx::query(
            r#"
            SELECT i.id, i.label, COUNT(v.user_id) AS count
            FROM vote_items i
            LEFT JOIN votes v ON v.item_id = i.id
            GROUP BY i.id, i.label
            ORDER BY i.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| Item {
            id: row.get::<i64, _>("id"),
            label: row.get::<String, _>("label"),
            count: row.get::<i64, _>("count"),
        })
        .collect();

        let mode = self.current_mode().await?;

        Ok(TallyState { items, mode })
    }

    async fn cast_vote(&self, user_id: &str, item_id: ItemId, user_name: &str) -> Result<(), StoreError> {
        let user_name = user_name.trim();
        if user_id.trim().is_empty() {
            return Err(StoreError::Invalid("A user id is required to vote".to_string()));
        }
        if user_name.is_empty() {
            return Err(StoreError::Invalid("A name is required to vote".to_string()));
        }

        let _guard = self.write_lock.lock().await;

        if !self.item_exists(item_id).await? {
            return Err(StoreError::UnknownItem(item_id));
        }

        sqlx::query(
            r#"
            INSERT INTO votes (user_id, item_id, user_name, voted_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, item_id)
            DO UPDATE SET user_name = excluded.user_name
            "#,
        )
        .bind(user_id)
        .bind(item_id)
        .bind(user_name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn retract_vote(&self, user_id: &str, item_id: ItemId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        sqlx::query("DELETE FROM votes WHERE user_id = ? AND item_id = ?")
            .bind(user_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_mode(&self, mode: Mode) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO settings (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(MODE_KEY)
        .bind(mode.as_str())
        .execute(&mut *tx)
        .await?;

        let cleared = sqlx::query("DELETE FROM votes").execute(&mut *tx).await?;
        tx.commit().await?;

        info!("Mode set to {}, cleared {} vote(s)", mode, cleared.rows_affected());
        Ok(())
    }

    async fn reset_all(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let cleared = sqlx::query("DELETE FROM votes").execute(&self.pool).await?;
        info!("Reset cleared {} vote(s)", cleared.rows_affected());
        Ok(())
    }

    async fn relabel(&self, item_id: ItemId, label: &str) -> Result<(), StoreError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(StoreError::Invalid("Label must not be empty".to_string()));
        }

        let _guard = self.write_lock.lock().await;

        let updated = sqlx::query("UPDATE vote_items SET label = ? WHERE id = ?")
            .bind(label)
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::UnknownItem(item_id));
        }
        Ok(())
    }

    async fn finalize_round(&self) -> Result<HistorySnapshot, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let mut entries: Vec<(ItemId, HistoryEntry)> = sqlx::query("SELECT id, label FROM vote_items ORDER BY id")
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|row| {
                (
                    row.get::<i64, _>("id"),
                    HistoryEntry {
                        label: row.get::<String, _>("label"),
                        count: 0,
                        voters: Vec::new(),
                    },
                )
            })
            .collect();

        let votes: Vec<Vote> = sqlx::query("SELECT user_id, item_id, user_name FROM votes ORDER BY rowid")
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|row| Vote {
                user_id: row.get("user_id"),
                item_id: row.get("item_id"),
                user_name: row.get("user_name"),
            })
            .collect();

        for vote in votes {
            if let Some((_, entry)) = entries.iter_mut().find(|(id, _)| *id == vote.item_id) {
                entry.count += 1;
                entry.voters.push(vote.user_name);
            }
        }

        let mut result_data: Vec<HistoryEntry> = entries.into_iter().map(|(_, entry)| entry).collect();
        result_data.sort_by(|a, b| b.count.cmp(&a.count));

        let created_at = Utc::now();
        let inserted = sqlx::query("INSERT INTO vote_history (created_at, result_data) VALUES (?, ?)")
            .bind(created_at.to_rfc3339())
            .bind(serde_json::to_string(&result_data)?)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM votes").execute(&mut *tx).await?;
        tx.commit().await?;

        let snapshot = HistorySnapshot {
            id: inserted.last_insert_rowid(),
            created_at,
            result_data,
        };
        info!(
            "Finalized round into history #{} ({} vote(s))",
            snapshot.id,
            snapshot.total_votes()
        );
        Ok(snapshot)
    }

    async fn list_history(&self) -> Result<Vec<HistorySnapshot>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, created_at, result_data
            FROM vote_history
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(HistorySnapshot {
                    id: row.get::<i64, _>("id"),
                    created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
                    result_data: serde_json::from_str(&row.get::<String, _>("result_data"))?,
                })
            })
            .collect()
    }

    async fn delete_history(&self, id: i64) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let deleted = sqlx::query("DELETE FROM vote_history WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            warn!("History entry {} was already gone", id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db(items: u32, mode: Mode) -> Database {
        Database::connect("sqlite::memory:", items, mode).await.unwrap()
    }

    fn counts(state: &TallyState) -> Vec<i64> {
        state.items.iter().map(|item| item.count).collect()
    }

    #[tokio::test]
    async fn seeds_items_and_mode() {
        let db = memory_db(9, Mode::Single).await;
        let state = db.fetch_state().await.unwrap();

        assert_eq!(state.items.len(), 9);
        assert_eq!(state.items[0].label, "Item 1");
        assert_eq!(state.items[8].id, 9);
        assert_eq!(state.mode, Mode::Single);
        assert_eq!(state.total_votes(), 0);
    }

    #[tokio::test]
    async fn vote_is_an_upsert() {
        let db = memory_db(2, Mode::Multiple).await;

        db.cast_vote("u1", 1, "Kim").await.unwrap();
        db.cast_vote("u1", 1, "Kimberly").await.unwrap();
        db.cast_vote("u2", 1, "Lee").await.unwrap();

        let state = db.fetch_state().await.unwrap();
        assert_eq!(counts(&state), vec![2, 0]);

        let snapshot = db.finalize_round().await.unwrap();
        assert_eq!(snapshot.result_data[0].voters, vec!["Kimberly", "Lee"]);
    }

    #[tokio::test]
    async fn retract_is_idempotent() {
        let db = memory_db(2, Mode::Multiple).await;

        db.retract_vote("u1", 2).await.unwrap();
        db.cast_vote("u1", 2, "Kim").await.unwrap();
        db.retract_vote("u1", 2).await.unwrap();
        db.retract_vote("u1", 2).await.unwrap();

        assert_eq!(db.fetch_state().await.unwrap().total_votes(), 0);
    }

    #[tokio::test]
    async fn vote_rejects_unknown_item_and_blank_name() {
        let db = memory_db(2, Mode::Multiple).await;

        assert!(matches!(db.cast_vote("u1", 42, "Kim").await, Err(StoreError::UnknownItem(42))));
        assert!(matches!(db.cast_vote("u1", 1, "   ").await, Err(StoreError::Invalid(_))));
        assert_eq!(db.fetch_state().await.unwrap().total_votes(), 0);
    }

    #[tokio::test]
    async fn changing_mode_clears_votes() {
        let db = memory_db(3, Mode::Single).await;
        db.cast_vote("u1", 1, "Kim").await.unwrap();
        db.cast_vote("u2", 3, "Lee").await.unwrap();

        db.set_mode(Mode::Multiple).await.unwrap();

        let state = db.fetch_state().await.unwrap();
        assert_eq!(state.mode, Mode::Multiple);
        assert_eq!(counts(&state), vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn reset_keeps_labels() {
        let db = memory_db(2, Mode::Multiple).await;
        db.relabel(1, "Pizza").await.unwrap();
        db.cast_vote("u1", 1, "Kim").await.unwrap();

        db.reset_all().await.unwrap();

        let state = db.fetch_state().await.unwrap();
        assert_eq!(state.items[0].label, "Pizza");
        assert_eq!(state.total_votes(), 0);
    }

    #[tokio::test]
    async fn relabel_validates_input() {
        let db = memory_db(2, Mode::Multiple).await;

        assert!(matches!(db.relabel(7, "Soup").await, Err(StoreError::UnknownItem(7))));
        assert!(matches!(db.relabel(1, "  ").await, Err(StoreError::Invalid(_))));

        db.relabel(2, "  Soup ").await.unwrap();
        assert_eq!(db.fetch_state().await.unwrap().items[1].label, "Soup");
    }

    #[tokio::test]
    async fn finalize_sorts_by_count_and_clears_votes() {
        let db = memory_db(3, Mode::Multiple).await;
        db.relabel(1, "A").await.unwrap();
        db.relabel(2, "B").await.unwrap();
        db.relabel(3, "C").await.unwrap();

        // B gets one vote, A gets three
        db.cast_vote("u4", 2, "Dana").await.unwrap();
        db.cast_vote("u1", 1, "Kim").await.unwrap();
        db.cast_vote("u2", 1, "Lee").await.unwrap();
        db.cast_vote("u3", 1, "Max").await.unwrap();

        let snapshot = db.finalize_round().await.unwrap();

        let summary: Vec<(&str, i64)> = snapshot
            .result_data
            .iter()
            .map(|entry| (entry.label.as_str(), entry.count))
            .collect();
        assert_eq!(summary, vec![("A", 3), ("B", 1), ("C", 0)]);
        assert_eq!(snapshot.total_votes(), 4);
        assert_eq!(snapshot.result_data[0].voters, vec!["Kim", "Lee", "Max"]);
        assert!(snapshot.result_data[2].voters.is_empty());

        let state = db.fetch_state().await.unwrap();
        assert_eq!(counts(&state), vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn history_survives_later_votes_and_can_be_deleted() {
        let db = memory_db(2, Mode::Multiple).await;
        db.cast_vote("u1", 1, "Kim").await.unwrap();
        let first = db.finalize_round().await.unwrap();

        db.cast_vote("u1", 2, "Kim").await.unwrap();
        let second = db.finalize_round().await.unwrap();

        let history = db.list_history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1], first);

        db.delete_history(first.id).await.unwrap();
        db.delete_history(first.id).await.unwrap();

        let history = db.list_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, second.id);
    }
}
