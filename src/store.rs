//! SQLite-backed storage for per-chat grocery lists.
//!
//! Every public operation runs inside its own transaction: it commits when the
//! closure returns `Ok` and rolls back when the transaction is dropped early.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database lock poisoned")]
    Poisoned,
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

/// One entry of a chat's list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ListItem {
    pub(crate) id: i64,
    pub(crate) chat_id: i64,
    pub(crate) name: String,
    pub(crate) completed: bool,
    pub(crate) created_at: DateTime<Utc>,
}

impl ListItem {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ListItem {
            id: row.get(0)?,
            chat_id: row.get(1)?,
            name: row.get(2)?,
            completed: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AddOutcome {
    Added(i64),
    AlreadyExists,
    EmptyName,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ToggleOutcome {
    Toggled(bool),
    NotFound,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RemoveOutcome {
    Removed(String),
    NotFound,
}

pub(crate) struct ItemStore {
    conn: Mutex<Connection>,
}

impl ItemStore {
    /// Open (or create) the database file and bootstrap the schema.
    pub(crate) fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        let store = ItemStore {
            conn: Mutex::new(conn),
        };
        store.with_tx(init_schema)?;
        Ok(store)
    }

    /// Run raw SQL against the connection, outside any store operation.
    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> StoreResult<()> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn with_tx<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Add one item unless a case-insensitive match already exists in the chat.
    pub(crate) fn add(&self, chat_id: i64, name: &str) -> StoreResult<AddOutcome> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(AddOutcome::EmptyName);
        }
        let key = name_key(name);
        self.with_tx(|tx| {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM grocery_items WHERE chat_id = ?1 AND name_key = ?2",
                    params![chat_id, key],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Ok(AddOutcome::AlreadyExists);
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO grocery_items (chat_id, item, name_key, completed, added_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![chat_id, name, key, Utc::now()],
            )?;
            if inserted == 0 {
                return Ok(AddOutcome::AlreadyExists);
            }
            Ok(AddOutcome::Added(tx.last_insert_rowid()))
        })
    }

    /// Add names one at a time in order. Returns `(added, existing)`.
    ///
    /// Each name is its own transaction, so a repeated name later in the batch
    /// collides with the copy inserted earlier and counts as existing. Blank
    /// names count as neither.
    pub(crate) fn add_many<S: AsRef<str>>(
        &self,
        chat_id: i64,
        names: &[S],
    ) -> StoreResult<(usize, usize)> {
        let mut added = 0;
        let mut existing = 0;
        for name in names {
            match self.add(chat_id, name.as_ref())? {
                AddOutcome::Added(_) => added += 1,
                AddOutcome::AlreadyExists => existing += 1,
                AddOutcome::EmptyName => {}
            }
        }
        Ok((added, existing))
    }

    pub(crate) fn list(&self, chat_id: i64) -> StoreResult<Vec<ListItem>> {
        self.with_tx(|tx| {
            let mut stmt = tx.prepare(
                "SELECT id, chat_id, item, completed, added_at
                 FROM grocery_items WHERE chat_id = ?1 ORDER BY id",
            )?;
            let items = stmt
                .query_map(params![chat_id], ListItem::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })
    }

    pub(crate) fn count(&self, chat_id: i64) -> StoreResult<usize> {
        self.with_tx(|tx| {
            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM grocery_items WHERE chat_id = ?1",
                params![chat_id],
                |row| row.get(0),
            )?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
    }

    pub(crate) fn toggle_completed(&self, chat_id: i64, id: i64) -> StoreResult<ToggleOutcome> {
        self.with_tx(|tx| {
            let current: Option<bool> = tx
                .query_row(
                    "SELECT completed FROM grocery_items WHERE chat_id = ?1 AND id = ?2",
                    params![chat_id, id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(current) = current else {
                return Ok(ToggleOutcome::NotFound);
            };

            let completed = !current;
            tx.execute(
                "UPDATE grocery_items SET completed = ?1 WHERE chat_id = ?2 AND id = ?3",
                params![completed, chat_id, id],
            )?;
            Ok(ToggleOutcome::Toggled(completed))
        })
    }

    pub(crate) fn remove(&self, chat_id: i64, id: i64) -> StoreResult<RemoveOutcome> {
        self.with_tx(|tx| {
            let name: Option<String> = tx
                .query_row(
                    "SELECT item FROM grocery_items WHERE chat_id = ?1 AND id = ?2",
                    params![chat_id, id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(name) = name else {
                return Ok(RemoveOutcome::NotFound);
            };

            tx.execute(
                "DELETE FROM grocery_items WHERE chat_id = ?1 AND id = ?2",
                params![chat_id, id],
            )?;
            Ok(RemoveOutcome::Removed(name))
        })
    }

    /// Delete every item of the chat and return how many were removed.
    pub(crate) fn clear(&self, chat_id: i64) -> StoreResult<usize> {
        self.with_tx(|tx| {
            let removed = tx.execute(
                "DELETE FROM grocery_items WHERE chat_id = ?1",
                params![chat_id],
            )?;
            Ok(removed)
        })
    }
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn init_schema(tx: &Transaction<'_>) -> StoreResult<()> {
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS grocery_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id INTEGER NOT NULL,
            item TEXT NOT NULL,
            name_key TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            added_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );",
    )?;

    // Databases written by older releases lack one or both of these columns.
    let columns = table_columns(tx)?;
    if !columns.iter().any(|c| c == "completed") {
        info!("adding completed column to grocery_items");
        tx.execute(
            "ALTER TABLE grocery_items ADD COLUMN completed INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }
    if !columns.iter().any(|c| c == "name_key") {
        info!("adding name_key column to grocery_items");
        tx.execute("ALTER TABLE grocery_items ADD COLUMN name_key TEXT", [])?;
        backfill_name_keys(tx)?;
        collapse_duplicate_names(tx)?;
    }

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_chat_id ON grocery_items(chat_id);
         CREATE UNIQUE INDEX IF NOT EXISTS idx_chat_name_key
             ON grocery_items(chat_id, name_key);",
    )?;
    Ok(())
}

fn table_columns(tx: &Transaction<'_>) -> StoreResult<Vec<String>> {
    let mut stmt = tx.prepare("PRAGMA table_info(grocery_items)")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

fn backfill_name_keys(tx: &Transaction<'_>) -> StoreResult<()> {
    let rows: Vec<(i64, String)> = {
        let mut stmt = tx.prepare("SELECT id, item FROM grocery_items WHERE name_key IS NULL")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };
    for (id, item) in rows {
        tx.execute(
            "UPDATE grocery_items SET name_key = ?1 WHERE id = ?2",
            params![name_key(&item), id],
        )?;
    }
    Ok(())
}

/// Older releases compared names with SQLite `LOWER()`, which only folds ASCII,
/// so one chat may hold names that now share a key. Keep the oldest of each.
fn collapse_duplicate_names(tx: &Transaction<'_>) -> StoreResult<()> {
    let removed = tx.execute(
        "DELETE FROM grocery_items WHERE id NOT IN (
             SELECT MIN(id) FROM grocery_items GROUP BY chat_id, name_key
         )",
        [],
    )?;
    if removed > 0 {
        warn!("removed {} duplicate items while adding name_key", removed);
    }
    Ok(())
}
