use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::*;

use crate::notifier::dedup::DedupStore;
use crate::notifier::dispatch::{DeliveryHistory, DispatchError};

/// Thread-safe SQLite connection pool (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database mutex poisoned"))
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    // ── Subscribers ──────────────────────────────────────────────────────────

    /// Register a subscriber or replace its push token. `None` clears it.
    pub fn upsert_subscriber(&self, user_id: i64, push_token: Option<&str>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO subscribers (user_id, push_token) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET push_token=excluded.push_token",
            params![user_id, push_token],
        )?;
        Ok(())
    }

    /// Subscribers that can actually receive a push (non-empty token).
    pub fn list_subscribers_with_push_token(&self) -> Result<Vec<Subscriber>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, push_token FROM subscribers
             WHERE push_token IS NOT NULL AND push_token != ''
             ORDER BY user_id",
        )?;
        let subscribers = stmt
            .query_map([], |row| {
                Ok(Subscriber {
                    user_id: row.get(0)?,
                    push_token: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(subscribers)
    }

    // ── Delivery history ─────────────────────────────────────────────────────

    /// Most recent notifications first
    pub fn list_recent_notifications(&self, limit: i64) -> Result<Vec<NotificationRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, message, sent_at
             FROM notifications ORDER BY id DESC LIMIT ?1",
        )?;
        let records = stmt
            .query_map(params![limit], map_notification)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    // ── Key/value store ──────────────────────────────────────────────────────

    /// Raw value for `key`, ignoring entries whose expiry has passed.
    pub fn kv_get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.lock()?;
        let row: Option<(Vec<u8>, Option<DateTime<Utc>>)> = conn
            .query_row(
                "SELECT value, expires_at FROM kv_store WHERE key=?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(match row {
            Some((_, Some(expires_at))) if expires_at <= Utc::now() => None,
            Some((value, _)) => Some(value),
            None => None,
        })
    }

    /// Store `value` under `key`. `ttl == None` keeps it until overwritten.
    pub fn kv_set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|d| Utc::now() + d);
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_store (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value, expires_at=excluded.expires_at",
            params![key, value, expires_at],
        )?;
        Ok(())
    }
}

impl DedupStore for Database {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.kv_get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.kv_set(key, value, None)
    }
}

impl DeliveryHistory for Database {
    fn record_notification(
        &self,
        user_id: i64,
        title: &str,
        message: &str,
    ) -> std::result::Result<(), DispatchError> {
        let conn = self
            .lock()
            .map_err(|e| DispatchError::History(e.to_string()))?;
        let known: Option<i64> = conn
            .query_row(
                "SELECT user_id FROM subscribers WHERE user_id=?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| DispatchError::History(e.to_string()))?;
        if known.is_none() {
            return Err(DispatchError::UnknownSubscriber(user_id));
        }
        conn.execute(
            "INSERT INTO notifications (user_id, title, message, sent_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, title, message, Utc::now()],
        )
        .map_err(|e| DispatchError::History(e.to_string()))?;
        Ok(())
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_notification(row: &rusqlite::Row) -> rusqlite::Result<NotificationRecord> {
    Ok(NotificationRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        sent_at: row.get(4)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS subscribers (
    user_id     INTEGER PRIMARY KEY,
    push_token  TEXT
);

CREATE TABLE IF NOT EXISTS notifications (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL,
    title       TEXT    NOT NULL,
    message     TEXT    NOT NULL,
    sent_at     TEXT    NOT NULL,
    FOREIGN KEY (user_id) REFERENCES subscribers(user_id)
);

CREATE TABLE IF NOT EXISTS kv_store (
    key         TEXT    PRIMARY KEY,
    value       BLOB    NOT NULL,
    expires_at  TEXT
);

CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
"#;
