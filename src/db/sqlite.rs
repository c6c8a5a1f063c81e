// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite wrapper with typed row operations.
//!
//! Provides raw (already encrypted) row access for:
//! - Users (encrypted Spotify id + refresh token, keyed by lookup tag)
//! - Wraps (weekly top artists/songs snapshots)
//!
//! Encryption is the caller's concern; this layer never sees plaintext.

use crate::db::tables;
use crate::error::AppError;
use crate::models::{StoredUser, StoredWrap};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite database handle.
///
/// One connection, serialized behind a mutex. The lock is never held
/// across an `.await`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database and apply the schema.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {users} (
                lookup_key TEXT PRIMARY KEY,
                spotify_id TEXT NOT NULL,
                refresh_token TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS {wraps} (
                id INTEGER PRIMARY KEY,
                lookup_key TEXT NOT NULL,
                spotify_id TEXT NOT NULL,
                date TEXT NOT NULL,
                songs TEXT NOT NULL,
                artists TEXT NOT NULL,
                UNIQUE(lookup_key, date)
            );
            "#,
            users = tables::USERS,
            wraps = tables::WRAPS,
        ))
        .map_err(|e| AppError::Database(format!("Failed to apply schema: {}", e)))?;

        tracing::info!(path = %path.display(), "Opened SQLite database");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::Database("Connection mutex poisoned".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Insert a new user row. Fails with `Duplicate` if the lookup key exists.
    pub fn insert_user(&self, user: &StoredUser) -> Result<(), AppError> {
        self.conn()?
            .execute(
                &format!(
                    "INSERT INTO {} (lookup_key, spotify_id, refresh_token, created_at) \
                     VALUES (?1, ?2, ?3, ?4)",
                    tables::USERS
                ),
                params![
                    user.lookup_key,
                    user.spotify_id_encrypted,
                    user.refresh_token_encrypted,
                    user.created_at,
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(ref err, _)
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    AppError::Duplicate("user already registered".to_string())
                }
                e => AppError::Database(e.to_string()),
            })?;
        Ok(())
    }

    /// Get a user row by lookup key.
    pub fn get_user(&self, lookup_key: &str) -> Result<Option<StoredUser>, AppError> {
        self.conn()?
            .query_row(
                &format!(
                    "SELECT lookup_key, spotify_id, refresh_token, created_at \
                     FROM {} WHERE lookup_key = ?1",
                    tables::USERS
                ),
                params![lookup_key],
                |row| {
                    Ok(StoredUser {
                        lookup_key: row.get(0)?,
                        spotify_id_encrypted: row.get(1)?,
                        refresh_token_encrypted: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List every user row, oldest first.
    pub fn list_users(&self) -> Result<Vec<StoredUser>, AppError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT lookup_key, spotify_id, refresh_token, created_at \
                 FROM {} ORDER BY created_at, lookup_key",
                tables::USERS
            ))
            .map_err(|e| AppError::Database(e.to_string()))?;

        let users = stmt
            .query_map([], |row| {
                Ok(StoredUser {
                    lookup_key: row.get(0)?,
                    spotify_id_encrypted: row.get(1)?,
                    refresh_token_encrypted: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })
            .map_err(|e| AppError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users)
    }

    /// Replace the encrypted refresh token of an existing user.
    ///
    /// Returns `false` if no row matched.
    pub fn set_refresh_token(
        &self,
        lookup_key: &str,
        refresh_token_encrypted: &str,
    ) -> Result<bool, AppError> {
        let rows = self
            .conn()?
            .execute(
                &format!(
                    "UPDATE {} SET refresh_token = ?2 WHERE lookup_key = ?1",
                    tables::USERS
                ),
                params![lookup_key, refresh_token_encrypted],
            )
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows > 0)
    }

    /// Delete a user row. Snapshots are kept.
    ///
    /// Returns `false` if no row matched.
    pub fn delete_user(&self, lookup_key: &str) -> Result<bool, AppError> {
        let rows = self
            .conn()?
            .execute(
                &format!("DELETE FROM {} WHERE lookup_key = ?1", tables::USERS),
                params![lookup_key],
            )
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows > 0)
    }

    // ─── Wrap Operations ─────────────────────────────────────────

    /// Insert a snapshot, replacing any existing one for the same user and date.
    pub fn upsert_wrap(&self, wrap: &StoredWrap) -> Result<(), AppError> {
        self.conn()?
            .execute(
                &format!(
                    r#"
                    INSERT INTO {} (lookup_key, spotify_id, date, songs, artists)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(lookup_key, date) DO UPDATE SET
                        spotify_id = excluded.spotify_id,
                        songs = excluded.songs,
                        artists = excluded.artists
                    "#,
                    tables::WRAPS
                ),
                params![
                    wrap.lookup_key,
                    wrap.spotify_id_encrypted,
                    wrap.date,
                    wrap.songs_json,
                    wrap.artists_json,
                ],
            )
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Snapshot dates for a user, newest first.
    pub fn list_wrap_dates(&self, lookup_key: &str) -> Result<Vec<String>, AppError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT date FROM {} WHERE lookup_key = ?1 ORDER BY date DESC",
                tables::WRAPS
            ))
            .map_err(|e| AppError::Database(e.to_string()))?;

        let dates = stmt
            .query_map(params![lookup_key], |row| row.get(0))
            .map_err(|e| AppError::Database(e.to_string()))?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(dates)
    }

    /// Get one snapshot row.
    pub fn get_wrap(&self, lookup_key: &str, date: &str) -> Result<Option<StoredWrap>, AppError> {
        self.conn()?
            .query_row(
                &format!(
                    "SELECT lookup_key, spotify_id, date, artists, songs \
                     FROM {} WHERE lookup_key = ?1 AND date = ?2",
                    tables::WRAPS
                ),
                params![lookup_key, date],
                |row| {
                    Ok(StoredWrap {
                        lookup_key: row.get(0)?,
                        spotify_id_encrypted: row.get(1)?,
                        date: row.get(2)?,
                        artists_json: row.get(3)?,
                        songs_json: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(key: &str) -> StoredUser {
        StoredUser {
            lookup_key: key.to_string(),
            spotify_id_encrypted: format!("enc-id-{key}"),
            refresh_token_encrypted: format!("enc-rt-{key}"),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn wrap(key: &str, date: &str, artists: &str) -> StoredWrap {
        StoredWrap {
            lookup_key: key.to_string(),
            spotify_id_encrypted: format!("enc-id-{key}"),
            date: date.to_string(),
            artists_json: artists.to_string(),
            songs_json: "[]".to_string(),
        }
    }

    #[test]
    fn test_insert_and_get_user() {
        let db = Database::open(":memory:").unwrap();
        db.insert_user(&user("k1")).unwrap();

        let stored = db.get_user("k1").unwrap().expect("user should exist");
        assert_eq!(stored.refresh_token_encrypted, "enc-rt-k1");
        assert!(db.get_user("k2").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let db = Database::open(":memory:").unwrap();
        db.insert_user(&user("k1")).unwrap();

        let result = db.insert_user(&user("k1"));
        assert!(matches!(result, Err(AppError::Duplicate(_))));
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn test_set_refresh_token_and_delete() {
        let db = Database::open(":memory:").unwrap();
        db.insert_user(&user("k1")).unwrap();

        assert!(db.set_refresh_token("k1", "rotated").unwrap());
        assert!(!db.set_refresh_token("missing", "rotated").unwrap());
        assert_eq!(
            db.get_user("k1").unwrap().unwrap().refresh_token_encrypted,
            "rotated"
        );

        assert!(db.delete_user("k1").unwrap());
        assert!(!db.delete_user("k1").unwrap());
        assert!(db.list_users().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_wrap_replaces_same_date() {
        let db = Database::open(":memory:").unwrap();
        db.upsert_wrap(&wrap("k1", "2024-01-05", r#"["A"]"#)).unwrap();
        db.upsert_wrap(&wrap("k1", "2024-01-05", r#"["B"]"#)).unwrap();
        db.upsert_wrap(&wrap("k1", "2024-01-12", r#"["C"]"#)).unwrap();

        assert_eq!(
            db.list_wrap_dates("k1").unwrap(),
            vec!["2024-01-12".to_string(), "2024-01-05".to_string()]
        );
        let stored = db.get_wrap("k1", "2024-01-05").unwrap().unwrap();
        assert_eq!(stored.artists_json, r#"["B"]"#);
        assert!(db.get_wrap("k1", "2024-01-19").unwrap().is_none());
    }
}
