// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Encrypted persistence of user credentials and weekly snapshots.
//!
//! Every identifier and refresh token is encrypted with [`CryptoBox`] before
//! it reaches [`Database`]. Rows are addressed by the user's lookup tag, and
//! the refresh token ciphertext is bound to that tag so it cannot be swapped
//! between rows.

use crate::db::Database;
use crate::error::AppError;
use crate::models::{StoredUser, StoredWrap, WrappedSnapshot};
use crate::services::CryptoBox;
use crate::time_utils::{format_snapshot_date, parse_snapshot_date};
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;

/// Durable, encrypted store of users and their snapshots.
pub struct CredentialStore {
    db: Database,
    crypto: CryptoBox,
}

impl CredentialStore {
    /// Open the database at `database_url` (`":memory:"` supported).
    pub fn open(database_url: &str, crypto: CryptoBox) -> Result<Self, AppError> {
        Ok(Self::new(Database::open(database_url)?, crypto))
    }

    pub fn new(db: Database, crypto: CryptoBox) -> Self {
        Self { db, crypto }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Register a user with their refresh token.
    ///
    /// Fails with `Duplicate` if the user is already registered.
    pub fn register_user(&self, user_id: &str, refresh_token: &str) -> Result<(), AppError> {
        let lookup_key = self.crypto.lookup_tag(user_id);
        let user = StoredUser {
            spotify_id_encrypted: self.crypto.encrypt(user_id)?,
            refresh_token_encrypted: self
                .crypto
                .encrypt_bound(refresh_token, lookup_key.as_bytes())?,
            created_at: Utc::now().to_rfc3339(),
            lookup_key,
        };

        self.db.insert_user(&user)?;
        tracing::info!(user_id, "Registered user");
        Ok(())
    }

    /// Stored refresh token for a user.
    pub fn find_user(&self, user_id: &str) -> Result<String, AppError> {
        let lookup_key = self.crypto.lookup_tag(user_id);
        let user = self
            .db
            .get_user(&lookup_key)?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;

        self.crypto
            .decrypt_bound(&user.refresh_token_encrypted, lookup_key.as_bytes())
    }

    /// Every registered user id with its refresh token.
    ///
    /// Stops at the first row that does not decrypt.
    pub fn list_all_users(&self) -> Result<BTreeMap<String, String>, AppError> {
        let rows = self.db.list_users()?;
        let mut users = BTreeMap::new();

        for row in rows {
            let user_id = self.crypto.decrypt(&row.spotify_id_encrypted)?;
            let refresh_token = self
                .crypto
                .decrypt_bound(&row.refresh_token_encrypted, row.lookup_key.as_bytes())?;
            users.insert(user_id, refresh_token);
        }

        Ok(users)
    }

    /// Replace a user's stored refresh token after the provider rotated it.
    pub fn update_refresh_token(&self, user_id: &str, refresh_token: &str) -> Result<(), AppError> {
        let lookup_key = self.crypto.lookup_tag(user_id);
        let encrypted = self
            .crypto
            .encrypt_bound(refresh_token, lookup_key.as_bytes())?;

        if !self.db.set_refresh_token(&lookup_key, &encrypted)? {
            return Err(AppError::NotFound(format!("User {}", user_id)));
        }

        tracing::debug!(user_id, "Stored rotated refresh token");
        Ok(())
    }

    /// Remove a user's credential. Existing snapshots are kept.
    ///
    /// Returns `false` if the user was not registered.
    pub fn delete_user(&self, user_id: &str) -> Result<bool, AppError> {
        let deleted = self.db.delete_user(&self.crypto.lookup_tag(user_id))?;
        if deleted {
            tracing::info!(user_id, "Deleted user credential");
        }
        Ok(deleted)
    }

    // ─── Snapshot Operations ─────────────────────────────────────

    /// Record a user's top artists and songs for `date`.
    ///
    /// A second snapshot for the same user and date replaces the first.
    pub fn append_snapshot(
        &self,
        user_id: &str,
        date: NaiveDate,
        artists: &[String],
        songs: &[String],
    ) -> Result<(), AppError> {
        let wrap = StoredWrap {
            lookup_key: self.crypto.lookup_tag(user_id),
            spotify_id_encrypted: self.crypto.encrypt(user_id)?,
            date: format_snapshot_date(date),
            artists_json: to_json(artists)?,
            songs_json: to_json(songs)?,
        };

        self.db.upsert_wrap(&wrap)?;
        tracing::debug!(user_id, date = %wrap.date, "Stored snapshot");
        Ok(())
    }

    /// Dates of a user's snapshots, newest first.
    pub fn list_snapshot_dates(&self, user_id: &str) -> Result<Vec<NaiveDate>, AppError> {
        self.db
            .list_wrap_dates(&self.crypto.lookup_tag(user_id))?
            .iter()
            .map(|raw| {
                parse_snapshot_date(raw).map_err(|e| {
                    AppError::Database(format!("Invalid snapshot date {:?}: {}", raw, e))
                })
            })
            .collect()
    }

    /// One snapshot.
    pub fn get_snapshot(&self, user_id: &str, date: NaiveDate) -> Result<WrappedSnapshot, AppError> {
        let wrap = self
            .db
            .get_wrap(&self.crypto.lookup_tag(user_id), &format_snapshot_date(date))?
            .ok_or_else(|| AppError::NotFound(format!("Snapshot for {}", date)))?;

        Ok(WrappedSnapshot {
            user_id: self.crypto.decrypt(&wrap.spotify_id_encrypted)?,
            date,
            artists: from_json(&wrap.artists_json)?,
            songs: from_json(&wrap.songs_json)?,
        })
    }
}

fn to_json(items: &[String]) -> Result<String, AppError> {
    serde_json::to_string(items)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Snapshot serialization failed: {}", e)))
}

fn from_json(raw: &str) -> Result<Vec<String>, AppError> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::Database(format!("Invalid snapshot list: {}", e)))
}
