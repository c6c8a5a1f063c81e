// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weekly "wrapped" snapshot model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A user's top artists and songs as of one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedSnapshot {
    pub user_id: String,
    pub date: NaiveDate,
    /// Artist names, most listened first
    pub artists: Vec<String>,
    /// Track names, most listened first
    pub songs: Vec<String>,
}

/// Snapshot row as persisted; the lists are JSON-encoded string arrays.
#[derive(Debug, Clone)]
pub struct StoredWrap {
    pub lookup_key: String,
    pub spotify_id_encrypted: String,
    pub date: String,
    pub artists_json: String,
    pub songs_json: String,
}
