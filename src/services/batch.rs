// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weekly refresh-and-snapshot job across every registered user.
//!
//! For each user: refresh the stored credential, fetch top artists and
//! tracks, persist a rotated refresh token, and store the dated snapshot.
//! Users are processed through a bounded pool; one user's failure never
//! affects another's.

use crate::config::MAX_BATCH_CONCURRENCY;
use crate::error::AppError;
use crate::models::TokenPair;
use crate::services::spotify::{SpotifyClient, TopItemKind};
use crate::services::{CredentialStore, TokenLifecycle};
use chrono::{NaiveDate, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;

/// Time range requested for top items.
pub const TOP_ITEMS_TIME_RANGE: &str = "long_term";

/// Number of artists and of tracks kept per snapshot.
pub const TOP_ITEMS_LIMIT: u32 = 5;

/// Outcome counts of one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Users with a stored snapshot
    pub succeeded: usize,
    /// Users skipped after an error; retried next run
    pub failed: usize,
    /// Users whose refresh token was rejected and whose credential was removed
    pub unlinked: usize,
}

enum UserOutcome {
    Stored,
    Failed,
    Unlinked,
}

/// Refreshes every stored credential and records a snapshot.
pub struct BatchRefresher {
    store: Arc<CredentialStore>,
    lifecycle: TokenLifecycle,
    spotify: SpotifyClient,
    concurrency: usize,
}

impl BatchRefresher {
    /// `concurrency` is clamped to `1..=MAX_BATCH_CONCURRENCY`.
    pub fn new(
        store: Arc<CredentialStore>,
        lifecycle: TokenLifecycle,
        spotify: SpotifyClient,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            lifecycle,
            spotify,
            concurrency: concurrency.clamp(1, MAX_BATCH_CONCURRENCY),
        }
    }

    /// Run for today's date (UTC).
    pub async fn run(&self) -> Result<BatchReport, AppError> {
        self.run_on(Utc::now().date_naive()).await
    }

    /// Run with snapshots dated `date`.
    ///
    /// Fails only if the user list cannot be loaded.
    pub async fn run_on(&self, date: NaiveDate) -> Result<BatchReport, AppError> {
        let users = self.store.list_all_users()?;

        tracing::info!(
            users = users.len(),
            date = %date,
            concurrency = self.concurrency,
            "Starting weekly batch"
        );

        let outcomes: Vec<UserOutcome> = stream::iter(users)
            .map(|(user_id, refresh_token)| async move {
                self.process_user(&user_id, refresh_token, date).await
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for outcome in outcomes {
            match outcome {
                UserOutcome::Stored => report.succeeded += 1,
                UserOutcome::Failed => report.failed += 1,
                UserOutcome::Unlinked => report.unlinked += 1,
            }
        }

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            unlinked = report.unlinked,
            "Weekly batch finished"
        );

        Ok(report)
    }

    async fn process_user(&self, user_id: &str, refresh_token: String, date: NaiveDate) -> UserOutcome {
        match self.snapshot_user(user_id, refresh_token, date).await {
            Ok(()) => UserOutcome::Stored,
            Err(AppError::RefreshRejected(reason)) => {
                tracing::warn!(user_id, reason = %reason, "Refresh token rejected, unlinking user");
                match self.store.delete_user(user_id) {
                    Ok(_) => UserOutcome::Unlinked,
                    Err(e) => {
                        tracing::warn!(user_id, error = %e, "Failed to unlink user");
                        UserOutcome::Failed
                    }
                }
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Skipping user in weekly batch");
                UserOutcome::Failed
            }
        }
    }

    async fn snapshot_user(
        &self,
        user_id: &str,
        refresh_token: String,
        date: NaiveDate,
    ) -> Result<(), AppError> {
        let prior = TokenPair::from_refresh_token(refresh_token);
        let pair = self.lifecycle.refresh(&prior).await?;

        // Persist before anything else can fail; the old token may already be void.
        if pair.refresh_token != prior.refresh_token {
            self.store.update_refresh_token(user_id, &pair.refresh_token)?;
        }

        let artists = self
            .spotify
            .top_items(
                &pair.access_token,
                TopItemKind::Artists,
                TOP_ITEMS_TIME_RANGE,
                TOP_ITEMS_LIMIT,
            )
            .await?;
        let songs = self
            .spotify
            .top_items(
                &pair.access_token,
                TopItemKind::Tracks,
                TOP_ITEMS_TIME_RANGE,
                TOP_ITEMS_LIMIT,
            )
            .await?;

        self.store.append_snapshot(user_id, date, &artists, &songs)?;
        tracing::debug!(user_id, artists = artists.len(), songs = songs.len(), "Snapshot stored");
        Ok(())
    }
}
