// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Weekly Wrapped: weekly snapshots of a Spotify user's top artists and songs
//!
//! This crate provides the OAuth token lifecycle, encrypted credential
//! storage, the session cookie codec and the weekly batch that refreshes
//! every stored credential.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use error::AppError;
use services::{CredentialStore, CryptoBox, SecureCookieCodec, SpotifyClient, TokenLifecycle};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<CredentialStore>,
    pub cookies: SecureCookieCodec,
    pub lifecycle: TokenLifecycle,
    pub spotify: SpotifyClient,
}

impl AppState {
    /// Wire every service from configuration.
    ///
    /// Invalid key material fails here, before the server accepts requests.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let crypto = CryptoBox::new(&config.aes_key)?;
        let store = Arc::new(CredentialStore::open(&config.database_url, crypto)?);
        Self::with_store(config, store)
    }

    /// Wire services around an already opened store.
    pub fn with_store(config: Config, store: Arc<CredentialStore>) -> Result<Self, AppError> {
        let cookies = SecureCookieCodec::new(&config.cookie_hash_key, &config.cookie_block_key)?;
        let spotify = SpotifyClient::new(&config)?;
        let lifecycle = TokenLifecycle::new(spotify.clone());

        Ok(Self {
            config,
            store,
            cookies,
            lifecycle,
            spotify,
        })
    }
}
