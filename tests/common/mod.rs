// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use base64::{engine::general_purpose::STANDARD, Engine as _};
use weekly_wrapped::config::Config;
use weekly_wrapped::middleware::session::SESSION_COOKIE;
use weekly_wrapped::models::TokenPair;
use weekly_wrapped::routes::create_router;
use weekly_wrapped::services::{CredentialStore, CryptoBox, SpotifyClient, TokenLifecycle};
use weekly_wrapped::AppState;
use std::sync::Arc;

/// Test config with both Spotify base URLs pointing at `server_url`.
#[allow(dead_code)]
pub fn test_config(server_url: &str) -> Config {
    Config {
        accounts_url: server_url.to_string(),
        api_url: server_url.to_string(),
        ..Config::default()
    }
}

/// `Authorization` header Spotify expects on token requests for the test client.
#[allow(dead_code)]
pub fn basic_auth_header() -> String {
    let config = Config::default();
    format!(
        "Basic {}",
        STANDARD.encode(format!(
            "{}:{}",
            config.spotify_client_id, config.spotify_client_secret
        ))
    )
}

/// Successful token endpoint body.
#[allow(dead_code)]
pub fn token_body(access_token: &str, refresh_token: Option<&str>, expires_in: i64) -> String {
    let mut body = serde_json::json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "scope": "user-top-read",
        "expires_in": expires_in,
    });
    if let Some(refresh_token) = refresh_token {
        body["refresh_token"] = serde_json::json!(refresh_token);
    }
    body.to_string()
}

/// Top items body with the given names.
#[allow(dead_code)]
pub fn top_items_body(names: &[&str]) -> String {
    let items: Vec<_> = names
        .iter()
        .map(|name| serde_json::json!({ "name": name }))
        .collect();
    serde_json::json!({ "items": items }).to_string()
}

/// In-memory store with the test AES key.
#[allow(dead_code)]
pub fn test_store() -> Arc<CredentialStore> {
    let crypto = CryptoBox::new(&Config::default().aes_key).expect("test key is valid");
    Arc::new(CredentialStore::open(":memory:", crypto).expect("in-memory store opens"))
}

/// Token lifecycle talking to `server_url`.
#[allow(dead_code)]
pub fn test_lifecycle(server_url: &str) -> (TokenLifecycle, SpotifyClient) {
    let spotify = SpotifyClient::new(&test_config(server_url)).expect("client builds");
    (TokenLifecycle::new(spotify.clone()), spotify)
}

/// Create a test app whose Spotify calls go to `server_url`.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(server_url: &str) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(
        AppState::with_store(test_config(server_url), test_store()).expect("state builds"),
    );
    (create_router(state.clone()), state)
}

/// `Cookie` request header carrying `pair` as the session.
#[allow(dead_code)]
pub fn session_cookie_header(state: &AppState, pair: &TokenPair) -> String {
    let value = state
        .cookies
        .encode(SESSION_COOKIE, pair)
        .expect("cookie encodes");
    format!("{}={}", SESSION_COOKIE, value)
}
