// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify OAuth authentication routes.

use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::middleware::session::{cleared_session_cookie, session_cookie, SESSION_COOKIE};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// How long an issued OAuth `state` stays acceptable (10 minutes).
const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route("/code", get(code_callback))
        .route("/logout", get(logout))
}

/// Start OAuth flow - redirect to Spotify authorization.
async fn login(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let oauth_state = create_state(&state.config.oauth_state_key, now_millis()?)?;
    let auth_url = state.spotify.authorize_url(&oauth_state);

    tracing::info!(
        client_id = %state.config.spotify_client_id,
        "Starting OAuth flow, redirecting to Spotify"
    );

    Ok(Redirect::to(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange the code and start a session.
async fn code_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    let now = now_millis()?;
    let state_ok = params
        .state
        .as_deref()
        .is_some_and(|s| verify_state(s, &state.config.oauth_state_key, now));
    if !state_ok {
        tracing::warn!("Invalid, expired or missing OAuth state parameter");
        return Err(AppError::BadRequest("invalid OAuth state".to_string()));
    }

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Spotify");
        return Err(AppError::BadRequest(format!("authorization failed: {}", error)));
    }

    let code = params.code.unwrap_or_default();
    let pair = state.lifecycle.exchange_code(&code).await?;
    let value = state.cookies.encode(SESSION_COOKIE, &pair)?;

    tracing::info!("OAuth successful, session cookie issued");

    Ok((jar.add(session_cookie(value)), Redirect::to("/")))
}

/// Logout - drop the session cookie.
async fn logout(jar: CookieJar) -> (CookieJar, Html<&'static str>) {
    (
        jar.add(cleared_session_cookie()),
        Html(r#"<p>Signed out. <a href="/login">Sign in again</a></p>"#),
    )
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

/// Build a signed `state`: `b64(nonce_hex|timestamp_hex|signature_hex)`.
fn create_state(secret: &[u8], now_ms: u128) -> Result<String> {
    let mut nonce = [0u8; 16];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;

    let payload = format!("{}|{:x}", hex::encode(nonce), now_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed_state = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed_state.as_bytes()))
}

/// Verify the signature and age of an OAuth `state` parameter.
fn verify_state(state: &str, secret: &[u8], now_ms: u128) -> bool {
    let Some(state_str) = URL_SAFE_NO_PAD
        .decode(state)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return false;
    };

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [nonce_hex, timestamp_hex, signature_hex] = parts[..] else {
        return false;
    };

    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(format!("{}|{}", nonce_hex, timestamp_hex).as_bytes());
    if mac.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return false;
    }

    match u128::from_str_radix(timestamp_hex, 16) {
        Ok(issued) => issued <= now_ms && now_ms - issued <= STATE_MAX_AGE_MS,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u128 = 1_732_899_600_000;

    #[test]
    fn test_verify_state_success() {
        let secret = b"secret_key";
        let state = create_state(secret, NOW).unwrap();

        assert!(verify_state(&state, secret, NOW));
        assert!(verify_state(&state, secret, NOW + STATE_MAX_AGE_MS));
    }

    #[test]
    fn test_verify_state_expired() {
        let secret = b"secret_key";
        let state = create_state(secret, NOW).unwrap();

        assert!(!verify_state(&state, secret, NOW + STATE_MAX_AGE_MS + 1));
        assert!(!verify_state(&state, secret, NOW - 1));
    }

    #[test]
    fn test_verify_state_invalid_signature() {
        let payload = format!("{}|{:x}", "00".repeat(16), NOW);
        let state_data = format!("{}|{}", payload, "invalid_signature");
        let encoded_state = URL_SAFE_NO_PAD.encode(state_data.as_bytes());

        assert!(!verify_state(&encoded_state, b"secret_key", NOW));
        assert!(!verify_state("not base64!", b"secret_key", NOW));
    }

    #[test]
    fn test_verify_state_wrong_secret() {
        let state = create_state(b"secret_key", NOW).unwrap();
        assert!(!verify_state(&state, b"wrong_key", NOW));
    }

    #[test]
    fn test_states_are_unique() {
        let secret = b"secret_key";
        assert_ne!(
            create_state(secret, NOW).unwrap(),
            create_state(secret, NOW).unwrap()
        );
    }
}
