// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify accounts and Web API client.
//!
//! Handles:
//! - Authorization URL construction
//! - Token grants (authorization code and refresh) with client credentials
//! - Current user identity
//! - Top artists and tracks

use crate::config::Config;
use crate::error::AppError;
use serde::Deserialize;

/// Spotify HTTP client.
///
/// Every request is subject to the configured timeout.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    accounts_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: String,
}

impl SpotifyClient {
    /// Create a client from application configuration.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http,
            accounts_url: config.accounts_url.trim_end_matches('/').to_string(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            client_id: config.spotify_client_id.clone(),
            client_secret: config.spotify_client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: config.scope.clone(),
        })
    }

    /// Redirect URI sent with authorization and code exchange.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// URL of the user-facing authorization page.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/authorize?\
             client_id={}&\
             response_type=code&\
             redirect_uri={}&\
             scope={}&\
             state={}",
            self.accounts_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&self.scope),
            urlencoding::encode(state),
        )
    }

    /// POST a grant to the token endpoint.
    ///
    /// An OAuth error body (`{"error": ...}`) is returned as `Ok` so the
    /// caller can distinguish `invalid_grant` from other failures.
    pub async fn token_grant(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AppError> {
        let url = format!("{}/api/token", self.accounts_url);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Provider(format!("Token response read failed: {}", e)))?;

        match serde_json::from_str::<TokenResponse>(&body) {
            Ok(parsed) if status.is_success() || parsed.error.is_some() => Ok(parsed),
            Ok(_) => Err(AppError::Provider(format!("HTTP {}: {}", status, body))),
            Err(e) if status.is_success() => Err(AppError::Provider(format!(
                "Token response parse error: {}",
                e
            ))),
            Err(_) => Err(AppError::Provider(format!("HTTP {}: {}", status, body))),
        }
    }

    /// Profile of the user owning `access_token`.
    pub async fn current_user(&self, access_token: &str) -> Result<SpotifyUser, AppError> {
        let url = format!("{}/v1/me", self.api_url);
        self.get_json(&url, access_token, &[]).await
    }

    /// Names of the user's top artists or tracks, most listened first.
    pub async fn top_items(
        &self,
        access_token: &str,
        kind: TopItemKind,
        time_range: &str,
        limit: u32,
    ) -> Result<Vec<String>, AppError> {
        let url = format!("{}/v1/me/top/{}", self.api_url, kind.path());
        let page: TopItemsPage = self
            .get_json(
                &url,
                access_token,
                &[("time_range", time_range.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        Ok(page.items.into_iter().map(|item| item.name).collect())
    }

    /// Bearer GET with JSON response.
    ///
    /// 401 and 403 map to `Unauthorized`, other failures to `Provider`.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Spotify rate limit hit (429)");
            }

            if status.as_u16() == 401 || status.as_u16() == 403 {
                tracing::debug!(status = %status, body = %body, "Spotify rejected access token");
                return Err(AppError::Unauthorized);
            }

            return Err(AppError::Provider(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("JSON parse error: {}", e)))
    }
}

/// Token endpoint response.
///
/// Success and error bodies share this shape; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// `GET /v1/me` response (only the fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Which top-items collection to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopItemKind {
    Artists,
    Tracks,
}

impl TopItemKind {
    fn path(self) -> &'static str {
        match self {
            TopItemKind::Artists => "artists",
            TopItemKind::Tracks => "tracks",
        }
    }
}

#[derive(Debug, Deserialize)]
struct TopItemsPage {
    items: Vec<TopItem>,
}

#[derive(Debug, Deserialize)]
struct TopItem {
    name: String,
}
