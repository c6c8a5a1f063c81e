// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token lifecycle: code exchange, refresh and lazy refresh on read.
//!
//! A session moves through
//! `Unauthorized -> Authorized(valid) -> Authorized(expired) -> Authorized(valid)`
//! and ends when its cookie is dropped. Pairs are never mutated; every
//! transition produces a new [`TokenPair`].

use crate::error::AppError;
use crate::models::token::TOKEN_EXPIRY_MARGIN_SECS;
use crate::models::TokenPair;
use crate::services::spotify::{SpotifyClient, TokenResponse};
use chrono::Utc;

/// OAuth error code for a revoked or unknown refresh token.
const INVALID_GRANT: &str = "invalid_grant";

/// Token acquisition and renewal against the Spotify accounts service.
#[derive(Clone)]
pub struct TokenLifecycle {
    client: SpotifyClient,
}

impl TokenLifecycle {
    pub fn new(client: SpotifyClient) -> Self {
        Self { client }
    }

    /// Exchange a one-time authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenPair, AppError> {
        if code.trim().is_empty() {
            return Err(AppError::InvalidCode);
        }

        let response = self
            .client
            .token_grant(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.client.redirect_uri()),
            ])
            .await?;

        if let Some(error) = &response.error {
            return Err(AppError::Provider(describe_error(error, &response)));
        }

        let access_token = required_field(response.access_token, "access_token")?;
        let refresh_token = required_field(response.refresh_token, "refresh_token")?;
        let expires_in = response
            .expires_in
            .ok_or_else(|| AppError::Provider("Token response missing expires_in".to_string()))?;

        tracing::info!(expires_in, "Exchanged authorization code");
        warn_if_short_lived(expires_in);

        TokenPair::issued(
            access_token,
            refresh_token,
            response.scope.unwrap_or_default(),
            expires_in,
            Utc::now(),
        )
    }

    /// Obtain a new access token using `prior`'s refresh token.
    ///
    /// The prior refresh token and scope are carried over unless the
    /// provider returns replacements.
    pub async fn refresh(&self, prior: &TokenPair) -> Result<TokenPair, AppError> {
        if prior.refresh_token.is_empty() {
            return Err(AppError::RefreshRejected("no refresh token".to_string()));
        }

        let response = self
            .client
            .token_grant(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", prior.refresh_token.as_str()),
            ])
            .await?;

        match response.error.as_deref() {
            Some(INVALID_GRANT) => {
                return Err(AppError::RefreshRejected(describe_error(
                    INVALID_GRANT,
                    &response,
                )))
            }
            Some(error) => return Err(AppError::Provider(describe_error(error, &response))),
            None => {}
        }

        let access_token = required_field(response.access_token, "access_token")?;
        let expires_in = response
            .expires_in
            .ok_or_else(|| AppError::Provider("Token response missing expires_in".to_string()))?;

        let rotated = response.refresh_token.filter(|t| !t.is_empty());
        if rotated.is_some() {
            tracing::debug!("Provider rotated refresh token");
        }
        warn_if_short_lived(expires_in);

        TokenPair::issued(
            access_token,
            rotated.unwrap_or_else(|| prior.refresh_token.clone()),
            response
                .scope
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| prior.scope.clone()),
            expires_in,
            Utc::now(),
        )
    }

    /// Return `cached` while it is valid, otherwise refresh it once.
    ///
    /// The flag is true when a new pair was obtained and must be reissued
    /// to the client. If the provider grants a TTL no longer than
    /// [`TOKEN_EXPIRY_MARGIN_SECS`], the refreshed pair is already expired
    /// and the next call refreshes again.
    pub async fn get_valid_access_token(
        &self,
        cached: &TokenPair,
    ) -> Result<(TokenPair, bool), AppError> {
        if !cached.is_expired_at(Utc::now()) {
            return Ok((cached.clone(), false));
        }

        tracing::debug!(expires_at = %cached.expires_at, "Access token expired, refreshing");
        let refreshed = self.refresh(cached).await?;
        Ok((refreshed, true))
    }

    /// Spotify user id owning `access_token`.
    pub async fn identify(&self, access_token: &str) -> Result<String, AppError> {
        let user = self.client.current_user(access_token).await?;
        if user.id.is_empty() {
            return Err(AppError::Provider("Profile response has empty id".to_string()));
        }
        Ok(user.id)
    }
}

fn warn_if_short_lived(expires_in: i64) {
    if expires_in <= TOKEN_EXPIRY_MARGIN_SECS {
        tracing::warn!(
            expires_in,
            margin = TOKEN_EXPIRY_MARGIN_SECS,
            "Access token TTL within safety margin, pair is stale on arrival"
        );
    }
}

fn required_field(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Provider(format!("Token response missing {}", name)))
}

fn describe_error(error: &str, response: &TokenResponse) -> String {
    match &response.error_description {
        Some(description) => format!("{}: {}", error, description),
        None => error.to_string(),
    }
}
