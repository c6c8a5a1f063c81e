// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token pair held in the session cookie.

use crate::error::AppError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds deducted from the provider's declared TTL so a cached access
/// token is never presented after Spotify considers it expired.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 100;

/// Access/refresh token pair.
///
/// Never mutated after creation: a refresh produces a new pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Local expiry, already reduced by [`TOKEN_EXPIRY_MARGIN_SECS`]
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scope: String,
}

impl TokenPair {
    /// Build a pair issued at `issued_at` with a provider TTL of `expires_in` seconds.
    ///
    /// A TTL at or below [`TOKEN_EXPIRY_MARGIN_SECS`] yields a pair that is
    /// already expired at `issued_at`.
    pub fn issued(
        access_token: String,
        refresh_token: String,
        scope: String,
        expires_in: i64,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        let lifetime = expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS).max(0);
        let expires_at = Duration::try_seconds(lifetime)
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .ok_or_else(|| AppError::Provider("Token response has invalid expires_in".to_string()))?;

        Ok(Self {
            access_token,
            refresh_token,
            expires_at,
            scope,
        })
    }

    /// A pair carrying only a stored refresh token; always expired.
    pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: String::new(),
            refresh_token: refresh_token.into(),
            expires_at: DateTime::<Utc>::default(),
            scope: String::new(),
        }
    }

    /// Whether the access token must not be used at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_applies_safety_margin() {
        let now = Utc::now();
        let pair = TokenPair::issued("a".into(), "r".into(), String::new(), 3600, now).unwrap();
        assert_eq!(pair.expires_at, now + Duration::seconds(3500));
        assert!(!pair.is_expired_at(now));
        assert!(pair.is_expired_at(now + Duration::seconds(3500)));
    }

    #[test]
    fn test_short_ttl_is_immediately_stale() {
        let now = Utc::now();
        let pair = TokenPair::issued("a".into(), "r".into(), String::new(), 30, now).unwrap();
        assert_eq!(pair.expires_at, now);
        assert!(pair.is_expired_at(now));
    }

    #[test]
    fn test_out_of_range_ttl_rejected() {
        let now = Utc::now();
        for expires_in in [i64::MAX, i64::MAX / 1000, 10_000_000_000_000] {
            assert!(matches!(
                TokenPair::issued("a".into(), "r".into(), String::new(), expires_in, now),
                Err(AppError::Provider(_))
            ));
        }
    }

    #[test]
    fn test_negative_ttl_is_immediately_stale() {
        let now = Utc::now();
        let pair = TokenPair::issued("a".into(), "r".into(), String::new(), i64::MIN, now).unwrap();
        assert_eq!(pair.expires_at, now);
    }

    #[test]
    fn test_from_refresh_token_is_expired() {
        let pair = TokenPair::from_refresh_token("r1");
        assert_eq!(pair.refresh_token, "r1");
        assert!(pair.access_token.is_empty());
        assert!(pair.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let pair = TokenPair::issued("secret-at".into(), "secret-rt".into(), String::new(), 3600, Utc::now()).unwrap();
        let printed = format!("{:?}", pair);
        assert!(!printed.contains("secret-at"));
        assert!(!printed.contains("secret-rt"));
    }
}
