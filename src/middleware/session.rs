// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie middleware.
//!
//! Reads the `accessToken` cookie, refreshes an expired pair, resolves the
//! Spotify user and hands both to the handler as a [`Session`] extension.
//! When a refresh happened, the new pair is written back to the cookie on
//! the way out.

use crate::error::AppError;
use crate::models::TokenPair;
use crate::services::cookie::COOKIE_MAX_AGE_SECS;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "accessToken";

/// Where a request without a usable session is sent.
pub const LOGIN_PATH: &str = "/login";

/// Authenticated session extracted by [`require_session`].
#[derive(Debug, Clone)]
pub struct Session {
    /// Spotify user id
    pub user_id: String,
    /// Valid (possibly just refreshed) token pair
    pub token: TokenPair,
}

/// Build the session cookie carrying an encoded token pair.
pub fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(COOKIE_MAX_AGE_SECS))
        .build()
}

/// A cookie that makes the browser drop the session.
pub fn cleared_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

/// Middleware that requires a valid session cookie.
///
/// Session errors become a redirect to [`LOGIN_PATH`] through
/// [`AppError`]'s response conversion.
///
/// A rejected refresh only clears the cookie here: the user cannot be
/// identified without a working access token. The stored credential is
/// removed by the next [`BatchRefresher`](crate::services::BatchRefresher) run.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let cached = state.cookies.read(&jar, SESSION_COOKIE)?;
    let (token, refreshed) = state.lifecycle.get_valid_access_token(&cached).await?;
    let user_id = state.lifecycle.identify(&token.access_token).await?;

    let reissued = if refreshed {
        Some(state.cookies.encode(SESSION_COOKIE, &token)?)
    } else {
        None
    };

    tracing::debug!(user_id = %user_id, refreshed, "Session resolved");
    request.extensions_mut().insert(Session { user_id, token });

    let response = next.run(request).await;

    Ok(match reissued {
        Some(value) => (jar.add(session_cookie(value)), response).into_response(),
        None => response,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("v".to_string());
        assert_eq!(cookie.name(), "accessToken");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(72)));
    }

    #[test]
    fn test_cleared_cookie_expires_immediately() {
        let cookie = cleared_session_cookie();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}
