// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Inline HTML pages for signed-in users.

use crate::error::{AppError, Result};
use crate::middleware::Session;
use crate::AppState;
use axum::{
    extract::State,
    response::Html,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;

const HOME_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Weekly Wrapped</title></head>
<body>
<h1>Weekly Wrapped</h1>
<p>You're signed up. Your top artists and songs are saved every week.</p>
<p><a href="/api/wrapped">Your snapshots</a> &middot; <a href="/logout">Sign out</a></p>
</body>
</html>
"#;

const SIGNUP_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Weekly Wrapped</title></head>
<body>
<h1>Weekly Wrapped</h1>
<p>Save your top artists and songs every week.</p>
<form method="post" action="/signup"><button type="submit">Sign up</button></form>
</body>
</html>
"#;

const SIGNED_UP_PAGE: &str = "<p>Stay Tuned for Updates</p>";

/// Page routes (require a session).
/// The session middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(home))
        .route("/signup", post(signup))
}

/// Home page for registered users, sign-up page otherwise.
async fn home(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Html<&'static str>> {
    match state.store.find_user(&session.user_id) {
        Ok(_) => Ok(Html(HOME_PAGE)),
        Err(AppError::NotFound(_)) => Ok(Html(SIGNUP_PAGE)),
        // Not a session problem; must not bounce the user through /login.
        Err(AppError::Integrity) => Err(AppError::Database(
            "stored credential failed integrity check".to_string(),
        )),
        Err(e) => Err(e),
    }
}

/// Register the session's user for the weekly batch.
///
/// Signing up again relinks the account with the current refresh token.
async fn signup(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Html<&'static str>> {
    match state
        .store
        .register_user(&session.user_id, &session.token.refresh_token)
    {
        Ok(()) => {}
        Err(AppError::Duplicate(_)) => {
            tracing::info!(user_id = %session.user_id, "User already registered, relinking");
            state
                .store
                .update_refresh_token(&session.user_id, &session.token.refresh_token)?;
        }
        Err(e) => return Err(e),
    }

    Ok(Html(SIGNED_UP_PAGE))
}
