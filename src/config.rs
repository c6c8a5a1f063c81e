//! Application configuration loaded from environment variables.
//!
//! Secret material (AES key, cookie keys, Spotify client secret) is read once
//! at startup and held in memory for the life of the process.

use chrono::Weekday;
use std::env;
use std::time::Duration;

/// Largest batch worker pool we allow, regardless of configuration.
pub const MAX_BATCH_CONCURRENCY: usize = 8;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Spotify OAuth client ID (public)
    pub spotify_client_id: String,
    /// Redirect URI registered with Spotify; must match on code exchange
    pub redirect_uri: String,
    /// OAuth scopes requested at authorization
    pub scope: String,
    /// Base URL of the Spotify accounts service (authorize + token endpoints)
    pub accounts_url: String,
    /// Base URL of the Spotify Web API (identity + top items)
    pub api_url: String,
    /// SQLite database path (`:memory:` for an ephemeral store)
    pub database_url: String,
    /// Server port
    pub port: u16,
    /// Timeout applied to every outbound HTTP call
    pub http_timeout: Duration,
    /// Number of users refreshed concurrently by the weekly batch
    pub batch_concurrency: usize,
    /// Day of week the batch runs (UTC)
    pub batch_weekday: Weekday,
    /// Hour of day the batch runs (UTC)
    pub batch_hour: u32,

    // --- Secrets ---
    /// Spotify OAuth client secret
    pub spotify_client_secret: String,
    /// 32-byte key protecting stored identifiers and refresh tokens
    pub aes_key: Vec<u8>,
    /// Secret the cookie encryption key is derived from
    pub cookie_block_key: Vec<u8>,
    /// HMAC key authenticating the session cookie
    pub cookie_hash_key: Vec<u8>,
    /// HMAC key signing the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            spotify_client_id: "test_client_id".to_string(),
            redirect_uri: "http://localhost:3000/code".to_string(),
            scope: "user-top-read".to_string(),
            accounts_url: "https://accounts.spotify.com".to_string(),
            api_url: "https://api.spotify.com".to_string(),
            database_url: ":memory:".to_string(),
            port: 3000,
            http_timeout: Duration::from_secs(10),
            batch_concurrency: 4,
            batch_weekday: Weekday::Fri,
            batch_hour: 17,
            spotify_client_secret: "test_secret".to_string(),
            aes_key: b"0123456789abcdef0123456789abcdef".to_vec(),
            cookie_block_key: b"test_cookie_salt".to_vec(),
            cookie_hash_key: b"test_cookie_hash".to_vec(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let cookie_hash_key = required("COOKIE_HASH")?.into_bytes();

        Ok(Self {
            spotify_client_id: required("SPOTIFY_CLIENT")?,
            redirect_uri: env::var("REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:3000/code".to_string()),
            scope: env::var("SPOTIFY_SCOPE").unwrap_or_else(|_| "user-top-read".to_string()),
            accounts_url: env::var("SPOTIFY_ACCOUNTS_URL")
                .unwrap_or_else(|_| "https://accounts.spotify.com".to_string()),
            api_url: env::var("SPOTIFY_API_URL")
                .unwrap_or_else(|_| "https://api.spotify.com".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "weekly-wrapped.db".to_string()),
            port: parsed_or("PORT", 3000)?,
            http_timeout: Duration::from_secs(parsed_or("HTTP_TIMEOUT_SECS", 10)?),
            batch_concurrency: parsed_or::<usize>("BATCH_CONCURRENCY", 4)?
                .clamp(1, MAX_BATCH_CONCURRENCY),
            batch_weekday: parsed_or("BATCH_WEEKDAY", Weekday::Fri)?,
            batch_hour: parsed_or("BATCH_HOUR", 17)?,

            spotify_client_secret: required("SPOTIFY_SECRET")?.trim().to_string(),
            aes_key: required("AES_KEY")?.into_bytes(),
            cookie_block_key: required("COOKIE_SALT")?.into_bytes(),
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map(String::into_bytes)
                .unwrap_or_else(|_| cookie_hash_key.clone()),
            cookie_hash_key,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parsed_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("cannot parse {:?}", raw),
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("SPOTIFY_CLIENT", "test_id");
        env::set_var("SPOTIFY_SECRET", " test_secret\n");
        env::set_var("AES_KEY", "0123456789abcdef0123456789abcdef");
        env::set_var("COOKIE_SALT", "salt");
        env::set_var("COOKIE_HASH", "hash");
        env::set_var("BATCH_CONCURRENCY", "64");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.spotify_client_id, "test_id");
        assert_eq!(config.spotify_client_secret, "test_secret");
        assert_eq!(config.port, 3000);
        assert_eq!(config.batch_weekday, Weekday::Fri);
        assert_eq!(config.batch_concurrency, MAX_BATCH_CONCURRENCY);
        assert_eq!(config.oauth_state_key, b"hash".to_vec());
    }
}
