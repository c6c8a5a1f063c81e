//! Registered user row as persisted.

/// A registered user's credential, as stored.
///
/// `spotify_id_encrypted` and `refresh_token_encrypted` are CryptoBox output;
/// `lookup_key` is the deterministic tag of the Spotify user id and is the
/// only column queried by equality.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub lookup_key: String,
    pub spotify_id_encrypted: String,
    pub refresh_token_encrypted: String,
    /// When the user signed up (RFC 3339)
    pub created_at: String,
}
