// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed and encrypted cookie values carrying a [`TokenPair`].
//!
//! Wire format (all base64url, no padding):
//!
//! ```text
//! b64( timestamp "|" b64(nonce || ciphertext || tag) "|" b64(hmac) )
//! ```
//!
//! The HMAC-SHA256 covers `name|timestamp|payload`, so a value minted for one
//! cookie name does not verify under another. The AES-256-GCM key is derived
//! from the block secret with HKDF and shares nothing with the at-rest key.

use crate::config::ConfigError;
use crate::error::AppError;
use crate::models::TokenPair;
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Cookie values older than this are rejected (72 hours).
pub const COOKIE_MAX_AGE_SECS: i64 = 72 * 60 * 60;

/// Allowed clock skew for timestamps in the future.
const CLOCK_SKEW_SECS: i64 = 60;

const BLOCK_KEY_INFO: &[u8] = b"weekly-wrapped/cookie-block/v1";

/// Codec for the session cookie.
pub struct SecureCookieCodec {
    mac: HmacSha256,
    block: LessSafeKey,
    rng: SystemRandom,
}

impl SecureCookieCodec {
    /// Create a codec from the hash (MAC) secret and the block (encryption) secret.
    pub fn new(hash_key: &[u8], block_key: &[u8]) -> Result<Self, ConfigError> {
        if hash_key.is_empty() {
            return Err(ConfigError::Missing("COOKIE_HASH"));
        }
        if block_key.is_empty() {
            return Err(ConfigError::Missing("COOKIE_SALT"));
        }

        let mac = HmacSha256::new_from_slice(hash_key).map_err(|e| ConfigError::Invalid {
            name: "COOKIE_HASH",
            reason: e.to_string(),
        })?;

        let mut derived = [0u8; 32];
        Hkdf::<Sha256>::new(None, block_key)
            .expand(BLOCK_KEY_INFO, &mut derived)
            .map_err(|e| ConfigError::Invalid {
                name: "COOKIE_SALT",
                reason: e.to_string(),
            })?;
        let unbound = UnboundKey::new(&AES_256_GCM, &derived).map_err(|_| ConfigError::Invalid {
            name: "COOKIE_SALT",
            reason: "derived key rejected by AES-256-GCM".to_string(),
        })?;

        Ok(Self {
            mac,
            block: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Encode a token pair as the value of cookie `name`.
    pub fn encode(&self, name: &str, pair: &TokenPair) -> Result<String, AppError> {
        let json = serde_json::to_vec(pair)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Token serialization failed: {}", e)))?;
        self.seal_value(name, &json, Utc::now().timestamp())
    }

    /// Decode and verify the value of cookie `name`.
    ///
    /// Expiry of the embedded access token is not checked here.
    pub fn decode(&self, name: &str, value: &str) -> Result<TokenPair, AppError> {
        let json = self.open_value(name, value, Utc::now().timestamp())?;
        serde_json::from_slice(&json).map_err(|_| AppError::Malformed)
    }

    /// Decode cookie `name` from a request's cookie jar.
    pub fn read(&self, jar: &CookieJar, name: &str) -> Result<TokenPair, AppError> {
        let cookie = jar.get(name).ok_or(AppError::Absent)?;
        self.decode(name, cookie.value())
    }

    pub(crate) fn seal_value(
        &self,
        name: &str,
        plaintext: &[u8],
        timestamp: i64,
    ) -> Result<String, AppError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;

        let mut in_out = plaintext.to_vec();
        self.block
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(name.as_bytes()),
                &mut in_out,
            )
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Cookie encryption failed")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        let payload = URL_SAFE_NO_PAD.encode(sealed);

        let signature = URL_SAFE_NO_PAD.encode(self.sign(name, timestamp, &payload));
        let value = format!("{}|{}|{}", timestamp, payload, signature);
        Ok(URL_SAFE_NO_PAD.encode(value))
    }

    pub(crate) fn open_value(&self, name: &str, value: &str, now: i64) -> Result<Vec<u8>, AppError> {
        let outer = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|_| AppError::Tampered)?;
        let outer = String::from_utf8(outer).map_err(|_| AppError::Tampered)?;

        let parts: Vec<&str> = outer.splitn(3, '|').collect();
        let [timestamp, payload, signature] = parts[..] else {
            return Err(AppError::Tampered);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AppError::Tampered)?;
        let mut mac = self.mac.clone();
        mac.update(mac_input(name, timestamp, payload).as_bytes());
        if mac.verify_slice(&signature).is_err() {
            tracing::debug!(cookie = name, "Cookie signature mismatch");
            return Err(AppError::Tampered);
        }

        let timestamp: i64 = timestamp.parse().map_err(|_| AppError::Tampered)?;
        if now - timestamp > COOKIE_MAX_AGE_SECS || timestamp - now > CLOCK_SKEW_SECS {
            tracing::debug!(cookie = name, timestamp, "Cookie timestamp outside accepted window");
            return Err(AppError::Tampered);
        }

        let sealed = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AppError::Tampered)?;
        if sealed.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(AppError::Tampered);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| AppError::Tampered)?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .block
            .open_in_place(nonce, Aad::from(name.as_bytes()), &mut in_out)
            .map_err(|_| AppError::Tampered)?;

        Ok(plaintext.to_vec())
    }

    fn sign(&self, name: &str, timestamp: i64, payload: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(mac_input(name, &timestamp.to_string(), payload).as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

fn mac_input(name: &str, timestamp: &str, payload: &str) -> String {
    format!("{}|{}|{}", name, timestamp, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> SecureCookieCodec {
        SecureCookieCodec::new(b"hash-secret", b"block-secret").unwrap()
    }

    #[test]
    fn test_empty_secrets_rejected() {
        assert!(matches!(
            SecureCookieCodec::new(b"", b"block"),
            Err(ConfigError::Missing("COOKIE_HASH"))
        ));
        assert!(matches!(
            SecureCookieCodec::new(b"hash", b""),
            Err(ConfigError::Missing("COOKIE_SALT"))
        ));
    }

    #[test]
    fn test_authentic_non_token_payload_is_malformed() {
        let codec = codec();
        let value = codec
            .seal_value("accessToken", br#"{"hello":"world"}"#, Utc::now().timestamp())
            .unwrap();

        assert!(matches!(
            codec.decode("accessToken", &value),
            Err(AppError::Malformed)
        ));
    }

    #[test]
    fn test_expired_timestamp_rejected() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let issued = now - COOKIE_MAX_AGE_SECS - 1;
        let value = codec.seal_value("accessToken", b"{}", issued).unwrap();

        assert!(matches!(
            codec.open_value("accessToken", &value, now),
            Err(AppError::Tampered)
        ));
        assert!(codec
            .open_value("accessToken", &value, issued + COOKIE_MAX_AGE_SECS)
            .is_ok());
    }

    #[test]
    fn test_future_timestamp_rejected() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let value = codec
            .seal_value("accessToken", b"{}", now + CLOCK_SKEW_SECS + 10)
            .unwrap();

        assert!(matches!(
            codec.open_value("accessToken", &value, now),
            Err(AppError::Tampered)
        ));
    }
}
