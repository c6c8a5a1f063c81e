// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Symmetric encryption for identifiers and tokens at rest.
//!
//! AES-256-GCM with a fresh random 96-bit nonce per message. Output is
//! `hex(nonce || ciphertext || tag)`. The nonce is generated here and can
//! never be supplied by a caller.
//!
//! Randomized ciphertexts cannot be compared for equality, so lookups use
//! [`CryptoBox::lookup_tag`]: an HMAC-SHA256 of the plaintext under a key
//! derived from the master key.

use crate::config::ConfigError;
use crate::error::AppError;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Required master key length (AES-256).
pub const KEY_LEN: usize = 32;

const LOOKUP_KEY_INFO: &[u8] = b"weekly-wrapped/user-lookup/v1";

/// Authenticated encryption with a process-wide key.
#[derive(Clone)]
pub struct CryptoBox {
    key: Arc<LessSafeKey>,
    lookup_mac: HmacSha256,
    rng: SystemRandom,
}

impl CryptoBox {
    /// Create a box from a raw 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self, ConfigError> {
        if key.len() != KEY_LEN {
            return Err(ConfigError::Invalid {
                name: "AES_KEY",
                reason: format!("expected {} bytes, got {}", KEY_LEN, key.len()),
            });
        }

        let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| ConfigError::Invalid {
            name: "AES_KEY",
            reason: "rejected by AES-256-GCM".to_string(),
        })?;

        let mut lookup_key = [0u8; 32];
        Hkdf::<Sha256>::new(None, key)
            .expand(LOOKUP_KEY_INFO, &mut lookup_key)
            .map_err(|e| ConfigError::Invalid {
                name: "AES_KEY",
                reason: format!("lookup key derivation failed: {}", e),
            })?;
        let lookup_mac =
            HmacSha256::new_from_slice(&lookup_key).map_err(|e| ConfigError::Invalid {
                name: "AES_KEY",
                reason: format!("lookup key rejected: {}", e),
            })?;

        Ok(Self {
            key: Arc::new(LessSafeKey::new(unbound)),
            lookup_mac,
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt plaintext. Every call uses a new nonce.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        self.seal(plaintext, b"")
    }

    /// Decrypt a value produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, token: &str) -> Result<String, AppError> {
        self.open(token, b"")
    }

    /// Encrypt plaintext bound to `context`; decrypting under any other
    /// context fails the integrity check.
    pub fn encrypt_bound(&self, plaintext: &str, context: &[u8]) -> Result<String, AppError> {
        self.seal(plaintext, context)
    }

    /// Decrypt a value produced by [`encrypt_bound`](Self::encrypt_bound).
    pub fn decrypt_bound(&self, token: &str, context: &[u8]) -> Result<String, AppError> {
        self.open(token, context)
    }

    /// Deterministic, non-reversible tag of `plaintext` for equality lookups.
    pub fn lookup_tag(&self, plaintext: &str) -> String {
        let mut mac = self.lookup_mac.clone();
        mac.update(plaintext.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn seal(&self, plaintext: &str, aad: &[u8]) -> Result<String, AppError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(aad),
                &mut in_out,
            )
            .map_err(|_| AppError::Internal(anyhow::anyhow!("AES-GCM seal failed")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(hex::encode(sealed))
    }

    fn open(&self, token: &str, aad: &[u8]) -> Result<String, AppError> {
        let sealed = hex::decode(token).map_err(|_| AppError::Integrity)?;
        if sealed.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(AppError::Integrity);
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| AppError::Integrity)?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(aad), &mut in_out)
            .map_err(|_| AppError::Integrity)?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| AppError::Integrity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_box() -> CryptoBox {
        CryptoBox::new(&[7u8; KEY_LEN]).unwrap()
    }

    #[test]
    fn test_key_length_validation() {
        assert!(CryptoBox::new(&[0u8; KEY_LEN]).is_ok());
        assert!(matches!(
            CryptoBox::new(&[0u8; 16]),
            Err(ConfigError::Invalid { name: "AES_KEY", .. })
        ));
        assert!(CryptoBox::new(&[]).is_err());
        assert!(CryptoBox::new(&[0u8; 33]).is_err());
    }

    #[test]
    fn test_output_is_hex_with_nonce_prefix() {
        let sealed = test_box().encrypt("abc").unwrap();
        let bytes = hex::decode(&sealed).unwrap();
        assert_eq!(bytes.len(), NONCE_LEN + 3 + AES_256_GCM.tag_len());
    }

    #[test]
    fn test_bound_context_mismatch_fails() {
        let crypto = test_box();
        let sealed = crypto.encrypt_bound("refresh", b"user-a").unwrap();

        assert_eq!(crypto.decrypt_bound(&sealed, b"user-a").unwrap(), "refresh");
        assert!(matches!(
            crypto.decrypt_bound(&sealed, b"user-b"),
            Err(AppError::Integrity)
        ));
        assert!(matches!(crypto.decrypt(&sealed), Err(AppError::Integrity)));
    }

    #[test]
    fn test_lookup_tag_is_deterministic_and_keyed() {
        let a = test_box();
        let b = CryptoBox::new(&[8u8; KEY_LEN]).unwrap();

        assert_eq!(a.lookup_tag("u1"), a.lookup_tag("u1"));
        assert_ne!(a.lookup_tag("u1"), a.lookup_tag("u2"));
        assert_ne!(a.lookup_tag("u1"), b.lookup_tag("u1"));
        assert!(!a.lookup_tag("u1").contains("u1"));
    }
}
