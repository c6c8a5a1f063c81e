// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tests for the signed and encrypted session cookie.

use axum::http::{header, HeaderMap, HeaderValue};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, TimeZone, Utc};
use weekly_wrapped::error::AppError;
use weekly_wrapped::models::TokenPair;
use weekly_wrapped::services::SecureCookieCodec;

fn codec() -> SecureCookieCodec {
    SecureCookieCodec::new(b"cookie-hash-secret", b"cookie-block-secret").unwrap()
}

fn sample_pair() -> TokenPair {
    TokenPair {
        access_token: "AT1".to_string(),
        refresh_token: "RT1".to_string(),
        expires_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        scope: "user-top-read".to_string(),
    }
}

#[test]
fn test_round_trip() {
    let codec = codec();
    let value = codec.encode("accessToken", &sample_pair()).unwrap();

    assert_eq!(codec.decode("accessToken", &value).unwrap(), sample_pair());
}

#[test]
fn test_value_does_not_leak_tokens() {
    let value = codec().encode("accessToken", &sample_pair()).unwrap();
    let outer = String::from_utf8(URL_SAFE_NO_PAD.decode(&value).unwrap()).unwrap();

    assert!(!outer.contains("AT1"));
    assert!(!outer.contains("RT1"));
}

#[test]
fn test_expired_access_token_still_decodes() {
    let codec = codec();
    let pair = TokenPair {
        expires_at: Utc::now() - Duration::hours(1),
        ..sample_pair()
    };
    let value = codec.encode("accessToken", &pair).unwrap();

    assert_eq!(codec.decode("accessToken", &value).unwrap(), pair);
}

#[test]
fn test_modified_value_is_tampered() {
    let codec = codec();
    let value = codec.encode("accessToken", &sample_pair()).unwrap();

    let mut chars: Vec<char> = value.chars().collect();
    let middle = chars.len() / 2;
    chars[middle] = if chars[middle] == 'A' { 'B' } else { 'A' };
    let modified: String = chars.into_iter().collect();

    assert!(matches!(
        codec.decode("accessToken", &modified),
        Err(AppError::Tampered)
    ));
    assert!(matches!(
        codec.decode("accessToken", "garbage"),
        Err(AppError::Tampered)
    ));
    assert!(matches!(codec.decode("accessToken", ""), Err(AppError::Tampered)));
}

#[test]
fn test_value_bound_to_cookie_name() {
    let codec = codec();
    let value = codec.encode("accessToken", &sample_pair()).unwrap();

    assert!(matches!(
        codec.decode("otherCookie", &value),
        Err(AppError::Tampered)
    ));
}

#[test]
fn test_different_secrets_reject() {
    let value = codec().encode("accessToken", &sample_pair()).unwrap();

    let other_hash = SecureCookieCodec::new(b"other-hash", b"cookie-block-secret").unwrap();
    let other_block = SecureCookieCodec::new(b"cookie-hash-secret", b"other-block").unwrap();

    assert!(matches!(
        other_hash.decode("accessToken", &value),
        Err(AppError::Tampered)
    ));
    assert!(matches!(
        other_block.decode("accessToken", &value),
        Err(AppError::Tampered)
    ));
}

#[test]
fn test_read_from_jar() {
    let codec = codec();
    let value = codec.encode("accessToken", &sample_pair()).unwrap();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_str(&format!("accessToken={}", value)).unwrap(),
    );
    let jar = CookieJar::from_headers(&headers);

    assert_eq!(codec.read(&jar, "accessToken").unwrap(), sample_pair());
}

#[test]
fn test_missing_cookie_is_absent() {
    let jar = CookieJar::new();
    assert!(matches!(
        codec().read(&jar, "accessToken"),
        Err(AppError::Absent)
    ));
}
