// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod batch;
pub mod cookie;
pub mod credentials;
pub mod crypto;
pub mod lifecycle;
pub mod schedule;
pub mod spotify;

pub use batch::{BatchRefresher, BatchReport};
pub use cookie::SecureCookieCodec;
pub use credentials::CredentialStore;
pub use crypto::CryptoBox;
pub use lifecycle::TokenLifecycle;
pub use schedule::WeeklySchedule;
pub use spotify::SpotifyClient;
