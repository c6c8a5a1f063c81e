// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod token;
pub mod user;
pub mod wrapped;

pub use token::TokenPair;
pub use user::StoredUser;
pub use wrapped::{StoredWrap, WrappedSnapshot};
