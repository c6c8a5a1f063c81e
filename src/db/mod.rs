//! Database layer (SQLite).

pub mod sqlite;

pub use sqlite::Database;

/// Table names as constants.
pub mod tables {
    pub const USERS: &str = "users";
    pub const WRAPS: &str = "wraps";
}
