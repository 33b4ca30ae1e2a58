/// User accounts and login sessions

pub mod manager;

pub use manager::AccountManager;

use chrono::{DateTime, Utc};

/// A registered user
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A login session backed by a row in the sessions table
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// The authenticated caller, resolved from a session token.
///
/// Passed explicitly into every operation that needs an authorization
/// decision; there is no ambient security context.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
}
