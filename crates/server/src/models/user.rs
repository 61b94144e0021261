//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use territory_core::{Email, UserId};

/// An account (domain type).
///
/// The password hash is deliberately not part of this type; it is only read
/// by [`crate::db::UserRepository::get_password_hash`] during login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalized email address.
    pub email: Email,
    /// Whether the email has been confirmed.
    pub email_verified: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
