//! Session types.

use chrono::{DateTime, Utc};

use territory_core::{SessionId, UserId};

use super::User;

/// A server-side session record.
///
/// `token` is the signed JWT handed to the browser in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The account.
    pub user: User,
    /// The session the request was authenticated with.
    pub session: Session,
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn test_session_expiry_boundary() {
        let now = Utc::now();
        let session = Session {
            id: SessionId::new(1),
            token: "t".to_string(),
            user_id: UserId::new(1),
            expires_at: now,
            created_at: now - TimeDelta::days(1),
        };
        assert!(session.is_expired_at(now));
        assert!(!session.is_expired_at(now - TimeDelta::seconds(1)));
    }
}
