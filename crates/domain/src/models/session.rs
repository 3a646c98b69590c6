//! Login sessions and session event lookup data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event key logged after a successful login.
pub const LOGIN_SUCCESS: &str = "LOGIN_SUCCESS";

/// Event key logged after a rejected login.
pub const LOGIN_FAILED: &str = "LOGIN_FAILED";

/// Event key logged when a session is ended by the user.
pub const LOGOUT: &str = "LOGOUT";

/// A kind of event that can be written to a session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub id: i32,
    pub key: String,
    pub description: String,
}

/// Finds the event with the given key.
pub fn find_event<'a>(events: &'a [SessionEvent], key: &str) -> Option<&'a SessionEvent> {
    events.iter().find(|e| e.key == key)
}

/// A login session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.ended_at.is_none() && self.expires_at > now
    }
}

/// Insert shape for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
}

/// Insert shape for a session log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSessionLog {
    pub session_id: Uuid,
    pub event_id: i32,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_find_event() {
        let events = vec![
            SessionEvent {
                id: 1,
                key: LOGIN_SUCCESS.to_string(),
                description: "Login".to_string(),
            },
            SessionEvent {
                id: 3,
                key: LOGOUT.to_string(),
                description: "Logout".to_string(),
            },
        ];
        assert_eq!(find_event(&events, LOGOUT).map(|e| e.id), Some(3));
        assert!(find_event(&events, LOGIN_FAILED).is_none());
    }

    #[test]
    fn test_session_activity() {
        let now = Utc::now();
        let mut session = Session {
            id: Uuid::new_v4(),
            user_id: None,
            created_at: now,
            expires_at: now + Duration::minutes(5),
            ended_at: None,
        };
        assert!(session.is_active(now));
        assert!(!session.is_active(now + Duration::minutes(6)));

        session.ended_at = Some(now);
        assert!(!session.is_active(now));
    }
}
