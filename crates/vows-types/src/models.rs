use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account roles. Admins manage accounts; members create invitations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Role::Member),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// A guest's stated intention to attend, submitted alongside a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attendance {
    Attending,
    NotAttending,
    Undecided,
}

impl Attendance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attendance::Attending => "attending",
            Attendance::NotAttending => "not_attending",
            Attendance::Undecided => "undecided",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "attending" => Some(Attendance::Attending),
            "not_attending" => Some(Attendance::NotAttending),
            "undecided" => Some(Attendance::Undecided),
            _ => None,
        }
    }
}

/// One dated anecdote in the couple's love-story timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoveStoryEntry {
    pub year: String,
    pub title: String,
    pub content: String,
}

/// Bank-transfer details shown to guests who want to send a gift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
}

/// A user account as exposed over the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attendance_round_trip() {
        for a in [
            Attendance::Attending,
            Attendance::NotAttending,
            Attendance::Undecided,
        ] {
            assert_eq!(Attendance::parse(a.as_str()), Some(a));
        }
        assert_eq!(Attendance::parse("maybe"), None);
    }

    #[test]
    fn test_attendance_serde_uses_snake_case() {
        let json = serde_json::to_string(&Attendance::NotAttending).unwrap();
        assert_eq!(json, "\"not_attending\"");
        let parsed: Attendance = serde_json::from_str("\"attending\"").unwrap();
        assert_eq!(parsed, Attendance::Attending);
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("member"), Some(Role::Member));
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::Admin.as_str(), "admin");
    }
}
