pub mod admin;
pub mod auth;
pub mod comments;
pub mod error;
pub mod invitations;
pub mod middleware;

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use vows_db::Database;
use vows_storage::MediaStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub media: MediaStore,
    pub jwt_secret: String,
}

pub(crate) fn join_error(e: tokio::task::JoinError) -> error::ApiError {
    tracing::error!("spawn_blocking join error: {}", e);
    error::ApiError::Internal(anyhow::anyhow!("background task failed"))
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse RFC 3339 first, then fall back to naive UTC.
pub(crate) fn parse_db_time(value: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", value, e);
            DateTime::default()
        })
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// Fresh in-memory state for handler-level tests.
    pub(crate) async fn test_state() -> AppState {
        let dir = std::env::temp_dir().join(format!("vows-test-{}", uuid::Uuid::new_v4()));
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            media: MediaStore::new(dir, "/media".into()).await.unwrap(),
            jwt_secret: "test-secret".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_db_time_accepts_sqlite_format() {
        let dt = parse_db_time("2026-08-05 10:30:00");
        assert_eq!(dt.to_rfc3339(), "2026-08-05T10:30:00+00:00");
    }

    #[test]
    fn test_parse_db_time_accepts_rfc3339() {
        assert_eq!(
            parse_db_time("2026-08-05T10:30:00Z"),
            parse_db_time("2026-08-05 10:30:00")
        );
    }

    #[test]
    fn test_parse_db_time_garbage_falls_back() {
        assert_eq!(parse_db_time("not a date"), DateTime::<Utc>::default());
    }
}
