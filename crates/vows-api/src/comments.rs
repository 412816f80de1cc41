use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;
use uuid::Uuid;

use vows_db::models::CommentRow;
use vows_types::api::{CommentResponse, CreateCommentRequest};
use vows_types::models::Attendance;

use crate::error::ApiError;
use crate::{AppState, join_error, parse_db_time};

/// POST /invitations/{slug}/comments — guest wishes and RSVP. No
/// authentication; the parent invitation must exist or nothing is written.
pub async fn create_comment(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment_id = Uuid::new_v4();

    let db = state.clone();
    let cid = comment_id.to_string();
    let (guest_name, message, attendance) =
        (req.guest_name.clone(), req.message.clone(), req.attendance);

    let invitation_id = tokio::task::spawn_blocking(move || {
        let Some(invitation) = db.db.get_invitation_by_slug(&slug)? else {
            return Ok::<_, anyhow::Error>(None);
        };
        db.db
            .insert_comment(&cid, &invitation.id, &guest_name, &message, attendance.as_str())?;
        Ok(Some(invitation.id))
    })
    .await
    .map_err(join_error)??;

    let Some(invitation_id) = invitation_id else {
        return Err(ApiError::NotFound("invitation not found".into()));
    };

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            id: comment_id,
            invitation_id: invitation_id.parse().unwrap_or_else(|e| {
                warn!("Corrupt invitation id '{}': {}", invitation_id, e);
                Uuid::default()
            }),
            guest_name: req.guest_name,
            message: req.message,
            attendance: req.attendance,
            created_at: chrono::Utc::now(),
        }),
    ))
}

pub(crate) fn comment_to_response(row: CommentRow) -> CommentResponse {
    CommentResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt comment id '{}': {}", row.id, e);
            Uuid::default()
        }),
        invitation_id: row.invitation_id.parse().unwrap_or_else(|e| {
            warn!("Corrupt invitation_id on comment '{}': {}", row.id, e);
            Uuid::default()
        }),
        guest_name: row.guest_name,
        message: row.message,
        attendance: Attendance::parse(&row.attendance).unwrap_or_else(|| {
            warn!(
                "Unknown attendance '{}' on comment '{}'",
                row.attendance, row.id
            );
            Attendance::Undecided
        }),
        created_at: parse_db_time(&row.created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_to_response_maps_attendance() {
        let row = CommentRow {
            id: Uuid::new_v4().to_string(),
            invitation_id: Uuid::new_v4().to_string(),
            guest_name: "Budi".into(),
            message: "Selamat!".into(),
            attendance: "not_attending".into(),
            created_at: "2026-08-05 10:30:00".into(),
        };
        let resp = comment_to_response(row);
        assert_eq!(resp.attendance, Attendance::NotAttending);
        assert_eq!(resp.guest_name, "Budi");
    }

    #[tokio::test]
    async fn test_comment_on_missing_invitation_creates_nothing() {
        let state = crate::test_util::test_state().await;

        let err = create_comment(
            axum::extract::State(state.clone()),
            axum::extract::Path("no-such-slug".into()),
            Json(CreateCommentRequest {
                guest_name: "Budi".into(),
                message: "Selamat!".into(),
                attendance: Attendance::Attending,
            }),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ApiError::NotFound(_)));

        let count: i64 = state
            .db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_unknown_attendance_degrades_to_undecided() {
        let row = CommentRow {
            id: "c1".into(),
            invitation_id: "inv1".into(),
            guest_name: "Budi".into(),
            message: "Selamat!".into(),
            attendance: "maybe".into(),
            created_at: "2026-08-05 10:30:00".into(),
        };
        assert_eq!(comment_to_response(row).attendance, Attendance::Undecided);
    }
}
