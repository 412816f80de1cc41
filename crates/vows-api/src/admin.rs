use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use vows_db::Database;
use vows_types::api::{AdminUserResponse, Claims};
use vows_types::models::Role;

use crate::error::ApiError;
use crate::{AppState, auth, join_error, parse_db_time};

/// GET /admin/users — every account with its invitation count.
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminUserResponse>>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_users())
        .await
        .map_err(join_error)??;

    let users = rows
        .into_iter()
        .map(|row| AdminUserResponse {
            id: row.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt user id '{}': {}", row.id, e);
                Uuid::default()
            }),
            name: row.name,
            email: row.email,
            role: Role::parse(&row.role).unwrap_or(Role::Member),
            verified: row.verified,
            invitation_count: row.invitation_count.max(0) as u32,
            created_at: parse_db_time(&row.created_at),
        })
        .collect();

    Ok(Json(users))
}

/// POST /admin/users/{id}/verify — flip the verification flag.
pub async fn verify_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = id.to_string();
    let updated = tokio::task::spawn_blocking(move || db.db.set_user_verified(&uid))
        .await
        .map_err(join_error)??;

    if !updated {
        return Err(ApiError::NotFound("user not found".into()));
    }

    info!("User {} verified", id);
    Ok(Json(serde_json::json!({ "verified": true })))
}

enum RemoveOutcome {
    Removed,
    NotFound,
    IsAdmin,
}

/// DELETE /admin/users/{id} — remove an account. The user's invitations are
/// deleted explicitly first, then the user; comments go via cascade.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if id == claims.sub {
        return Err(ApiError::Forbidden(
            "admins cannot delete their own account".into(),
        ));
    }

    let db = state.clone();
    let uid = id.to_string();
    let outcome = tokio::task::spawn_blocking(move || {
        let Some(target) = db.db.get_user_by_id(&uid)? else {
            return Ok::<_, anyhow::Error>(RemoveOutcome::NotFound);
        };
        if Role::parse(&target.role) == Some(Role::Admin) {
            return Ok(RemoveOutcome::IsAdmin);
        }
        db.db.delete_user_with_invitations(&uid)?;
        Ok(RemoveOutcome::Removed)
    })
    .await
    .map_err(join_error)??;

    match outcome {
        RemoveOutcome::Removed => {
            info!("User {} deleted by admin {}", id, claims.email);
            Ok(StatusCode::NO_CONTENT)
        }
        RemoveOutcome::IsAdmin => Err(ApiError::Forbidden(
            "cannot delete an admin account".into(),
        )),
        RemoveOutcome::NotFound => Err(ApiError::NotFound("user not found".into())),
    }
}

/// Seed the configured admin account at startup when it does not exist yet.
/// Replaces the hardcoded-sentinel pattern with a provisioned role.
pub fn seed_admin(db: &Database, email: &str, password: &str) -> anyhow::Result<()> {
    let email = email.trim().to_lowercase();

    if let Some(existing) = db.get_user_by_email(&email)? {
        if Role::parse(&existing.role) != Some(Role::Admin) {
            warn!(
                "Configured admin email {} belongs to a non-admin account; leaving it untouched",
                email
            );
        } else {
            info!("Admin account {} already present", email);
        }
        return Ok(());
    }

    let id = Uuid::new_v4();
    let hash = auth::hash_password(password)?;
    db.create_user(
        &id.to_string(),
        "Administrator",
        &email,
        &hash,
        Role::Admin.as_str(),
        true,
    )?;

    info!("Seeded admin account {} ({})", email, id);
    Ok(())
}
