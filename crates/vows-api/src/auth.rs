use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info, warn};
use uuid::Uuid;

use vows_db::models::UserRow;
use vows_db::queries::is_unique_violation;
use vows_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use vows_types::models::{Role, User};

use crate::error::ApiError;
use crate::{AppState, join_error, parse_db_time};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if name.is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation("a valid email address is required".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }

    let db = state.clone();
    let lookup = email.clone();
    let existing = tokio::task::spawn_blocking(move || db.db.get_user_by_email(&lookup))
        .await
        .map_err(join_error)??;
    if existing.is_some() {
        return Err(ApiError::Conflict("that email is already registered".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    let db = state.clone();
    let (uid, insert_email) = (user_id.to_string(), email.clone());
    let insert = tokio::task::spawn_blocking(move || {
        db.db.create_user(
            &uid,
            &name,
            &insert_email,
            &password_hash,
            Role::Member.as_str(),
            false,
        )
    })
    .await
    .map_err(join_error)?;

    if let Err(e) = insert {
        // Two registrations can race past the lookup; the UNIQUE index wins.
        if is_unique_violation(&e, "users.email") {
            return Err(ApiError::Conflict("that email is already registered".into()));
        }
        return Err(e.into());
    }

    info!("Registered {} ({}), awaiting verification", email, user_id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            message: "account created; an administrator will verify it shortly".into(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();

    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_user_by_email(&email))
        .await
        .map_err(join_error)??
        .ok_or(ApiError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&row.password).map_err(|e| {
        error!("Stored hash unreadable for user {}: {}", row.id, e);
        ApiError::Internal(anyhow::anyhow!("corrupt password hash"))
    })?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    // Same generic rejection as a bad password; callers cannot probe which
    // accounts exist or are still pending verification.
    if !row.verified {
        return Err(ApiError::InvalidCredentials);
    }

    let user = user_to_model(&row);
    let token = create_token(&state.jwt_secret, &user)?;

    Ok(Json(LoginResponse { token, user }))
}

/// GET /me — the caller's current profile, read fresh from the store.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, ApiError> {
    let db = state.clone();
    let uid = claims.sub.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_user_by_id(&uid))
        .await
        .map_err(join_error)??
        .ok_or_else(|| ApiError::NotFound("account no longer exists".into()))?;

    Ok(Json(user_to_model(&row)))
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub(crate) fn user_to_model(row: &UserRow) -> User {
    User {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt user id '{}': {}", row.id, e);
            Uuid::default()
        }),
        name: row.name.clone(),
        email: row.email.clone(),
        role: Role::parse(&row.role).unwrap_or_else(|| {
            warn!("Unknown role '{}' on user '{}'", row.role, row.id);
            Role::Member
        }),
        verified: row.verified,
        created_at: parse_db_time(&row.created_at),
    }
}

fn create_token(secret: &str, user: &User) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_never_stores_plaintext() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("correct horse battery"));
    }

    #[test]
    fn test_verify_matches_only_original_password() {
        let hash = hash_password("first-dance-2026").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"first-dance-2026", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"first-dance-2027", &parsed)
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_unverified_login_rejected_until_verified() {
        let state = crate::test_util::test_state().await;

        let registered = register(
            State(state.clone()),
            Json(RegisterRequest {
                name: "Arif Rahman".into(),
                email: "arif@example.com".into(),
                password: "first-dance-2026".into(),
            }),
        )
        .await;
        assert!(registered.is_ok());

        let login_req = || LoginRequest {
            email: "arif@example.com".into(),
            password: "first-dance-2026".into(),
        };

        // Correct password, unverified account: same generic rejection.
        let err = login(State(state.clone()), Json(login_req()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::InvalidCredentials));

        let row = state.db.get_user_by_email("arif@example.com").unwrap().unwrap();
        state.db.set_user_verified(&row.id).unwrap();

        let ok = login(State(state.clone()), Json(login_req())).await.unwrap();
        assert!(!ok.0.token.is_empty());
        assert_eq!(ok.0.user.email, "arif@example.com");

        // Wrong password still rejected after verification.
        let err = login(
            State(state),
            Json(LoginRequest {
                email: "arif@example.com".into(),
                password: "wrong-password".into(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ApiError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_single_row() {
        let state = crate::test_util::test_state().await;

        let req = || RegisterRequest {
            name: "Dewi".into(),
            email: "dewi@example.com".into(),
            password: "first-dance-2026".into(),
        };

        assert!(register(State(state.clone()), Json(req())).await.is_ok());

        let err = register(State(state.clone()), Json(req()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::Conflict(_)));

        let count: i64 = state
            .db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_user_to_model_tolerates_corrupt_fields() {
        let row = UserRow {
            id: "not-a-uuid".into(),
            name: "Someone".into(),
            email: "s@example.com".into(),
            password: "hash".into(),
            role: "wizard".into(),
            verified: true,
            created_at: "garbage".into(),
        };
        let user = user_to_model(&row);
        assert_eq!(user.id, Uuid::default());
        assert_eq!(user.role, Role::Member);
    }
}
