use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Attendance, BankDetails, LoveStoryEntry, Role, User};

// -- JWT Claims --

/// JWT claims shared by the login handler (minting) and the auth middleware
/// (validation). Canonical definition lives here in vows-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

// -- Invitations --

#[derive(Debug, Clone, Serialize)]
pub struct InvitationResponse {
    pub id: Uuid,
    pub slug: String,
    pub user_id: Uuid,
    pub groom_name: String,
    pub groom_nick: String,
    pub bride_name: String,
    pub bride_nick: String,
    pub event_date: String,
    pub location: String,
    pub message: String,
    pub bank: Option<BankDetails>,
    pub groom_photo: Option<String>,
    pub bride_photo: Option<String>,
    pub love_story: Vec<LoveStoryEntry>,
    pub gallery: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Guest-facing page data: the invitation plus its comment wall.
#[derive(Debug, Serialize)]
pub struct PublicInvitationResponse {
    pub invitation: InvitationResponse,
    pub comments: Vec<CommentResponse>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub guest_name: String,
    pub message: String,
    pub attendance: Attendance,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub invitation_id: Uuid,
    pub guest_name: String,
    pub message: String,
    pub attendance: Attendance,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// -- Admin --

#[derive(Debug, Serialize)]
pub struct AdminUserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    pub invitation_count: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
