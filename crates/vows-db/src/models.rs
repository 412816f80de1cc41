/// Row structs mirroring the SQLite schema. The API layer owns the mapping
/// to vows-types models; at this level `love_story` and `gallery` are raw
/// JSON text and timestamps are whatever SQLite handed back.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub verified: bool,
    pub created_at: String,
}

pub struct InvitationRow {
    pub id: String,
    pub slug: String,
    pub user_id: String,
    pub groom_name: String,
    pub groom_nick: String,
    pub bride_name: String,
    pub bride_nick: String,
    pub event_date: String,
    pub location: String,
    pub message: String,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub account_holder: Option<String>,
    pub groom_photo: Option<String>,
    pub bride_photo: Option<String>,
    pub love_story: String,
    pub gallery: String,
    pub created_at: String,
}

/// Insert payload for an invitation. `created_at` comes from the DB default.
pub struct NewInvitation {
    pub id: String,
    pub slug: String,
    pub user_id: String,
    pub groom_name: String,
    pub groom_nick: String,
    pub bride_name: String,
    pub bride_nick: String,
    pub event_date: String,
    pub location: String,
    pub message: String,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub account_holder: Option<String>,
    pub groom_photo: Option<String>,
    pub bride_photo: Option<String>,
    pub love_story: String,
    pub gallery: String,
}

pub struct CommentRow {
    pub id: String,
    pub invitation_id: String,
    pub guest_name: String,
    pub message: String,
    pub attendance: String,
    pub created_at: String,
}

pub struct AdminUserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub verified: bool,
    pub invitation_count: i64,
    pub created_at: String,
}
