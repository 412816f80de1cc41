use std::collections::{BTreeMap, HashMap};

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use vows_db::models::{InvitationRow, NewInvitation};
use vows_db::queries::is_unique_violation;
use vows_storage::MediaStore;
use vows_types::api::{Claims, InvitationResponse, PublicInvitationResponse};
use vows_types::models::{BankDetails, LoveStoryEntry};

use crate::comments::comment_to_response;
use crate::error::ApiError;
use crate::{AppState, join_error, parse_db_time};

/// Form-layer bounds, also enforced here so no client can exceed them.
const GALLERY_SLOTS: usize = 10;
const LOVE_STORY_SLOTS: usize = 3;

const SLUG_MIN: usize = 3;
const SLUG_MAX: usize = 64;

/// POST /invitations — multipart composer form.
///
/// Ownership comes from the verified claims, never from a form field. Each
/// uploaded image is stored before the row insert; if a later upload or the
/// insert itself fails, every object stored for this request is deleted
/// again so no half-created invitation leaves orphans behind.
pub async fn create_invitation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_composer_form(multipart).await?;

    let text = |key: &str| -> String {
        form.fields
            .get(key)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    let optional = |key: &str| -> Option<String> {
        let value = text(key);
        (!value.is_empty()).then_some(value)
    };

    let groom_name = text("groom_name");
    let bride_name = text("bride_name");
    if groom_name.is_empty() || bride_name.is_empty() {
        return Err(ApiError::Validation(
            "both partners' names are required".into(),
        ));
    }
    let groom_nick = text("groom_nick");
    let bride_nick = text("bride_nick");

    let slug = match optional("slug") {
        Some(requested) => {
            if !valid_slug(&requested) {
                return Err(ApiError::Validation(
                    "links may use 3-64 lowercase letters, digits and dashes".into(),
                ));
            }
            requested
        }
        None => generate_slug(
            if groom_nick.is_empty() { &groom_name } else { &groom_nick },
            if bride_nick.is_empty() { &bride_name } else { &bride_nick },
        ),
    };

    let love_story = collect_love_story(&form.fields);

    // Upload phase. `uploaded` tracks object keys for compensation.
    let mut uploaded: Vec<String> = Vec::new();

    let groom_photo = match &form.groom_photo {
        Some((name, data)) => Some(store_upload(&state, &mut uploaded, name, data).await?),
        None => None,
    };
    let bride_photo = match &form.bride_photo {
        Some((name, data)) => Some(store_upload(&state, &mut uploaded, name, data).await?),
        None => None,
    };

    let mut gallery: Vec<String> = Vec::new();
    for (name, data) in form.gallery.values() {
        gallery.push(store_upload(&state, &mut uploaded, name, data).await?);
    }

    let bank = match (
        optional("bank_name"),
        optional("account_number"),
        optional("account_holder"),
    ) {
        (Some(bank_name), Some(account_number), Some(account_holder)) => Some(BankDetails {
            bank_name,
            account_number,
            account_holder,
        }),
        _ => None,
    };

    let response = InvitationResponse {
        id: Uuid::new_v4(),
        slug,
        user_id: claims.sub,
        groom_name,
        groom_nick,
        bride_name,
        bride_nick,
        event_date: text("event_date"),
        location: text("location"),
        message: text("message"),
        bank,
        groom_photo,
        bride_photo,
        love_story,
        gallery,
        created_at: chrono::Utc::now(),
    };

    let row = match new_invitation_row(&response) {
        Ok(row) => row,
        Err(e) => {
            rollback_uploads(&state, &uploaded).await;
            return Err(ApiError::Internal(anyhow::anyhow!(
                "failed to encode invitation payload: {}",
                e
            )));
        }
    };

    let db = state.clone();
    let insert = match tokio::task::spawn_blocking(move || db.db.insert_invitation(&row)).await {
        Ok(result) => result,
        Err(e) => {
            rollback_uploads(&state, &uploaded).await;
            return Err(join_error(e));
        }
    };

    if let Err(e) = insert {
        rollback_uploads(&state, &uploaded).await;
        if is_unique_violation(&e, "invitations.slug") {
            return Err(ApiError::Conflict(
                "that invitation link is already taken".into(),
            ));
        }
        return Err(e.into());
    }

    info!(
        "Invitation {} (/{}) created by {}",
        response.id, response.slug, claims.email
    );

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /invitations/{slug} — the guest-facing page data. No authentication;
/// anyone holding the link can view.
pub async fn get_public_invitation(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let (invitation, comments) = tokio::task::spawn_blocking(move || {
        let Some(invitation) = db.db.get_invitation_by_slug(&slug)? else {
            return Ok::<_, anyhow::Error>((None, Vec::new()));
        };
        let comments = db.db.get_comments_for_invitation(&invitation.id)?;
        Ok((Some(invitation), comments))
    })
    .await
    .map_err(join_error)??;

    let Some(invitation) = invitation else {
        return Err(ApiError::NotFound("invitation not found".into()));
    };

    Ok(Json(PublicInvitationResponse {
        invitation: invitation_to_response(invitation),
        comments: comments.into_iter().map(comment_to_response).collect(),
    }))
}

/// GET /me/invitations — the caller's dashboard listing, newest-first.
pub async fn list_my_invitations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = claims.sub.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.list_invitations_by_user(&uid))
        .await
        .map_err(join_error)??;

    let invitations: Vec<InvitationResponse> =
        rows.into_iter().map(invitation_to_response).collect();

    Ok(Json(invitations))
}

enum DeleteOutcome {
    Deleted,
    NotOwner,
    NotFound,
}

/// DELETE /me/invitations/{id} — owner-gated. Comments go via the FK
/// cascade; uploaded media objects are left behind.
pub async fn delete_invitation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let db = state.clone();
    let (invitation_id, user_id) = (id.to_string(), claims.sub.to_string());

    let outcome = tokio::task::spawn_blocking(move || {
        let Some(row) = db.db.get_invitation_by_id(&invitation_id)? else {
            return Ok::<_, anyhow::Error>(DeleteOutcome::NotFound);
        };
        if row.user_id != user_id {
            return Ok(DeleteOutcome::NotOwner);
        }
        db.db.delete_invitation_owned(&invitation_id, &user_id)?;
        Ok(DeleteOutcome::Deleted)
    })
    .await
    .map_err(join_error)??;

    match outcome {
        DeleteOutcome::Deleted => {
            info!("Invitation {} deleted by {}", id, claims.email);
            Ok(StatusCode::NO_CONTENT)
        }
        DeleteOutcome::NotOwner => Err(ApiError::Forbidden(
            "only the owner can delete an invitation".into(),
        )),
        DeleteOutcome::NotFound => Err(ApiError::NotFound("invitation not found".into())),
    }
}

// ── Multipart form assembly ─────────────────────────────────────────────

struct ComposerForm {
    fields: HashMap<String, String>,
    groom_photo: Option<(String, Bytes)>,
    bride_photo: Option<(String, Bytes)>,
    /// Slot index → (original filename, data). BTreeMap keeps gallery order.
    gallery: BTreeMap<usize, (String, Bytes)>,
}

async fn read_composer_form(mut multipart: Multipart) -> Result<ComposerForm, ApiError> {
    let mut form = ComposerForm {
        fields: HashMap::new(),
        groom_photo: None,
        bride_photo: None,
        gallery: BTreeMap::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("malformed multipart form".into()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(filename) = field.file_name().map(str::to_string) {
            let data = field
                .bytes()
                .await
                .map_err(|_| ApiError::Validation("failed to read uploaded file".into()))?;
            // Browsers submit an empty part for unselected file inputs.
            if data.is_empty() {
                continue;
            }
            match name.as_str() {
                "groom_photo" => form.groom_photo = Some((filename, data)),
                "bride_photo" => form.bride_photo = Some((filename, data)),
                _ => {
                    if let Some(slot) = gallery_slot(&name) {
                        form.gallery.insert(slot, (filename, data));
                    }
                    // Unknown file fields are dropped.
                }
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|_| ApiError::Validation("malformed multipart form".into()))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

fn gallery_slot(field_name: &str) -> Option<usize> {
    let slot: usize = field_name.strip_prefix("gallery_")?.parse().ok()?;
    (1..=GALLERY_SLOTS).contains(&slot).then_some(slot)
}

/// Coalesce indexed love-story fields into an ordered list. An index whose
/// title is empty or missing is skipped: order preserved, gaps removed.
fn collect_love_story(fields: &HashMap<String, String>) -> Vec<LoveStoryEntry> {
    let mut entries = Vec::new();
    for i in 1..=LOVE_STORY_SLOTS {
        let title = fields
            .get(&format!("story_title_{i}"))
            .map(|s| s.trim())
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }
        entries.push(LoveStoryEntry {
            year: fields
                .get(&format!("story_year_{i}"))
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            title: title.to_string(),
            content: fields
                .get(&format!("story_content_{i}"))
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        });
    }
    entries
}

// ── Uploads ─────────────────────────────────────────────────────────────

async fn store_upload(
    state: &AppState,
    uploaded: &mut Vec<String>,
    original_name: &str,
    data: &[u8],
) -> Result<String, ApiError> {
    let key = MediaStore::object_key(original_name);
    match state.media.store(&key, data).await {
        Ok(url) => {
            uploaded.push(key);
            Ok(url)
        }
        Err(e) => {
            error!("Upload of '{}' failed: {:#}", original_name, e);
            rollback_uploads(state, uploaded).await;
            Err(ApiError::Internal(e))
        }
    }
}

async fn rollback_uploads(state: &AppState, keys: &[String]) {
    for key in keys {
        if let Err(e) = state.media.delete(key).await {
            warn!("Failed to roll back uploaded object {}: {:#}", key, e);
        }
    }
}

// ── Slugs ───────────────────────────────────────────────────────────────

fn valid_slug(slug: &str) -> bool {
    (SLUG_MIN..=SLUG_MAX).contains(&slug.len())
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_dash = true;
    for c in input.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
            prev_dash = false;
        } else if !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

fn generate_slug(groom: &str, bride: &str) -> String {
    let mut base = slugify(&format!("{groom} {bride}"));
    if base.is_empty() {
        base = "wedding".to_string();
    }
    // Leave room for the dash and suffix within SLUG_MAX.
    base.truncate(SLUG_MAX - 7);
    while base.ends_with('-') {
        base.pop();
    }
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", base, &suffix[..6])
}

// ── Row mapping ─────────────────────────────────────────────────────────

fn new_invitation_row(inv: &InvitationResponse) -> serde_json::Result<NewInvitation> {
    Ok(NewInvitation {
        id: inv.id.to_string(),
        slug: inv.slug.clone(),
        user_id: inv.user_id.to_string(),
        groom_name: inv.groom_name.clone(),
        groom_nick: inv.groom_nick.clone(),
        bride_name: inv.bride_name.clone(),
        bride_nick: inv.bride_nick.clone(),
        event_date: inv.event_date.clone(),
        location: inv.location.clone(),
        message: inv.message.clone(),
        bank_name: inv.bank.as_ref().map(|b| b.bank_name.clone()),
        account_number: inv.bank.as_ref().map(|b| b.account_number.clone()),
        account_holder: inv.bank.as_ref().map(|b| b.account_holder.clone()),
        groom_photo: inv.groom_photo.clone(),
        bride_photo: inv.bride_photo.clone(),
        love_story: serde_json::to_string(&inv.love_story)?,
        gallery: serde_json::to_string(&inv.gallery)?,
    })
}

pub(crate) fn invitation_to_response(row: InvitationRow) -> InvitationResponse {
    let love_story: Vec<LoveStoryEntry> =
        serde_json::from_str(&row.love_story).unwrap_or_else(|e| {
            warn!("Corrupt love_story on invitation '{}': {}", row.id, e);
            Vec::new()
        });
    let gallery: Vec<String> = serde_json::from_str(&row.gallery).unwrap_or_else(|e| {
        warn!("Corrupt gallery on invitation '{}': {}", row.id, e);
        Vec::new()
    });

    let bank = match (row.bank_name, row.account_number, row.account_holder) {
        (Some(bank_name), Some(account_number), Some(account_holder)) => Some(BankDetails {
            bank_name,
            account_number,
            account_holder,
        }),
        _ => None,
    };

    InvitationResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt invitation id '{}': {}", row.id, e);
            Uuid::default()
        }),
        slug: row.slug,
        user_id: row.user_id.parse().unwrap_or_else(|e| {
            warn!("Corrupt user_id on invitation '{}': {}", row.id, e);
            Uuid::default()
        }),
        groom_name: row.groom_name,
        groom_nick: row.groom_nick,
        bride_name: row.bride_name,
        bride_nick: row.bride_nick,
        event_date: row.event_date,
        location: row.location,
        message: row.message,
        bank,
        groom_photo: row.groom_photo,
        bride_photo: row.bride_photo,
        love_story,
        gallery,
        created_at: parse_db_time(&row.created_at),
    }
}
