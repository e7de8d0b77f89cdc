use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::{AppendHeaders, IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::extractors::Identity;
use crate::auth::password::hash_password;
use crate::auth::policy::{self, authorize};
use crate::avatars::services::{read_avatar_field, store_avatar};
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::dto::{
    AdminUpdateUserRequest, AdminUpdatedUserResponse, AvatarUploadResponse, CreateUserRequest,
    CreatedUserResponse, ListUsersResponse, MessageResponse, PublicUser, UpdateProfileRequest,
    UpdatedProfileResponse,
};
use crate::users::repo_types::{NewUser, User};

// Multipart framing overhead above the 5 MiB avatar cap.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/personal/me", get(personal_me))
        .route("/logout", get(logout))
        .route("/getUser/:id", get(get_user))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/delete/:id", delete(delete_user))
        .route("/update/profile", put(update_profile))
        .route("/create", post(create_user))
        .route("/update/user/:id", put(admin_update_user))
        .route("/upload/avatarFile", put(upload_avatar))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest("Malformed user id".to_string()))
}

/// The one endpoint whose failure body carries a status field.
fn list_failure(e: ApiError) -> Response {
    (
        e.status(),
        Json(json!({ "status": "error", "message": e.to_string() })),
    )
        .into_response()
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<ListUsersResponse>, Response> {
    authorize(&identity, policy::LIST_USERS).map_err(IntoResponse::into_response)?;

    let total_count = User::count_all(&state.db).await.map_err(list_failure)?;
    let users: Vec<PublicUser> = User::list_all(&state.db)
        .await
        .map_err(list_failure)?
        .into_iter()
        .map(PublicUser::from)
        .collect();
    // No server-side filtering yet, so this always equals the total.
    let filtered_count = users.len();

    Ok(Json(ListUsersResponse {
        total_count,
        users,
        filtered_count,
    }))
}

#[instrument(skip(state))]
pub async fn personal_me(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<PublicUser>, ApiError> {
    authorize(&identity, policy::SELF_FETCH)?;

    let user = User::find_by_id(&state.db, identity.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(user.into()))
}

/// Stateless logout: expire the session cookies and nothing else. Issued
/// tokens stay valid until their natural expiry.
pub async fn logout() -> impl IntoResponse {
    let headers = AppendHeaders([
        (header::SET_COOKIE, "refreshToken=; Max-Age=0; Path=/"),
        (header::SET_COOKIE, "isLoggedIn=; Max-Age=0; Path=/"),
    ]);
    (
        headers,
        Json(MessageResponse {
            message: "successfully logout".to_string(),
        }),
    )
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    authorize(&identity, policy::SOFT_DELETE)?;
    let id = parse_user_id(&id)?;

    User::soft_delete(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    info!(user_id = %id, by = %identity.user_id, "user soft-deleted");

    Ok(Json(MessageResponse {
        message: "User successfully deleted!".to_string(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UpdatedProfileResponse>, ApiError> {
    authorize(&identity, policy::UPDATE_PROFILE)?;

    let changes = payload.into_changes();
    let updated = User::update_profile(&state.db, identity.user_id, &changes)
        .await? // duplicate email maps to Conflict here
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UpdatedProfileResponse {
        updated_user: updated.into(),
        message: "User successfully updated".to_string(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<CreatedUserResponse>, ApiError> {
    authorize(&identity, policy::CREATE_USER)?;

    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email".to_string()));
    }

    // Advisory check for a friendly message; the unique index decides
    // under concurrency.
    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(%email, "email already exists");
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let password_hash = hash_password(&payload.password, state.config.hash_time_cost)?;

    let new = NewUser {
        firstname: payload.firstname,
        lastname: payload.lastname,
        email,
        phone: payload.phone,
        address: payload.address,
        password_hash,
    };
    let user = User::create(&state.db, &new).await?;
    info!(user_id = %user.id, email = %user.email, "user created");

    Ok(Json(CreatedUserResponse {
        user: user.into(),
        message: "User successfully created".to_string(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn admin_update_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<Json<AdminUpdatedUserResponse>, ApiError> {
    authorize(&identity, policy::ADMIN_UPDATE)?;
    let id = parse_user_id(&id)?;

    let changes = payload.into_changes();
    let updated = User::admin_update(&state.db, id, &changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    info!(user_id = %id, by = %identity.user_id, "user updated by admin");

    Ok(Json(AdminUpdatedUserResponse {
        message: "User successfully updated".to_string(),
        offer: updated.into(),
    }))
}

#[instrument(skip(state, multipart))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<Json<AvatarUploadResponse>, ApiError> {
    authorize(&identity, policy::UPLOAD_AVATAR)?;

    let upload = read_avatar_field(&state.config.upload, &mut multipart).await?;
    let updated = store_avatar(&state, identity.user_id, upload).await?;

    Ok(Json(AvatarUploadResponse {
        update_avatar: updated.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<PublicUser>, ApiError> {
    authorize(&identity, policy::GET_USER)?;
    // Reject malformed ids before any lookup.
    let id = parse_user_id(&id)?;

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("User not found!".to_string()))?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@example.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("a@no-dot"));
    }

    #[test]
    fn malformed_ids_fail_before_any_lookup() {
        assert!(parse_user_id("not-a-uuid").is_err());
        let err = parse_user_id("123").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(parse_user_id("8f14e45f-ceea-467f-a0f9-1929f8a8a8d2").is_ok());
    }
}
