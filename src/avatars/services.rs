use axum::extract::Multipart;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use super::naming::{ext_from_mime, profile_filename};
use crate::config::UploadConfig;
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo_types::User;

pub struct AvatarUpload {
    pub body: Bytes,
    pub content_type: String,
}

/// Pull exactly one `avatarFile` part out of the request and enforce the
/// upload limits. The size check runs before anything touches storage.
pub async fn read_avatar_field(
    cfg: &UploadConfig,
    multipart: &mut Multipart,
) -> Result<AvatarUpload, ApiError> {
    let mut upload: Option<AvatarUpload> = None;
    let mut files = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("avatarFile") {
            continue;
        }
        files += 1;
        if files > cfg.max_files {
            return Err(ApiError::BadRequest(
                "only one avatar file is allowed".to_string(),
            ));
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        if body.len() > cfg.max_file_bytes {
            return Err(ApiError::BadRequest(format!(
                "avatar file exceeds {} bytes",
                cfg.max_file_bytes
            )));
        }
        upload = Some(AvatarUpload { body, content_type });
    }

    upload.ok_or_else(|| ApiError::BadRequest("avatarFile is required".to_string()))
}

/// Name the file, persist the bytes, then point the caller's record at the
/// public URI. A storage failure surfaces before the record is touched, so
/// no half-updated row is ever visible.
pub async fn store_avatar(
    st: &AppState,
    user_id: Uuid,
    upload: AvatarUpload,
) -> Result<User, ApiError> {
    let cfg = &st.config.upload;

    let ext = ext_from_mime(&upload.content_type).unwrap_or("bin");
    let filename = profile_filename(ext);
    let key = format!("{}/{}", cfg.profiles_prefix, filename);

    st.storage
        .put_object(&key, upload.body)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let uri = format!("{}/{}", st.config.server_url.trim_end_matches('/'), key);
    let user = User::set_avatar(&st.db, user_id, &uri)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    info!(user_id = %user.id, %uri, "avatar stored");

    Ok(user)
}
