//! Allowed-role sets per operation, checked by one gate function. The
//! tables are the whole authorization policy; handlers never hand-roll
//! role checks.

use tracing::warn;

use crate::auth::extractors::Identity;
use crate::error::ApiError;
use crate::users::repo_types::Role;

pub const LIST_USERS: &[Role] = &[Role::Admin];
pub const SELF_FETCH: &[Role] = &[Role::Admin, Role::User];
// Any authenticated caller may soft-delete any id, not only their own.
pub const SOFT_DELETE: &[Role] = &[Role::Admin, Role::User];
pub const UPDATE_PROFILE: &[Role] = &[Role::Admin, Role::User];
pub const CREATE_USER: &[Role] = &[Role::Admin];
pub const ADMIN_UPDATE: &[Role] = &[Role::Admin];
pub const UPLOAD_AVATAR: &[Role] = &[Role::Admin, Role::User];
pub const GET_USER: &[Role] = &[Role::Admin];

/// Gate every protected operation before it touches the repository.
pub fn authorize(identity: &Identity, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        warn!(user_id = %identity.user_id, role = %identity.role, "role not permitted");
        Err(ApiError::Forbidden("Insufficient role".to_string()))
    }
}
