use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::{AdminChanges, ProfileChanges, Role, User, UserStatus};

fn normalize_email(email: String) -> String {
    email.trim().to_lowercase()
}

/// Public part of an account returned to clients. Built from a row, so a
/// password hash cannot reach a response by construction.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            firstname: u.firstname,
            lastname: u.lastname,
            email: u.email,
            phone: u.phone,
            address: u.address,
            avatar: u.avatar,
            role: u.role,
            status: u.status,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Request body for the admin create operation.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub password: String,
}

/// Self-service update. Unknown fields (role, password, anything else) are
/// dropped at deserialization; the stored values stay untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar: Option<String>,
}

impl UpdateProfileRequest {
    pub fn into_changes(self) -> ProfileChanges {
        ProfileChanges {
            firstname: self.firstname,
            lastname: self.lastname,
            email: self.email.map(normalize_email),
            phone: self.phone,
            address: self.address,
            avatar: self.avatar,
        }
    }
}

/// Admin update by id. Role and status must come from the closed sets.
#[derive(Debug, Default, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

impl AdminUpdateUserRequest {
    pub fn into_changes(self) -> AdminChanges {
        AdminChanges {
            firstname: self.firstname,
            lastname: self.lastname,
            email: self.email.map(normalize_email),
            phone: self.phone,
            address: self.address,
            avatar: self.avatar,
            role: self.role,
            status: self.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersResponse {
    pub total_count: i64,
    pub users: Vec<PublicUser>,
    pub filtered_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedProfileResponse {
    pub updated_user: PublicUser,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedUserResponse {
    pub user: PublicUser,
    pub message: String,
}

/// Field name kept for the existing admin frontend.
#[derive(Debug, Serialize)]
pub struct AdminUpdatedUserResponse {
    pub message: String,
    pub offer: PublicUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUploadResponse {
    pub update_avatar: PublicUser,
}
