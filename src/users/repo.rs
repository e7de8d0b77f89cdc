use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::users::repo_types::{AdminChanges, NewUser, ProfileChanges, User, UserStatus};

const USER_COLUMNS: &str = "id, firstname, lastname, email, phone, address, avatar, \
                            password_hash, role, status, created_at, updated_at";

impl User {
    pub async fn count_all(db: &PgPool) -> Result<i64, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(db)
            .await?;
        Ok(count)
    }

    /// Every row, deleted ones included. List semantics apply no filter.
    pub async fn list_all(db: &PgPool) -> Result<Vec<User>, ApiError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Advisory pre-create check; the unique index remains the authority.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a new account. A concurrent create with the same email loses
    /// the race at the unique index and surfaces as `Conflict`.
    pub async fn create(db: &PgPool, new: &NewUser) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (firstname, lastname, email, phone, address, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new.firstname)
        .bind(&new.lastname)
        .bind(&new.email)
        .bind(new.phone.as_deref())
        .bind(new.address.as_deref())
        .bind(&new.password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Shallow merge of the self-service allow-list into one row. Absent
    /// fields keep their stored value.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                firstname = COALESCE($2, firstname), \
                lastname  = COALESCE($3, lastname), \
                email     = COALESCE($4, email), \
                phone     = COALESCE($5, phone), \
                address   = COALESCE($6, address), \
                avatar    = COALESCE($7, avatar), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.firstname.as_deref())
        .bind(changes.lastname.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.phone.as_deref())
        .bind(changes.address.as_deref())
        .bind(changes.avatar.as_deref())
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Admin merge: the profile allow-list plus role and status.
    pub async fn admin_update(
        db: &PgPool,
        id: Uuid,
        changes: &AdminChanges,
    ) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                firstname = COALESCE($2, firstname), \
                lastname  = COALESCE($3, lastname), \
                email     = COALESCE($4, email), \
                phone     = COALESCE($5, phone), \
                address   = COALESCE($6, address), \
                avatar    = COALESCE($7, avatar), \
                role      = COALESCE($8, role), \
                status    = COALESCE($9, status), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.firstname.as_deref())
        .bind(changes.lastname.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.phone.as_deref())
        .bind(changes.address.as_deref())
        .bind(changes.avatar.as_deref())
        .bind(changes.role)
        .bind(changes.status)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Mark the row deleted; it stays retrievable by id.
    pub async fn soft_delete(db: &PgPool, id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET status = $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(UserStatus::Deleted)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn set_avatar(db: &PgPool, id: Uuid, uri: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET avatar = $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(uri)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
