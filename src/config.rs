use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Limits and locations for avatar uploads.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Directory served as the web root; files below it are public.
    pub storage_root: String,
    /// Key prefix (relative to the storage root) for profile images.
    pub profiles_prefix: String,
    pub max_file_bytes: usize,
    pub max_files: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Public base URL avatars are served from.
    pub server_url: String,
    /// Argon2 time-cost used when hashing new passwords.
    pub hash_time_cost: u32,
    pub jwt: JwtConfig,
    pub upload: UploadConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let server_url =
            std::env::var("SERVER_URL").unwrap_or_else(|_| "http://localhost:8080".into());
        let hash_time_cost = std::env::var("HASH_TIME_COST")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "userhub".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "userhub-clients".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };
        let upload = UploadConfig {
            storage_root: std::env::var("AVATAR_STORAGE_ROOT")
                .unwrap_or_else(|_| "public".into()),
            profiles_prefix: std::env::var("AVATAR_PROFILES_PREFIX")
                .unwrap_or_else(|_| "img/profiles".into()),
            max_file_bytes: std::env::var("AVATAR_MAX_FILE_BYTES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(5 * 1024 * 1024),
            max_files: 1,
        };
        Ok(Self {
            database_url,
            server_url,
            hash_time_cost,
            jwt,
            upload,
        })
    }
}
