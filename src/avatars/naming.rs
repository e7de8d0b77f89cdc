use time::OffsetDateTime;
use uuid::Uuid;

/// Derive a storage name for an uploaded profile image. The random id
/// makes collisions negligible; the millisecond timestamp covers the
/// same-instant case across processes. Pure computation, no I/O.
pub fn profile_filename(ext: &str) -> String {
    let now = OffsetDateTime::now_utc();
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!("profile-{}-{}.{}", Uuid::new_v4(), millis, ext)
}

pub fn ext_from_mime(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
