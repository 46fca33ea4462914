use uuid::Uuid;

/// Namespace for image objects.
pub const IMAGE_PREFIX: &str = "images";
/// Namespace for transcoded video objects.
pub const VIDEO_PREFIX: &str = "videos";

/// Strip everything except ASCII alphanumerics and `.` from a client filename.
pub fn sanitize_filename(original: &str) -> String {
    let cleaned: String = original
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .collect();

    // A name made only of dots would read as a traversal segment.
    if cleaned.chars().all(|c| c == '.') {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// `images/{millis}_{sanitized name}`
pub fn image_key(original_name: &str, timestamp_millis: i64) -> String {
    format!(
        "{IMAGE_PREFIX}/{timestamp_millis}_{}",
        sanitize_filename(original_name)
    )
}

/// `videos/{millis}_{random}.mp4`
pub fn video_key(timestamp_millis: i64) -> String {
    format!(
        "{VIDEO_PREFIX}/{timestamp_millis}_{}.mp4",
        Uuid::new_v4().simple()
    )
}

/// Check that a key is a relative path made of safe segments.
pub fn validate_key(key: &str) -> Result<(), &'static str> {
    if key.is_empty() {
        return Err("key must not be empty");
    }
    if key.starts_with('/') || key.ends_with('/') {
        return Err("key must not start or end with '/'");
    }
    for segment in key.split('/') {
        if segment.is_empty() {
            return Err("key must not contain empty segments");
        }
        if segment.starts_with('.') {
            return Err("key segments must not start with '.'");
        }
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'))
    {
        return Err("key contains invalid characters");
    }
    Ok(())
}
