//! Aggregate operations. Each service borrows the repositories it needs for
//! the duration of one request.

pub mod comment;
pub mod post;
pub mod user;

use crate::error::AppError;

/// Reject a trimmed value outside `min..=max` characters.
pub(crate) fn require_len(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        let msg = if min <= 1 && len == 0 {
            format!("{field} is required")
        } else {
            format!("{field} must be {min}-{max} characters")
        };
        return Err(AppError::Validation(msg));
    }
    Ok(())
}
