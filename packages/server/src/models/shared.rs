use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// Success envelope shared by every JSON endpoint.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ApiResponse<T> {
    /// Always `true` on success.
    #[schema(example = true)]
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

/// Response for operations that return no data.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "Post deleted successfully")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Pagination metadata included in list responses.
#[derive(Debug, Serialize, utoipa::ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page number (1-based).
    #[schema(example = 2)]
    pub current_page: u64,
    #[schema(example = 2)]
    pub total_pages: u64,
    /// Total number of matching posts across all pages.
    #[schema(example = 15)]
    pub total_posts: u64,
    #[schema(example = false)]
    pub has_next_page: bool,
    #[schema(example = true)]
    pub has_prev_page: bool,
}

impl PaginationMeta {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = total.div_ceil(limit.max(1));
        Self {
            current_page: page,
            total_pages,
            total_posts: total,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// Raw `?page=&limit=` values. Anything unparsable or below 1 falls back to
/// the default instead of failing the request.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number, 1-based. Default: 1.
    pub page: Option<String>,
    /// Page size. Default: 10, max: 100.
    pub limit: Option<String>,
}

impl PageQuery {
    /// Returns `(page, limit)`.
    pub fn resolve(&self) -> (u64, u64) {
        let page = parse_positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE);
        let limit = parse_positive(self.limit.as_deref())
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        (page, limit)
    }
}

/// Parse a positive integer, or `None` for anything else.
pub fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|n| *n >= 1)
}

/// Parse a path id, naming the resource in the error.
pub fn parse_id(raw: &str, resource: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("Invalid {resource} ID format")))
}
