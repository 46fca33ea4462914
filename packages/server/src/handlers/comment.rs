use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::comment::{CommentResponse, CreateCommentRequest};
use crate::models::shared::{ApiResponse, MessageResponse, parse_id};
use crate::services::comment::CommentService;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/{id}/comments",
    tag = "Comments",
    operation_id = "listComments",
    summary = "List comments on a post",
    description = "Newest first.",
    params(("id" = String, Path, description = "Post ID (UUID)")),
    responses(
        (status = 200, description = "Comments", body = ApiResponse<Vec<CommentResponse>>),
        (status = 400, description = "Malformed ID (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<CommentResponse>>>, AppError> {
    let post_id = parse_id(&id, "post")?;
    let comments = CommentService::new(state.comments.as_ref())
        .list_by_post(post_id)
        .await?;
    Ok(Json(ApiResponse::ok(
        comments.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/{id}/comments",
    tag = "Comments",
    operation_id = "createComment",
    summary = "Comment on a post",
    description = "The post is not checked for existence.",
    params(("id" = String, Path, description = "Post ID (UUID)")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = ApiResponse<CommentResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn create_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let post_id = parse_id(&id, "post")?;
    let comment = CommentService::new(state.comments.as_ref())
        .create(
            post_id,
            &payload.content,
            auth_user.user_id,
            &auth_user.username,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            CommentResponse::from(comment),
            "Comment added successfully",
        )),
    ))
}

#[utoipa::path(
    delete,
    path = "/comments/{id}",
    tag = "Comments",
    operation_id = "deleteComment",
    summary = "Delete a comment",
    description = "Only the comment's author may delete it.",
    params(("id" = String, Path, description = "Comment ID (UUID)")),
    responses(
        (status = 200, description = "Comment deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn delete_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id, "comment")?;
    CommentService::new(state.comments.as_ref())
        .delete(id, auth_user.user_id)
        .await?;
    Ok(Json(MessageResponse::new("Comment deleted successfully")))
}
