use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::post::{
    CreatePostRequest, LikeResponse, PostListData, PostResponse, UpdatePostRequest,
};
use crate::models::shared::{ApiResponse, MessageResponse, PageQuery, PaginationMeta, parse_id};
use crate::repository::{Page, PostRecord};
use crate::services::post::{CreatePost, PostService, UpdatePost};
use crate::state::AppState;

fn posts(state: &AppState) -> PostService<'_> {
    PostService::new(state.posts.as_ref(), state.users.as_ref())
}

fn list_data(page: Page<PostRecord>, current: u64, limit: u64) -> PostListData {
    PostListData {
        pagination: PaginationMeta::new(current, limit, page.total),
        posts: page.items.into_iter().map(Into::into).collect(),
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Posts",
    operation_id = "listPosts",
    summary = "List posts",
    description = "Newest first. Invalid `page`/`limit` values fall back to 1 and 10.",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of posts", body = ApiResponse<PostListData>),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PostListData>>, AppError> {
    let (page, limit) = query.resolve();
    let result = posts(&state).get_all(page, limit).await?;
    Ok(Json(ApiResponse::ok(list_data(result, page, limit))))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Posts",
    operation_id = "createPost",
    summary = "Create a post",
    description = "Creates a post owned by the caller. `mediaUrl` must come from a prior upload. \
        `author` defaults to the caller's username and `mediaType` to `image`.",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = ApiResponse<PostResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Caller's account no longer exists (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn create_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let author = payload
        .author
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| auth_user.username.clone());

    let post = posts(&state)
        .create(CreatePost {
            title: payload.title,
            caption: payload.caption,
            author,
            user_id: auth_user.user_id,
            media_url: payload.media_url,
            media_type: payload.media_type,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            PostResponse::from(post),
            "Post created successfully",
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/user/{user_id}",
    tag = "Posts",
    operation_id = "listPostsByUser",
    summary = "List a user's posts",
    description = "Newest first, same pagination contract as `listPosts`.",
    params(
        ("user_id" = String, Path, description = "Author's user ID (UUID)"),
        PageQuery,
    ),
    responses(
        (status = 200, description = "Page of posts", body = ApiResponse<PostListData>),
        (status = 400, description = "Malformed ID (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_posts_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PostListData>>, AppError> {
    let user_id = parse_id(&user_id, "user")?;
    let (page, limit) = query.resolve();
    let result = posts(&state).get_by_author(user_id, page, limit).await?;
    Ok(Json(ApiResponse::ok(list_data(result, page, limit))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Posts",
    operation_id = "getPost",
    summary = "Get a post by ID",
    params(("id" = String, Path, description = "Post ID (UUID)")),
    responses(
        (status = 200, description = "Post", body = ApiResponse<PostResponse>),
        (status = 400, description = "Malformed ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PostResponse>>, AppError> {
    let id = parse_id(&id, "post")?;
    let post = posts(&state).get_by_id(id).await?;
    Ok(Json(ApiResponse::ok(post.into())))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Posts",
    operation_id = "updatePost",
    summary = "Replace a post's content",
    description = "Owner only. Replaces title, caption, media URL and media type; likes are untouched.",
    params(("id" = String, Path, description = "Post ID (UUID)")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated post", body = ApiResponse<PostResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn update_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdatePostRequest>,
) -> Result<Json<ApiResponse<PostResponse>>, AppError> {
    let id = parse_id(&id, "post")?;
    let post = posts(&state)
        .update(
            id,
            auth_user.user_id,
            UpdatePost {
                title: payload.title,
                caption: payload.caption,
                media_url: payload.media_url,
                media_type: payload.media_type,
            },
        )
        .await?;
    Ok(Json(ApiResponse::with_message(
        post.into(),
        "Post updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Posts",
    operation_id = "deletePost",
    summary = "Delete a post",
    description = "Owner only. The post's id is also removed from the owner's post list.",
    params(("id" = String, Path, description = "Post ID (UUID)")),
    responses(
        (status = 200, description = "Post deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn delete_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id, "post")?;
    posts(&state).delete(id, auth_user.user_id).await?;
    Ok(Json(MessageResponse::new("Post deleted successfully")))
}

#[utoipa::path(
    put,
    path = "/{id}/like",
    tag = "Posts",
    operation_id = "toggleLike",
    summary = "Like or unlike a post",
    description = "Flips the caller's like on the post and adjusts the author's `totalLikesReceived` \
        (never below 0). Liking your own post is allowed.",
    params(("id" = String, Path, description = "Post ID (UUID)")),
    responses(
        (status = 200, description = "Post after the toggle", body = ApiResponse<LikeResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Post or its author not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn toggle_like(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<LikeResponse>>, AppError> {
    let id = parse_id(&id, "post")?;
    let outcome = posts(&state).toggle_like(id, auth_user.user_id).await?;
    let message = if outcome.liked {
        "Post liked"
    } else {
        "Post unliked"
    };
    Ok(Json(ApiResponse::with_message(outcome.into(), message)))
}
