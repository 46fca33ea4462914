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
use crate::models::shared::{ApiResponse, MessageResponse, parse_id, parse_positive};
use crate::models::user::{
    LeaderboardEntry, LeaderboardQuery, LoginRequest, LoginResponse, ReconcileResponse,
    RegisterRequest, UpdateUserRequest, UserResponse,
};
use crate::services::user::{DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT, UserService};
use crate::state::AppState;
use crate::utils::jwt;

fn users(state: &AppState) -> UserService<'_> {
    UserService::new(state.users.as_ref(), state.posts.as_ref())
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Users",
    operation_id = "registerUser",
    summary = "Register a new user",
    description = "Creates an account. Username and email must be unique; the password is stored as an Argon2 hash.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserResponse>),
        (status = 400, description = "Validation error or duplicate username/email (VALIDATION_ERROR, CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = users(&state).register(payload.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            UserResponse::from(user),
            "User registered successfully",
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Users",
    operation_id = "loginUser",
    summary = "Log in",
    description = "Verifies credentials and returns a JWT together with the user (without password).",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid credentials (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".into(),
        ));
    }

    let user = users(&state)
        .login(&payload.username, &payload.password)
        .await?;

    let auth = &state.config.auth;
    let token = jwt::sign(user.id, &user.username, &auth.jwt_secret, auth.token_ttl_hours)
        .map_err(|e| AppError::Internal(format!("JWT sign error: {e}")))?;

    Ok(Json(ApiResponse::with_message(
        LoginResponse {
            token,
            user: user.into(),
        },
        "Login successful",
    )))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Users",
    operation_id = "getCurrentUser",
    summary = "Get the authenticated user",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Account no longer exists (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = users(&state).get_by_id(auth_user.user_id).await?;
    Ok(Json(ApiResponse::ok(user.into())))
}

#[utoipa::path(
    get,
    path = "/leaderboard",
    tag = "Users",
    operation_id = "getLeaderboard",
    summary = "Users ranked by likes received",
    description = "Highest `totalLikesReceived` first. Ranks are positional: equal totals get consecutive ranks, ordered by account age.",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Leaderboard", body = ApiResponse<Vec<LeaderboardEntry>>),
    ),
)]
#[instrument(skip(state, query))]
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<ApiResponse<Vec<LeaderboardEntry>>>, AppError> {
    let limit = parse_positive(query.limit.as_deref())
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .min(MAX_LEADERBOARD_LIMIT);

    let ranked = users(&state).leaderboard(limit).await?;
    Ok(Json(ApiResponse::ok(
        ranked.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/profile/{username}",
    tag = "Users",
    operation_id = "getUserByUsername",
    summary = "Look up a user by username",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = users(&state).get_by_username(&username).await?;
    Ok(Json(ApiResponse::ok(user.into())))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Get a user by ID",
    params(("id" = String, Path, description = "User ID (UUID)")),
    responses(
        (status = 200, description = "User", body = ApiResponse<UserResponse>),
        (status = 400, description = "Malformed ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let id = parse_id(&id, "user")?;
    let user = users(&state).get_by_id(id).await?;
    Ok(Json(ApiResponse::ok(user.into())))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Users",
    operation_id = "updateUser",
    summary = "Update own profile",
    description = "Omitted fields are unchanged. A new password is re-hashed.",
    params(("id" = String, Path, description = "User ID (UUID)")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = ApiResponse<UserResponse>),
        (status = 400, description = "Validation error or duplicate username/email (VALIDATION_ERROR, CONFLICT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not your profile (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn update_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let id = parse_id(&id, "user")?;
    let user = users(&state)
        .update(id, auth_user.user_id, payload.into())
        .await?;
    Ok(Json(ApiResponse::with_message(
        user.into(),
        "Profile updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Users",
    operation_id = "deleteUser",
    summary = "Delete own account",
    description = "Posts and comments written by the account are kept.",
    params(("id" = String, Path, description = "User ID (UUID)")),
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not your account (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn delete_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id, "user")?;
    users(&state).delete(id, auth_user.user_id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/{id}/reconcile",
    tag = "Users",
    operation_id = "reconcileUser",
    summary = "Repair the user's post list",
    description = "Rebuilds the user's `posts` ids from the post table and reports what changed, \
        together with the recorded like total and the likes currently held by the user's posts.",
    params(("id" = String, Path, description = "User ID (UUID)")),
    responses(
        (status = 200, description = "Reconciliation report", body = ApiResponse<ReconcileResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not your account (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn reconcile(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ReconcileResponse>>, AppError> {
    let id = parse_id(&id, "user")?;
    let report = users(&state).reconcile(id, auth_user.user_id).await?;
    Ok(Json(ApiResponse::ok(report.into())))
}
