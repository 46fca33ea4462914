use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/users", user_routes())
        .nest("/posts", post_routes())
        .nest("/upload", upload_routes(config))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::user::register))
        .routes(routes!(handlers::user::login))
        .routes(routes!(handlers::user::me))
        .routes(routes!(handlers::user::leaderboard))
        .routes(routes!(handlers::user::get_by_username))
        .routes(routes!(
            handlers::user::get_user,
            handlers::user::update_user,
            handlers::user::delete_user
        ))
        .routes(routes!(handlers::user::reconcile))
}

fn post_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::post::list_posts,
            handlers::post::create_post
        ))
        .routes(routes!(handlers::post::list_posts_by_user))
        .routes(routes!(
            handlers::post::get_post,
            handlers::post::update_post,
            handlers::post::delete_post
        ))
        .routes(routes!(handlers::post::toggle_like))
        .routes(routes!(
            handlers::comment::list_comments,
            handlers::comment::create_comment
        ))
        .routes(routes!(handlers::comment::delete_comment))
}

fn upload_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::upload::upload_media))
        .layer(handlers::upload::upload_body_limit(&config.upload))
}
