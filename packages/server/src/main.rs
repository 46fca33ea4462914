use std::sync::Arc;

use media::UploadPipeline;
use media::storage::build_object_store;
use media::transcode::FfmpegTranscoder;
use tracing::info;

use snapgram::config::AppConfig;
use snapgram::database;
use snapgram::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load()?;
    let repos = database::connect(&config.database).await?;

    let store = build_object_store(&config.storage).await?;
    let transcoder = FfmpegTranscoder::new(&config.upload.ffmpeg_path);
    let uploads = UploadPipeline::new(store, Arc::new(transcoder), config.upload.limits());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        config: Arc::new(config),
        users: repos.users,
        posts: repos.posts,
        comments: repos.comments,
        uploads: Arc::new(uploads),
    };

    let app = snapgram::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
