use std::sync::Arc;

use media::UploadPipeline;

use crate::config::AppConfig;
use crate::repository::{CommentRepository, PostRepository, UserRepository};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub uploads: Arc<UploadPipeline>,
}
