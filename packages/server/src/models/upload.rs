use media::{MediaType, UploadedMedia};
use serde::Serialize;

/// Upload result. `mediaUrl` and `mediaType` go straight into `POST /posts`.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "https://cdn.example.com/videos/1718000000000_0f8c2e.mp4")]
    pub media_url: String,
    /// Object store key.
    #[schema(example = "videos/1718000000000_0f8c2e.mp4")]
    pub key: String,
    pub media_type: MediaType,
}

impl From<UploadedMedia> for UploadResponse {
    fn from(media: UploadedMedia) -> Self {
        Self {
            success: true,
            media_url: media.media_url,
            key: media.storage_key,
            media_type: media.media_type,
        }
    }
}
