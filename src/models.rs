use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `url` is kept as raw JSON so a value of the wrong type reaches validation
/// instead of failing body decoding.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: Option<Value>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ImageItem {
    /// 1-based position among the gallery items that resolved to a URL.
    pub index: usize,
    pub url: String,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct VideoLinks {
    pub nowm: Option<String>,
    pub nowm_hd: Option<String>,
    pub wm: Option<String>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub title: Option<String>,
    pub cover: Option<String>,
    pub images: Vec<ImageItem>,
    pub videos: VideoLinks,
    pub mp3: Option<String>,
}

impl ExtractionResult {
    /// True when no downloadable media was found: no video variant, no
    /// audio track and no gallery images. Title and cover do not count.
    pub fn is_empty(&self) -> bool {
        self.videos.nowm.is_none()
            && self.videos.nowm_hd.is_none()
            && self.videos.wm.is_none()
            && self.mp3.is_none()
            && self.images.is_empty()
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtractionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>, data: ExtractionResult) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
