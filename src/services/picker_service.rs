use crate::constants::VIDEO_EXTENSIONS;
use crate::engine::probe::{probe_video, ProbeInfo};
use crate::services::file_service::{path_to_uri, FileError, FileService};
use crate::state::SelectedAsset;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PickerError {
    #[error("Selected file is not usable: {0}")]
    InvalidSelection(#[from] FileError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    Cancelled,
    Selected(Vec<SelectedAsset>),
}

impl PickOutcome {
    /// The asset that replaces the current selection: the first one picked.
    pub fn into_selection(self) -> Option<SelectedAsset> {
        match self {
            PickOutcome::Cancelled => None,
            PickOutcome::Selected(assets) => assets.into_iter().next(),
        }
    }
}

#[async_trait::async_trait]
pub trait AssetPicker: Send + Sync {
    async fn pick(&self) -> Result<PickOutcome, PickerError>;
}

/// Native file dialog limited to video files, with metadata from `ffprobe`.
pub struct DialogAssetPicker {
    ffprobe: String,
    files: FileService,
}

impl Default for DialogAssetPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogAssetPicker {
    pub fn new() -> Self {
        Self::with_ffprobe("ffprobe")
    }

    pub fn with_ffprobe(program: impl Into<String>) -> Self {
        Self {
            ffprobe: program.into(),
            files: FileService::new(),
        }
    }

    pub async fn describe(&self, path: &Path) -> Result<SelectedAsset, PickerError> {
        let file_size = tokio::fs::metadata(path).await.map_err(FileError::from)?.len();

        let info = match probe_video(&self.ffprobe, path).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Could not probe {}: {}", path.display(), e);
                ProbeInfo::default()
            }
        };

        Ok(SelectedAsset {
            uri: path_to_uri(path),
            file_size: Some(file_size),
            duration: info.duration,
            bitrate: info.bitrate,
            width: info.width,
            height: info.height,
        })
    }
}

#[async_trait::async_trait]
impl AssetPicker for DialogAssetPicker {
    async fn pick(&self) -> Result<PickOutcome, PickerError> {
        let handle = rfd::AsyncFileDialog::new()
            .set_title("Pick a video")
            .add_filter("Video", VIDEO_EXTENSIONS)
            .pick_file()
            .await;

        let Some(handle) = handle else {
            tracing::debug!("Picker dismissed");
            return Ok(PickOutcome::Cancelled);
        };

        let path = handle.path().to_path_buf();
        self.files.validate_video_file(&path).await?;
        let asset = self.describe(&path).await?;
        tracing::info!("Picked {}", asset.uri);

        Ok(PickOutcome::Selected(vec![asset]))
    }
}
