use crate::constants::VIDEO_EXTENSIONS;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("File not found: {path}")]
    NotFound { path: String },
    #[error("Invalid file format: {path}")]
    InvalidFormat { path: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
}

#[async_trait::async_trait]
pub trait FileStatProvider: Send + Sync {
    async fn stat(&self, uri: &str) -> Result<FileStat, FileError>;
}

/// Accepts plain paths and `file://` URIs.
pub fn uri_to_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

pub fn path_to_uri(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[derive(Clone, Default)]
pub struct FileService;

impl FileService {
    pub fn new() -> Self {
        Self
    }

    pub fn has_video_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    pub async fn validate_video_file(&self, path: &Path) -> Result<(), FileError> {
        if !path.is_file() {
            return Err(FileError::NotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        // Use infer crate to detect actual file type
        let kind = infer::get_from_path(path)?;
        match kind {
            Some(kind) if !kind.mime_type().starts_with("video/") => Err(FileError::InvalidFormat {
                path: format!("File is not a video: detected {}", kind.mime_type()),
            }),
            Some(_) => Ok(()),
            // If infer can't detect the type, trust the extension
            None if Self::has_video_extension(path) => Ok(()),
            None => Err(FileError::InvalidFormat {
                path: format!("{} has no recognised video format", path.display()),
            }),
        }
    }
}

#[async_trait::async_trait]
impl FileStatProvider for FileService {
    async fn stat(&self, uri: &str) -> Result<FileStat, FileError> {
        let path = uri_to_path(uri);
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FileError::NotFound {
                    path: path.to_string_lossy().to_string(),
                }
            } else {
                FileError::Io(e)
            }
        })?;
        Ok(FileStat {
            size: metadata.len(),
        })
    }
}
