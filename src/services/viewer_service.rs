use crate::services::file_service::uri_to_path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Failed to open {uri}: {message}")]
    OpenFailed { uri: String, message: String },
}

pub trait Viewer: Send + Sync {
    /// Hands the URI to an external application. Nothing is tracked afterwards.
    fn open(&self, uri: &str) -> Result<(), ViewerError>;
}

#[derive(Clone, Default)]
pub struct SystemViewer;

impl SystemViewer {
    pub fn new() -> Self {
        Self
    }
}

pub fn to_file_url(uri: &str) -> String {
    if uri.contains("://") {
        return uri.to_string();
    }
    let path = uri_to_path(uri);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map(|dir| dir.join(&path))
            .unwrap_or(path)
    };
    format!("file://{}", absolute.to_string_lossy())
}

impl Viewer for SystemViewer {
    fn open(&self, uri: &str) -> Result<(), ViewerError> {
        let url = to_file_url(uri);
        tracing::info!("Opening {} in the system viewer", url);
        webbrowser::open(&url).map_err(|e| ViewerError::OpenFailed {
            uri: uri.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_url() {
        assert_eq!(to_file_url("/tmp/clip.mp4"), "file:///tmp/clip.mp4");
        assert_eq!(to_file_url("file:///tmp/clip.mp4"), "file:///tmp/clip.mp4");
        assert!(to_file_url("clip.mp4").starts_with("file://"));
        assert!(to_file_url("clip.mp4").ends_with("/clip.mp4"));
    }
}
