use crate::constants::{RETURN_CODE_CANCEL, RETURN_CODE_SUCCESS};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

pub mod ffmpeg;
pub mod probe;

pub use ffmpeg::FfmpegEngine;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("FFmpeg not found. Please install FFmpeg and ensure it's in your PATH.")]
    FFmpegNotFound,
    #[error("Invalid source: {message}")]
    InvalidSource { message: String },
    #[error("Failed to start FFmpeg: {0}")]
    SpawnFailed(String),
    #[error("Process error: {0}")]
    ProcessError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompressionMethod {
    /// Caps the longest side and picks a constant quality.
    Auto,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressionConfig {
    /// Sources smaller than this many bytes are returned untouched.
    pub minimum_file_size_for_compress: u64,
    pub compression_method: CompressionMethod,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            minimum_file_size_for_compress: 0,
            compression_method: CompressionMethod::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineJob {
    /// Free-form ffmpeg parameters placed between the input and the output.
    Command(String),
    Compress(CompressionConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeRequest {
    pub source_uri: String,
    pub output_uri: String,
    pub job: EngineJob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Success,
    Cancel,
    Error(i32),
}

impl ReturnCode {
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(RETURN_CODE_SUCCESS) => ReturnCode::Success,
            Some(RETURN_CODE_CANCEL) => ReturnCode::Cancel,
            Some(other) => ReturnCode::Error(other),
            // killed by a signal we did not send
            None => ReturnCode::Error(-1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    Completed { output_uri: String },
    Cancelled,
    Failed { return_code: i32 },
}

/// Receives elapsed media time as the engine works through the source.
pub type ProgressCallback = Arc<dyn Fn(Duration) + Send + Sync>;

/// Creates the two ends of one execution's cancellation signal.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (sender, receiver) = watch::channel(false);
    (CancelHandle(sender), CancelToken(receiver))
}

/// Kept by whoever started the execution.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    /// Trips the token. Does not wait for the engine to stop.
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Handed to the engine along with the request.
#[derive(Debug, Clone)]
pub struct CancelToken(watch::Receiver<bool>);

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the handle is tripped. Never resolves if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&mut self) {
        let closed = self.0.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait::async_trait]
pub trait TranscodeEngine: Send + Sync {
    async fn transcode(
        &self,
        request: TranscodeRequest,
        on_progress: ProgressCallback,
        cancel: CancelToken,
    ) -> Result<EngineOutcome, EngineError>;
}
