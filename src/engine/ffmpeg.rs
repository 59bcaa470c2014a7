use crate::constants::{AUTO_AUDIO_BITRATE, AUTO_MAX_DIMENSION, AUTO_PRESET, AUTO_VIDEO_CRF};
use crate::engine::{
    CancelToken, CompressionMethod, EngineError, EngineJob, EngineOutcome, ProgressCallback,
    ReturnCode, TranscodeEngine, TranscodeRequest,
};
use crate::services::file_service::uri_to_path;
use regex::Regex;
use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

const MAX_STDERR_LINES: usize = 20;

pub struct FfmpegEngine {
    program: String,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEngine {
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub async fn is_available(&self) -> bool {
        match Command::new(&self.program).arg("-version").output().await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    pub fn build_args(request: &TranscodeRequest) -> Vec<String> {
        let mut args: Vec<String> = [
            "-nostdin",
            "-hide_banner",
            "-nostats",
            "-progress",
            "pipe:1",
            "-y",
            "-i",
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect();

        args.push(uri_to_path(&request.source_uri).to_string_lossy().to_string());

        match &request.job {
            EngineJob::Command(parameters) => {
                args.extend(parameters.split_whitespace().map(str::to_string));
            }
            EngineJob::Compress(config) => {
                args.extend(compression_args(&config.compression_method));
            }
        }

        args.push(uri_to_path(&request.output_uri).to_string_lossy().to_string());
        args
    }
}

fn scale_filter(max_size: u32) -> String {
    format!(
        "scale='if(gt(iw,ih),min({max},iw),-2)':'if(gt(iw,ih),-2,min({max},ih))'",
        max = max_size
    )
}

fn compression_args(method: &CompressionMethod) -> Vec<String> {
    let mut args = Vec::new();
    match method {
        CompressionMethod::Auto => {
            args.extend([
                "-vf".to_string(),
                scale_filter(AUTO_MAX_DIMENSION),
                "-c:v".to_string(),
                "libx264".to_string(),
                "-crf".to_string(),
                AUTO_VIDEO_CRF.to_string(),
                "-preset".to_string(),
                AUTO_PRESET.to_string(),
            ]);
        }
    }
    args.extend([
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        AUTO_AUDIO_BITRATE.to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
    ]);
    args
}

#[async_trait::async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn transcode(
        &self,
        request: TranscodeRequest,
        on_progress: ProgressCallback,
        mut cancel: CancelToken,
    ) -> Result<EngineOutcome, EngineError> {
        if cancel.is_cancelled() {
            tracing::info!("Cancelled before ffmpeg was started");
            return Ok(EngineOutcome::Cancelled);
        }

        if let EngineJob::Compress(config) = &request.job {
            let source = uri_to_path(&request.source_uri);
            let metadata = tokio::fs::metadata(&source)
                .await
                .map_err(|e| EngineError::InvalidSource {
                    message: format!("{}: {}", source.display(), e),
                })?;
            if metadata.len() < config.minimum_file_size_for_compress {
                tracing::info!(
                    "Source is {} bytes, below the {} byte threshold; skipping compression",
                    metadata.len(),
                    config.minimum_file_size_for_compress
                );
                return Ok(EngineOutcome::Completed {
                    output_uri: request.source_uri,
                });
            }
        }

        let args = Self::build_args(&request);
        tracing::info!("Executing with command: {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::FFmpegNotFound
                } else {
                    EngineError::SpawnFailed(e.to_string())
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::ProcessError("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::ProcessError("stderr was not captured".to_string()))?;

        let progress_task = tokio::spawn(read_progress(stdout, on_progress));
        let stderr_task = tokio::spawn(collect_tail(stderr, MAX_STDERR_LINES));

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                tracing::info!("Cancellation requested, stopping ffmpeg");
                child.kill().await?;
                progress_task.abort();
                stderr_task.abort();
                return Ok(EngineOutcome::Cancelled);
            }
        };

        // let the reader deliver the final progress block
        let _ = progress_task.await;
        let stderr_tail = stderr_task.await.unwrap_or_default();

        match ReturnCode::from_code(status.code()) {
            ReturnCode::Success => Ok(EngineOutcome::Completed {
                output_uri: request.output_uri,
            }),
            ReturnCode::Cancel => {
                tracing::info!("ffmpeg reported cancellation");
                Ok(EngineOutcome::Cancelled)
            }
            ReturnCode::Error(code) => {
                tracing::warn!("ffmpeg exited with code {}:\n{}", code, stderr_tail);
                Ok(EngineOutcome::Failed { return_code: code })
            }
        }
    }
}

/// Reports the media time of each `-progress` block once, when the block's
/// closing `progress=` line arrives.
async fn read_progress<R: AsyncRead + Unpin>(reader: R, on_progress: ProgressCallback) {
    let parser = ProgressParser::new();
    let mut lines = BufReader::new(reader).lines();
    let mut latest = None;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.starts_with("progress=") {
                    if let Some(elapsed) = latest.take() {
                        on_progress(elapsed);
                    }
                } else if let Some(elapsed) = parser.parse_line(&line) {
                    latest = Some(elapsed);
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Stopped reading ffmpeg progress: {}", e);
                break;
            }
        }
    }
    if let Some(elapsed) = latest {
        on_progress(elapsed);
    }
}

async fn collect_tail<R: AsyncRead + Unpin>(reader: R, max_lines: usize) -> String {
    let mut tail = VecDeque::with_capacity(max_lines);
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == max_lines {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}

/// Reads `-progress` key/value output and yields the processed media time.
struct ProgressParser {
    time_regex: Regex,
    // ffmpeg writes microseconds under both keys
    micros_regex: Regex,
}

impl ProgressParser {
    fn new() -> Self {
        Self {
            time_regex: Regex::new(r"^out_time=(\d+):(\d{2}):(\d{2}(?:\.\d+)?)$")
                .expect("progress pattern is valid"),
            micros_regex: Regex::new(r"^out_time_(?:us|ms)=(\d+)$")
                .expect("progress pattern is valid"),
        }
    }

    fn parse_line(&self, line: &str) -> Option<Duration> {
        let line = line.trim();
        if let Some(caps) = self.micros_regex.captures(line) {
            return caps[1].parse().ok().map(Duration::from_micros);
        }

        let caps = self.time_regex.captures(line)?;
        let hours: f64 = caps[1].parse().ok()?;
        let minutes: f64 = caps[2].parse().ok()?;
        let seconds: f64 = caps[3].parse().ok()?;
        Some(Duration::from_secs_f64(
            hours * 3600.0 + minutes * 60.0 + seconds,
        ))
    }
}
