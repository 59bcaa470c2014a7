use crate::engine::EngineError;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

/// Stream facts read from `ffprobe`. Fields it could not report stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeInfo {
    pub duration: Option<f64>,
    pub bitrate: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

pub async fn probe_video(program: &str, path: &Path) -> Result<ProbeInfo, EngineError> {
    let output = Command::new(program)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::FFmpegNotFound
            } else {
                EngineError::SpawnFailed(e.to_string())
            }
        })?;

    if !output.status.success() {
        return Err(EngineError::InvalidSource {
            message: format!("ffprobe could not read {}", path.display()),
        });
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

pub fn parse_probe_output(json: &str) -> Result<ProbeInfo, EngineError> {
    let parsed: ProbeOutput = serde_json::from_str(json).map_err(|e| EngineError::InvalidSource {
        message: format!("unreadable ffprobe output: {}", e),
    })?;

    let video = parsed
        .streams
        .iter()
        .find(|stream| stream.codec_type.as_deref() == Some("video"));

    let format_duration = parsed
        .format
        .as_ref()
        .and_then(|format| format.duration.as_deref())
        .and_then(|value| value.parse::<f64>().ok());
    let stream_duration = video
        .and_then(|stream| stream.duration.as_deref())
        .and_then(|value| value.parse::<f64>().ok());

    Ok(ProbeInfo {
        duration: format_duration.or(stream_duration),
        bitrate: parsed
            .format
            .as_ref()
            .and_then(|format| format.bit_rate.as_deref())
            .and_then(|value| value.parse().ok()),
        width: video.and_then(|stream| stream.width),
        height: video.and_then(|stream| stream.height),
    })
}
