use crate::constants::OUTPUT_SUFFIX;
use crate::events::ExecutionId;
use std::time::Duration;

/// A picked video and whatever metadata could be read for it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectedAsset {
    pub uri: String,
    pub file_size: Option<u64>,
    /// Seconds.
    pub duration: Option<f64>,
    /// Bits per second.
    pub bitrate: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl SelectedAsset {
    #[cfg(test)]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn has_uri(&self) -> bool {
        !self.uri.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Success {
        output_uri: String,
        file_size_bytes: u64,
        elapsed_ms: u64,
    },
    Failure {
        error_text: String,
    },
}

impl ExecutionResult {
    pub fn failure(error_text: impl Into<String>) -> Self {
        ExecutionResult::Failure {
            error_text: error_text.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ExecutionMode {
    /// Structured compression settings.
    #[default]
    Compress,
    /// Raw ffmpeg parameters typed by the user.
    Command,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExecutionPhase {
    #[default]
    Idle,
    Executing {
        execution_id: ExecutionId,
        progress: f64,
    },
    Succeeded {
        execution_id: ExecutionId,
    },
    Failed {
        execution_id: ExecutionId,
    },
    Cancelled {
        execution_id: ExecutionId,
    },
}

impl ExecutionPhase {
    pub fn is_executing(&self) -> bool {
        matches!(self, ExecutionPhase::Executing { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            ExecutionPhase::Succeeded { .. }
                | ExecutionPhase::Failed { .. }
                | ExecutionPhase::Cancelled { .. }
        )
    }

    /// Id of the execution still allowed to change state, if any.
    pub fn active_execution(&self) -> Option<ExecutionId> {
        match self {
            ExecutionPhase::Executing { execution_id, .. } => Some(*execution_id),
            _ => None,
        }
    }

    pub fn get_progress(&self) -> Option<f64> {
        match self {
            ExecutionPhase::Executing { progress, .. } => Some(*progress),
            _ => None,
        }
    }

    pub fn transition_to_executing(execution_id: ExecutionId) -> Self {
        ExecutionPhase::Executing {
            execution_id,
            progress: 0.0,
        }
    }

    pub fn update_progress(&mut self, new_progress: f64) {
        if let ExecutionPhase::Executing { progress, .. } = self {
            *progress = new_progress;
        }
    }

    pub fn transition_to_succeeded(self) -> Self {
        match self {
            ExecutionPhase::Executing { execution_id, .. } => {
                ExecutionPhase::Succeeded { execution_id }
            }
            _ => self,
        }
    }

    pub fn transition_to_failed(self) -> Self {
        match self {
            ExecutionPhase::Executing { execution_id, .. } => ExecutionPhase::Failed { execution_id },
            _ => self,
        }
    }

    pub fn transition_to_cancelled(self) -> Self {
        match self {
            ExecutionPhase::Executing { execution_id, .. } => {
                ExecutionPhase::Cancelled { execution_id }
            }
            _ => self,
        }
    }

    pub fn reset_to_idle(&mut self) {
        *self = ExecutionPhase::Idle;
    }
}

/// Inserts the output suffix before the extension (text after the last `.`).
/// A dot that belongs to a directory name does not count as an extension.
pub fn derive_output_uri(source_uri: &str) -> String {
    match source_uri.rfind('.') {
        Some(dot) if !source_uri[dot + 1..].contains(&['/', '\\'][..]) => {
            let (stem, extension) = source_uri.split_at(dot);
            format!("{}{}{}", stem, OUTPUT_SUFFIX, extension)
        }
        _ => format!("{}{}", source_uri, OUTPUT_SUFFIX),
    }
}

/// Converts elapsed media time into a completion fraction of a clip lasting
/// `duration_secs`, clamped to `[0, 1]`. Unknown or empty durations yield `None`.
pub fn progress_fraction(elapsed: Duration, duration_secs: f64) -> Option<f64> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return None;
    }
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    Some((elapsed_ms / (duration_secs * 1000.0)).clamp(0.0, 1.0))
}
