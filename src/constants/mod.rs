// App Constants
pub const APP_NAME: &str = "FFmpeg Tester";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CONFIG_DIR_NAME: &str = "ffmpeg-tester";
pub const PREFERENCES_FILE_NAME: &str = "preferences.json";

// Window
pub const WINDOW_WIDTH: f32 = 720.0;
pub const WINDOW_HEIGHT: f32 = 860.0;
pub const MIN_WINDOW_WIDTH: f32 = 480.0;
pub const MIN_WINDOW_HEIGHT: f32 = 600.0;
pub const REPAINT_INTERVAL_MS: u64 = 100;

// Preferences
pub const PARAMETERS_KEY: &str = "parameters";
pub const DEFAULT_PARAMETERS: &str = "-vcodec mpeg4 -crf 0 -preset superfast";

// Execution
pub const OUTPUT_SUFFIX: &str = "_compressed";
pub const GENERIC_ERROR_TEXT: &str = "Error while executing command, check logs for details.";

// ffmpeg exit codes
pub const RETURN_CODE_SUCCESS: i32 = 0;
pub const RETURN_CODE_CANCEL: i32 = 255;

// Automatic compression
pub const AUTO_MAX_DIMENSION: u32 = 1280;
pub const AUTO_VIDEO_CRF: u32 = 28;
pub const AUTO_PRESET: &str = "veryfast";
pub const AUTO_AUDIO_BITRATE: &str = "128k";

// File handling
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "3gp", "ogv", "ts",
];
