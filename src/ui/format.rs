//! Text shown next to assets and results.

pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

pub fn format_kbps(bits_per_second: u64) -> String {
    format!("{:.0} kbps", bits_per_second as f64 / 1024.0)
}

/// `mm:ss` with minutes allowed past 59, so an hour and a half reads `90:00`.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

pub fn format_elapsed_ms(elapsed_ms: u64) -> String {
    format_clock(elapsed_ms as f64 / 1000.0)
}

pub fn format_dimensions(width: u32, height: u32) -> String {
    format!("{} x {}", width, height)
}

pub fn format_percent(progress: f64) -> String {
    format!("{}%", (progress.clamp(0.0, 1.0) * 100.0).round() as u32)
}
