// Human readable byte sizes for terminal output.

const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Format a byte count with 1024-based units, e.g. `1048576 -> "1.0 MB"`.
pub fn bytes_to_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} Bytes", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
