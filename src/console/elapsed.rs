// src/console/elapsed.rs

use std::time::{Duration, Instant};

/// Human-readable elapsed time.
///
/// Below a second: milliseconds (`250ms`); below a minute: seconds
/// (`1.50s`); below an hour: minutes (`2.00m`); otherwise hours (`1.25h`).
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", elapsed.as_millis())
    } else if secs < 60.0 {
        format!("{secs:.2}s")
    } else if secs < 3600.0 {
        format!("{:.2}m", secs / 60.0)
    } else {
        format!("{:.2}h", secs / 3600.0)
    }
}

pub fn format_elapsed_since(start: Instant) -> String {
    format_elapsed(start.elapsed())
}
