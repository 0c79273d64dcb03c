//! Text formatting shared by the renderers and the detail panel

use spanscope_protocol::Timestamp;
use time::format_description::FormatItem;
use time::macros::format_description;

const TIMESTAMP_FORMAT: &[FormatItem<'static>] = format_description!(
    "[month repr:short] [day], [year] | [hour repr:12 padding:none]:[minute][period case:lower]"
);

/// Fixed two-decimal milliseconds, e.g. `"12.50 ms"`
pub fn millis(duration_ms: f64) -> String {
    format!("{:.2} ms", finite_or_zero(duration_ms))
}

/// Human-scaled duration - sub-ms values in µs, long ones in seconds
pub fn duration_ms(duration_ms: f64) -> String {
    let ms = finite_or_zero(duration_ms);
    if ms < 1.0 {
        format!("{:.0}µs", ms * 1_000.0)
    } else if ms < 10.0 {
        format!("{:.2}ms", ms)
    } else if ms < 1000.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{:.2}s", ms / 1000.0)
    }
}

/// Calendar timestamp, e.g. `"May 01, 2024 | 3:04pm"`
pub fn timestamp(ts: Timestamp) -> String {
    ts.0.format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| ts.0.to_string())
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn fixed_millis() {
        assert_eq!(millis(100.0), "100.00 ms");
        assert_eq!(millis(f64::INFINITY), "0.00 ms");
    }

    #[test]
    fn scaled_durations() {
        assert_eq!(duration_ms(0.25), "250µs");
        assert_eq!(duration_ms(2.5), "2.50ms");
        assert_eq!(duration_ms(40.0), "40.0ms");
        assert_eq!(duration_ms(2500.0), "2.50s");
        assert_eq!(duration_ms(-5.0), "0µs");
    }

    #[test]
    fn calendar_timestamp() {
        let ts = Timestamp(datetime!(2024-05-01 15:04:00 UTC));
        assert_eq!(timestamp(ts), "May 01, 2024 | 3:04pm");
    }
}
