//! Conversions between the browser's millisecond clock and host deadlines

use std::time::Duration;

/// Convert a `performance.now()` reading into a `Duration`
pub fn from_millis_f64(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}

/// Milliseconds to pass to `setTimeout` so it fires no earlier than `deadline`
pub fn delay_ms(deadline: Duration, now: Duration) -> i32 {
    let remaining = deadline.saturating_sub(now);
    let ms = remaining.as_micros().div_ceil(1000);
    i32::try_from(ms).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_millis() {
        assert_eq!(from_millis_f64(1500.0), Duration::from_millis(1500));
        assert_eq!(from_millis_f64(0.5), Duration::from_micros(500));
    }

    #[test]
    fn test_from_millis_rejects_garbage() {
        assert_eq!(from_millis_f64(-3.0), Duration::ZERO);
        assert_eq!(from_millis_f64(f64::NAN), Duration::ZERO);
        assert_eq!(from_millis_f64(f64::INFINITY), Duration::ZERO);
    }

    #[test]
    fn test_delay_rounds_up() {
        let now = Duration::from_micros(1_000_250);
        assert_eq!(delay_ms(Duration::from_millis(1300), now), 300);
        assert_eq!(delay_ms(Duration::from_micros(1_000_251), now), 1);
    }

    #[test]
    fn test_delay_for_past_deadline_is_zero() {
        assert_eq!(
            delay_ms(Duration::from_millis(10), Duration::from_millis(20)),
            0
        );
    }

    #[test]
    fn test_delay_saturates() {
        assert_eq!(delay_ms(Duration::MAX, Duration::ZERO), i32::MAX);
    }
}
