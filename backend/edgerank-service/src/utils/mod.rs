// Utility functions for edgerank-service

use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days from `then` to `now`, rounded toward negative infinity.
/// Negative when `then` lies in the future.
pub fn elapsed_days(now: DateTime<Utc>, then: DateTime<Utc>) -> i64 {
    (now - then).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Divisor for linear time decay. Zero and negative ages clamp to 1 so a
/// future timestamp can neither divide by zero nor flip the sign.
pub fn decay_divisor(days: i64) -> f64 {
    days.max(1) as f64
}

/// `weight / max(1, days since then)`
pub fn decayed(weight: f64, now: DateTime<Utc>, then: DateTime<Utc>) -> f64 {
    weight / decay_divisor(elapsed_days(now, then))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_elapsed_days_floors() {
        let now = Utc::now();
        assert_eq!(elapsed_days(now, now - Duration::hours(47)), 1);
        assert_eq!(elapsed_days(now, now - Duration::days(10)), 10);
        assert_eq!(elapsed_days(now, now + Duration::hours(1)), -1);
    }

    #[test]
    fn test_decay_divisor_clamps() {
        assert_eq!(decay_divisor(-5), 1.0);
        assert_eq!(decay_divisor(0), 1.0);
        assert_eq!(decay_divisor(4), 4.0);
    }

    #[test]
    fn test_decayed_future_event_keeps_full_weight() {
        let now = Utc::now();
        assert_eq!(decayed(2.0, now, now + Duration::days(3)), 2.0);
        assert_eq!(decayed(2.0, now, now - Duration::days(4)), 0.5);
    }
}
