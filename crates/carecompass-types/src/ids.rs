use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Next time-derived identifier in epoch milliseconds.
///
/// Values are strictly increasing within the process, so two ids requested
/// in the same millisecond still differ.
pub fn next_id() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_ID.load(Ordering::Relaxed);

    loop {
        let candidate = if now > last { now } else { last + 1 };
        match LAST_ID.compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}

/// Same as [`next_id`], rendered as a decimal string (thread, profile and list item ids).
pub fn next_string_id() -> String {
    next_id().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let ids: Vec<i64> = (0..1000).map(|_| next_id()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_ids_track_wall_clock() {
        let before = Utc::now().timestamp_millis();
        let id = next_id();
        assert!(id >= before);
    }

    #[test]
    fn test_string_id_is_numeric() {
        let id = next_string_id();
        assert!(id.parse::<i64>().is_ok());
    }
}
