//! Wall-clock access. Only the outer edge of the crate reads real time; the
//! engine itself works from the timestamps it is handed.

use chrono::Utc;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_after_2024() {
        assert!(now_ms() > 1_704_067_200_000);
    }
}
