/// Play history and the action log
///
/// Every completed hand is written once to `hand_history`; every user action
/// (login, hit, stand, ...) is appended to `action_log`. Neither table is ever
/// updated in place.

pub mod action_log;
pub mod hand_history;

pub use action_log::ActionLogManager;
pub use hand_history::{DailyGames, HandHistoryManager, Turn, UserStatistics};

/// Percentage rounded to one decimal place, 0 when there is nothing to divide
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

/// Ratio rounded to two decimal places, 0 when there is nothing to divide
pub fn ratio(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(5, 0), 0.0);
    }

    #[test]
    fn test_ratio_rounding() {
        assert_eq!(ratio(10, 4), 2.5);
        assert_eq!(ratio(1, 3), 0.33);
        assert_eq!(ratio(1, 0), 0.0);
    }
}
