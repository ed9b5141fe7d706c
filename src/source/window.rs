pub const SECONDS_IN_DAY: u32 = 86_400;

/// Day-of-month / time-of-day filter deciding which log records are replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayWindow {
    /// 1-31, or 0 to accept every day
    pub day_of_month: u32,
    /// Start of the window, in seconds since midnight (UTC)
    pub second_of_day: u32,
    /// How far past `second_of_day` records are still accepted
    pub duration_secs: u32,
}

impl ReplayWindow {
    pub fn new(day_of_month: u32, second_of_day: u32, duration_secs: u32) -> Self {
        Self {
            day_of_month,
            second_of_day: second_of_day % SECONDS_IN_DAY,
            duration_secs,
        }
    }

    /// Returns true if a record at this calendar day and second of day falls
    /// inside the window.
    ///
    /// The day constraint is checked first. The time range is half-open and
    /// wraps past midnight when `second_of_day + duration_secs` exceeds a day.
    pub fn contains(&self, day_of_month: u32, second_of_day: u32) -> bool {
        if self.day_of_month != 0 && self.day_of_month != day_of_month {
            return false;
        }

        if self.duration_secs >= SECONDS_IN_DAY {
            return true;
        }

        let start = self.second_of_day;
        let end = start + self.duration_secs;

        if end <= SECONDS_IN_DAY {
            second_of_day >= start && second_of_day < end
        } else {
            second_of_day >= start || second_of_day < end - SECONDS_IN_DAY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noon_minute_boundaries() {
        let window = ReplayWindow::new(0, 43_200, 60);

        assert!(!window.contains(4, 43_199));
        assert!(window.contains(4, 43_200));
        assert!(window.contains(4, 43_259));
        assert!(!window.contains(4, 43_260));
        assert!(!window.contains(4, 43_261));
    }

    #[test]
    fn test_day_of_month_must_match() {
        let window = ReplayWindow::new(15, 0, SECONDS_IN_DAY);

        assert!(window.contains(15, 100));
        assert!(!window.contains(14, 100));
        assert!(!window.contains(16, 100));
    }

    #[test]
    fn test_day_zero_accepts_every_day() {
        let window = ReplayWindow::new(0, 3_600, 600);

        for day in 1..=31 {
            assert!(window.contains(day, 3_700), "day {day} rejected");
        }
    }

    #[test]
    fn test_window_wraps_past_midnight() {
        // 23:50 for 20 minutes -> 23:50..24:00 and 00:00..00:10
        let window = ReplayWindow::new(0, 85_800, 1_200);

        assert!(window.contains(1, 85_800));
        assert!(window.contains(1, 86_399));
        assert!(window.contains(1, 0));
        assert!(window.contains(1, 599));
        assert!(!window.contains(1, 600));
        assert!(!window.contains(1, 85_799));
        assert!(!window.contains(1, 43_200));
    }

    #[test]
    fn test_full_day_duration_accepts_everything() {
        let window = ReplayWindow::new(0, 50_000, SECONDS_IN_DAY);

        assert!(window.contains(1, 0));
        assert!(window.contains(1, 49_999));
        assert!(window.contains(1, 86_399));
    }

    #[test]
    fn test_zero_duration_accepts_nothing() {
        let window = ReplayWindow::new(0, 1_000, 0);

        assert!(!window.contains(1, 1_000));
        assert!(!window.contains(1, 999));
    }

    #[test]
    fn test_start_normalised_into_day() {
        let window = ReplayWindow::new(0, SECONDS_IN_DAY + 10, 5);
        assert_eq!(window.second_of_day, 10);
        assert!(window.contains(1, 12));
    }
}
