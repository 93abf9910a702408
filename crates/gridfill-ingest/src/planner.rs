//! Backfill window planning.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use gridfill_types::{FetchWindow, StoredRecord};

/// Result of a planning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Fetch this window next.
    Fetch(FetchWindow),
    /// History reaches the floor; nothing to fetch.
    BackfillComplete,
}

impl Plan {
    /// Returns the planned window, if any.
    #[must_use]
    pub const fn window(&self) -> Option<FetchWindow> {
        match self {
            Self::Fetch(window) => Some(*window),
            Self::BackfillComplete => None,
        }
    }
}

/// Walks history backward from the earliest stored settlement date.
///
/// Every planned window ends (exclusively) at the current frontier and spans
/// at most `lookback_days`, never reaching before `floor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillPlanner {
    lookback_days: u32,
    floor: NaiveDate,
}

impl BackfillPlanner {
    /// Creates a planner. A zero lookback is treated as one day.
    #[must_use]
    pub fn new(lookback_days: u32, floor: NaiveDate) -> Self {
        Self {
            lookback_days: lookback_days.max(1),
            floor,
        }
    }

    /// Returns the lookback in days.
    #[must_use]
    pub const fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    /// Returns the floor date.
    #[must_use]
    pub const fn floor(&self) -> NaiveDate {
        self.floor
    }

    /// Plans the next window from the earliest stored record.
    ///
    /// The frontier is the settlement date of `earliest`, not the UTC date
    /// of its period start: under BST the first periods of a settlement date
    /// start on the previous UTC day. An empty store bootstraps with the
    /// `lookback_days` before `now`.
    #[must_use]
    pub fn plan(&self, earliest: Option<&StoredRecord>, now: DateTime<Utc>) -> Plan {
        self.plan_from_frontier(earliest.map(StoredRecord::settlement_date), now)
    }

    /// Plans the next window from a frontier date (exclusive window end).
    ///
    /// `None` means nothing has been acquired yet.
    #[must_use]
    pub fn plan_from_frontier(&self, frontier: Option<NaiveDate>, now: DateTime<Utc>) -> Plan {
        let end = frontier.unwrap_or_else(|| now.date_naive());
        if end <= self.floor {
            return Plan::BackfillComplete;
        }

        let start = (end - TimeDelta::days(i64::from(self.lookback_days))).max(self.floor);
        Plan::Fetch(FetchWindow { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gridfill_types::{SettlementPeriod, SourceId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 15, 0).unwrap()
    }

    fn record_on(day: NaiveDate, period: u8) -> StoredRecord {
        let period = SettlementPeriod::new(period).unwrap();
        StoredRecord::new(
            SourceId::new("B1620").unwrap(),
            period.start_on(day),
            day,
            period,
            1.0,
        )
    }

    #[test]
    fn test_bootstrap_from_empty_store() {
        let planner = BackfillPlanner::new(7, date(2016, 1, 1));
        let plan = planner.plan(None, now());

        let window = plan.window().unwrap();
        assert_eq!(window.start, date(2024, 3, 3));
        assert_eq!(window.end, date(2024, 3, 10));
        assert_eq!(window.total_days(), 7);
    }

    #[test]
    fn test_walks_backward_from_earliest() {
        let planner = BackfillPlanner::new(7, date(2016, 1, 1));
        let earliest = record_on(date(2024, 3, 3), 1);

        let window = planner.plan(Some(&earliest), now()).window().unwrap();
        assert_eq!(window.start, date(2024, 2, 25));
        assert_eq!(window.end, date(2024, 3, 3));
    }

    #[test]
    fn test_mid_day_frontier_ends_at_its_date() {
        let planner = BackfillPlanner::new(2, date(2016, 1, 1));
        let earliest = record_on(date(2024, 3, 3), 30);

        let window = planner.plan(Some(&earliest), now()).window().unwrap();
        assert_eq!(window.end, date(2024, 3, 3));
    }

    #[test]
    fn test_summer_time_frontier_uses_settlement_date() {
        let planner = BackfillPlanner::new(7, date(2016, 1, 1));
        let day = date(2024, 6, 2);
        let period = SettlementPeriod::new(1).unwrap();
        let earliest = StoredRecord::new(
            SourceId::new("B1620").unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap(),
            day,
            period,
            1.0,
        );

        let window = planner.plan(Some(&earliest), now()).window().unwrap();
        assert_eq!(window.end, date(2024, 6, 2));
        assert_eq!(window.start, date(2024, 5, 26));
    }

    #[test]
    fn test_window_is_clamped_to_floor() {
        let planner = BackfillPlanner::new(7, date(2024, 2, 28));
        let earliest = record_on(date(2024, 3, 2), 1);

        let window = planner.plan(Some(&earliest), now()).window().unwrap();
        assert_eq!(window.start, date(2024, 2, 28));
        assert_eq!(window.end, date(2024, 3, 2));
    }

    #[test]
    fn test_floor_reached() {
        let planner = BackfillPlanner::new(7, date(2024, 1, 1));
        let at_floor = record_on(date(2024, 1, 1), 1);

        assert_eq!(planner.plan(Some(&at_floor), now()), Plan::BackfillComplete);
        assert_eq!(
            planner.plan_from_frontier(Some(date(2023, 6, 1)), now()),
            Plan::BackfillComplete
        );
    }

    #[test]
    fn test_floor_in_future_means_nothing_to_do() {
        let planner = BackfillPlanner::new(7, date(2030, 1, 1));
        assert_eq!(planner.plan(None, now()), Plan::BackfillComplete);
    }

    #[test]
    fn test_planned_windows_are_never_empty() {
        let planner = BackfillPlanner::new(3, date(2024, 3, 1));
        let mut frontier = None;
        let mut windows = Vec::new();

        while let Plan::Fetch(window) = planner.plan_from_frontier(frontier, now()) {
            assert!(!window.is_empty());
            windows.push(window);
            frontier = Some(window.start);
        }

        let starts: Vec<_> = windows.iter().map(|w| w.start).collect();
        assert_eq!(starts, vec![date(2024, 3, 7), date(2024, 3, 4), date(2024, 3, 1)]);
    }

    #[test]
    fn test_zero_lookback_is_one_day() {
        let planner = BackfillPlanner::new(0, date(2016, 1, 1));
        assert_eq!(planner.lookback_days(), 1);
        assert_eq!(planner.plan(None, now()).window().unwrap().total_days(), 1);
    }
}
